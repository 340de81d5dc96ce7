//! Subscriber persistence.
//!
//! The [`SubscriberStore`] trait is what the command router and the
//! broadcaster talk to; [`SqliteSubscriberStore`] is the production backing.

mod sqlite;
mod subscriber;

pub use sqlite::SqliteSubscriberStore;
pub use subscriber::{StoreError, Subscriber, SubscriberStore};
