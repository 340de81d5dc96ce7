//! Subscriber record and store interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while reading or writing subscribers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored timestamp for subscriber {id}: {value}")]
    InvalidTimestamp { id: i64, value: i64 },
}

/// A user who has sent `/start` to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    /// Platform user id. Unique and never changes.
    pub id: i64,

    /// Public handle, if the user has one.
    pub username: Option<String>,

    /// First name as reported by the platform.
    pub first_name: String,

    /// When the subscriber first registered.
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    /// Creates a subscriber record registered at `created_at`.
    #[must_use]
    pub const fn new(
        id: i64,
        username: Option<String>,
        first_name: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            first_name,
            created_at,
        }
    }
}

/// Durable storage for subscriber records.
///
/// A single writer (the dispatch loop) is assumed; implementations that are
/// shared between writers must serialize access themselves.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Inserts the subscriber, or refreshes handle and first name if the id
    /// is already known. `created_at` of an existing record is kept.
    async fn upsert(&self, subscriber: &Subscriber) -> Result<(), StoreError>;

    /// Returns every subscriber in first-registration order.
    async fn list_all(&self) -> Result<Vec<Subscriber>, StoreError>;

    /// Returns the number of subscribers.
    async fn count(&self) -> Result<u64, StoreError>;
}
