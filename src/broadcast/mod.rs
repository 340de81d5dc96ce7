//! Broadcast fan-out.
//!
//! Delivers one text to every known subscriber. A failed delivery is logged
//! and counted; it never stops the rest of the batch. There is no retry.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::store::{StoreError, SubscriberStore};
use crate::telegram::{Gateway, OutboundResponse};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of sends attempted (one per subscriber).
    pub attempted: usize,

    /// Number of sends that succeeded.
    pub delivered: usize,

    /// Subscribers whose delivery failed, in subscriber order.
    pub failed: Vec<i64>,
}

impl BroadcastReport {
    /// Returns the number of failed deliveries.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Sends a message to every subscriber in the store.
pub struct Broadcaster {
    store: Arc<dyn SubscriberStore>,
    gateway: Arc<dyn Gateway>,

    /// Maximum sends in flight. With 1, sends are strictly sequential.
    workers: usize,
}

impl Broadcaster {
    /// Creates a sequential broadcaster.
    #[must_use]
    pub fn new(store: Arc<dyn SubscriberStore>, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            store,
            gateway,
            workers: 1,
        }
    }

    /// Sets how many sends may be in flight at once. Zero is treated as one.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Delivers `text` to every subscriber known at the time of the call.
    ///
    /// The subscriber list is read once. Sends start in store order and
    /// outcomes are collected in the same order.
    ///
    /// # Errors
    ///
    /// Returns an error only if the subscriber list cannot be loaded;
    /// individual delivery failures are reported in the [`BroadcastReport`].
    pub async fn fan_out(&self, text: &str) -> Result<BroadcastReport, StoreError> {
        let subscribers = self.store.list_all().await?;
        info!(
            recipients = subscribers.len(),
            workers = self.workers,
            "Starting broadcast"
        );

        let gateway = &self.gateway;
        let outcomes: Vec<(i64, bool)> = stream::iter(subscribers)
            .map(|subscriber| async move {
                let response = OutboundResponse::text(subscriber.id, text);
                match gateway.send(&response).await {
                    Ok(()) => (subscriber.id, true),
                    Err(e) => {
                        warn!(subscriber_id = subscriber.id, error = %e, "Broadcast delivery failed");
                        (subscriber.id, false)
                    }
                }
            })
            .buffered(self.workers)
            .collect()
            .await;

        let mut report = BroadcastReport {
            attempted: outcomes.len(),
            ..BroadcastReport::default()
        };
        for (id, delivered) in outcomes {
            if delivered {
                report.delivered += 1;
            } else {
                report.failed.push(id);
            }
        }

        info!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed_count(),
            "Broadcast finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}
