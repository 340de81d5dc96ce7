//! In-memory doubles for the gateway and the subscriber store.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::store::{StoreError, Subscriber, SubscriberStore};
use crate::telegram::{Gateway, GatewayError, OutboundResponse};

/// A call made to [`RecordingGateway`], in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Send(OutboundResponse),
    Acknowledge(String),
    ResolveLink(String),
}

/// Gateway that records every call and fails on request.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    failing_chats: HashSet<i64>,
    fail_links: bool,
    fail_acks: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to these chats are recorded and then fail.
    pub fn failing_for(chats: impl IntoIterator<Item = i64>) -> Self {
        Self {
            failing_chats: chats.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_failing_links(mut self) -> Self {
        self.fail_links = true;
        self
    }

    pub fn with_failing_acks(mut self) -> Self {
        self.fail_acks = true;
        self
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<OutboundResponse> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Send(response) => Some(response),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn send(&self, response: &OutboundResponse) -> Result<(), GatewayError> {
        self.record(GatewayCall::Send(response.clone()));
        if self.failing_chats.contains(&response.chat_id) {
            return Err(GatewayError::Rejected {
                chat_id: response.chat_id,
                reason: "bot was blocked by the user".to_owned(),
            });
        }
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::Acknowledge(callback_id.to_owned()));
        if self.fail_acks {
            return Err(GatewayError::Connection("timed out".to_owned()));
        }
        Ok(())
    }

    async fn resolve_attachment_link(&self, file_ref: &str) -> Result<String, GatewayError> {
        self.record(GatewayCall::ResolveLink(file_ref.to_owned()));
        if self.fail_links {
            return Err(GatewayError::Connection("file too big".to_owned()));
        }
        Ok(format!("https://files.example/{file_ref}"))
    }
}

/// Store keeping subscribers in a vector and counting reads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    subscribers: Mutex<Vec<Subscriber>>,
    reads: AtomicUsize,
    fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with subscribers `ids`, registered in that order.
    pub fn with_subscribers(ids: impl IntoIterator<Item = i64>) -> Self {
        let store = Self::new();
        {
            let mut subscribers = store.subscribers.lock().unwrap();
            for (n, id) in ids.into_iter().enumerate() {
                subscribers.push(Subscriber::new(
                    id,
                    None,
                    format!("User {id}"),
                    Utc.timestamp_opt(i64::try_from(n).unwrap(), 0).unwrap(),
                ));
            }
        }
        store
    }

    /// Store whose every operation fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn upsert(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        self.check()?;
        let mut subscribers = self.subscribers.lock().unwrap();
        match subscribers.iter_mut().find(|s| s.id == subscriber.id) {
            Some(existing) => {
                existing.username.clone_from(&subscriber.username);
                existing.first_name.clone_from(&subscriber.first_name);
            }
            None => subscribers.push(subscriber.clone()),
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Subscriber>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.snapshot())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.snapshot().len() as u64)
    }
}
