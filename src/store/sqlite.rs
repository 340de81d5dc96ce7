//! SQLite-backed subscriber store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, info};

use super::subscriber::{StoreError, Subscriber, SubscriberStore};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: i64,
    username: Option<String>,
    first_name: String,
    created_at: i64,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = StoreError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::from_timestamp(row.created_at, 0).ok_or(
            StoreError::InvalidTimestamp {
                id: row.id,
                value: row.created_at,
            },
        )?;

        Ok(Self {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            created_at,
        })
    }
}

/// Subscriber store on a single-connection SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteSubscriberStore {
    pool: SqlitePool,
}

impl SqliteSubscriberStore {
    /// Opens (creating if needed) the database at `url` and ensures the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the database is unreachable.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.init().await?;

        info!("Subscriber store ready at {}", url);
        Ok(store)
    }

    /// Wraps an existing pool. The schema is not touched.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the subscribers table if it does not exist.
    ///
    /// `seq` records first-registration order and is never rewritten by
    /// an upsert.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS subscribers (
                seq        INTEGER PRIMARY KEY AUTOINCREMENT,
                id         INTEGER NOT NULL UNIQUE,
                username   TEXT,
                first_name TEXT    NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Closes the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SubscriberStore for SqliteSubscriberStore {
    async fn upsert(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        debug!(subscriber_id = subscriber.id, "Upserting subscriber");

        sqlx::query(
            r"INSERT INTO subscribers (id, username, first_name, created_at)
              VALUES (?, ?, ?, ?)
              ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name",
        )
        .bind(subscriber.id)
        .bind(subscriber.username.as_deref())
        .bind(&subscriber.first_name)
        .bind(subscriber.created_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, username, first_name, created_at FROM subscribers ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    async fn test_store() -> SqliteSubscriberStore {
        SqliteSubscriberStore::connect("sqlite::memory:").await.unwrap()
    }

    fn subscriber(id: i64, first_name: &str, secs: i64) -> Subscriber {
        Subscriber::new(
            id,
            Some(format!("user{id}")),
            first_name.to_owned(),
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_upsert_and_list() {
        let store = test_store().await;

        store.upsert(&subscriber(1, "Ann", 100)).await.unwrap();
        store.upsert(&subscriber(2, "Bob", 200)).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], subscriber(1, "Ann", 100));
        assert_eq!(all[1].first_name, "Bob");
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_record_and_created_at() {
        let store = test_store().await;

        store.upsert(&subscriber(7, "Old", 100)).await.unwrap();
        store.upsert(&subscriber(7, "New", 900)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);

        let all = store.list_all().await.unwrap();
        assert_eq!(all[0].first_name, "New");
        assert_eq!(all[0].created_at.timestamp(), 100);
    }

    async fn listed_ids(store: &SqliteSubscriberStore) -> Vec<i64> {
        store
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect()
    }

    #[tokio::test]
    async fn test_list_in_registration_order() {
        let store = test_store().await;

        store.upsert(&subscriber(30, "First", 100)).await.unwrap();
        store.upsert(&subscriber(10, "Second", 200)).await.unwrap();
        store.upsert(&subscriber(20, "Third", 300)).await.unwrap();

        assert_eq!(listed_ids(&store).await, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_same_second_registrations_keep_insertion_order() {
        let store = test_store().await;

        store.upsert(&subscriber(200, "Ann", 500)).await.unwrap();
        store.upsert(&subscriber(100, "Bob", 500)).await.unwrap();

        assert_eq!(listed_ids(&store).await, vec![200, 100]);
    }

    #[tokio::test]
    async fn test_repeat_upsert_keeps_position() {
        let store = test_store().await;

        store.upsert(&subscriber(1, "Ann", 100)).await.unwrap();
        store.upsert(&subscriber(2, "Bob", 200)).await.unwrap();
        store.upsert(&subscriber(1, "Ann B.", 300)).await.unwrap();

        assert_eq!(listed_ids(&store).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_count_empty() {
        let store = test_store().await;
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_username_can_be_cleared() {
        let store = test_store().await;

        store.upsert(&subscriber(5, "Eve", 100)).await.unwrap();
        let mut updated = subscriber(5, "Eve", 100);
        updated.username = None;
        store.upsert(&updated).await.unwrap();

        assert_eq!(store.list_all().await.unwrap()[0].username, None);
    }
}
