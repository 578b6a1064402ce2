use std::collections::BTreeMap;

use crate::domain::Subscription;
use crate::errors::DigestResult;
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::{FeedRegistry, SubscriberSource};

/// Subscribers and their feeds in SQLite.
pub struct SqliteSubscriberRepository {
    storage: SqliteStorage,
}

impl SqliteSubscriberRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }

    /// Look up a subscriber by email, creating it if needed.
    pub fn find_or_create_subscriber(&self, email: &str) -> DigestResult<i64> {
        let conn = self.storage.connection()?;
        conn.execute("INSERT OR IGNORE INTO users (email) VALUES (?1)", [email])?;
        let id = conn.query_row("SELECT id FROM users WHERE email = ?1", [email], |row| {
            row.get(0)
        })?;
        Ok(id)
    }

    /// Attach a feed address to a subscriber. Duplicates are kept.
    pub fn add_feed(&self, subscriber_id: i64, address: &str) -> DigestResult<i64> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO feeds (user_id, url) VALUES (?1, ?2)",
            (subscriber_id, address),
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl SubscriberSource for SqliteSubscriberRepository {
    fn list_subscriptions(&self) -> DigestResult<Vec<Subscription>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.email, f.url FROM users u \
             LEFT JOIN feeds f ON f.user_id = u.id \
             ORDER BY u.id, f.id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut subscriptions: BTreeMap<i64, Subscription> = BTreeMap::new();
        for row in rows {
            let (id, email, url) = row?;
            let subscription = subscriptions
                .entry(id)
                .or_insert_with(|| Subscription::new(email, Vec::new()));
            if let Some(url) = url {
                subscription.feeds.push(url);
            }
        }

        Ok(subscriptions.into_values().collect())
    }
}

impl FeedRegistry for SqliteSubscriberRepository {
    fn register_feed(&self, subscriber: &str, address: &str) -> DigestResult<()> {
        let id = self.find_or_create_subscriber(subscriber)?;
        self.add_feed(id, address)?;
        Ok(())
    }
}
