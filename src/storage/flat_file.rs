use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::Subscription;
use crate::errors::DigestResult;
use crate::storage::traits::{FeedRegistry, SubscriberSource};

/// Append-only list of feed addresses, one per line, all delivered to a
/// single configured recipient.
pub struct FlatFileFeeds {
    path: PathBuf,
    recipient: String,
}

impl FlatFileFeeds {
    pub fn new<P: AsRef<Path>>(path: P, recipient: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            recipient: recipient.into(),
        }
    }

    /// Append an address. No deduplication.
    pub fn append(&self, address: &str) -> DigestResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", address.trim())?;
        Ok(())
    }

    /// Addresses in file order; a missing file means no feeds yet.
    pub fn addresses(&self) -> DigestResult<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}

impl SubscriberSource for FlatFileFeeds {
    fn list_subscriptions(&self) -> DigestResult<Vec<Subscription>> {
        Ok(vec![Subscription::new(
            self.recipient.clone(),
            self.addresses()?,
        )])
    }
}

impl FeedRegistry for FlatFileFeeds {
    /// The list has no per-subscriber grouping, so the subscriber is only logged.
    fn register_feed(&self, subscriber: &str, address: &str) -> DigestResult<()> {
        tracing::debug!(subscriber, address, "Appending feed to flat list");
        self.append(address)
    }
}
