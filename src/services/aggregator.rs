use chrono::NaiveDate;
use url::Url;

use crate::capsule::{fetch_document, normalize, CapsuleClient};
use crate::digest::extract_updates;
use crate::domain::{Digest, FailureReason, FeedResult, Subscription, Update};
use crate::errors::DigestResult;

/// Runs every feed of a subscription through normalize, fetch and extract,
/// one feed at a time, and folds the results into a digest.
pub struct AggregatorService<C: CapsuleClient> {
    client: C,
}

impl<C: CapsuleClient> AggregatorService<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Build the digest for one subscriber. May come back empty.
    pub fn aggregate(&self, subscription: &Subscription, sender: &str, date: NaiveDate) -> Digest {
        let target = date.format("%Y-%m-%d").to_string();
        let mut digest = Digest::new(subscription.recipient.clone(), sender, date);

        for address in &subscription.feeds {
            digest.push(self.process_feed(address, &target));
        }

        digest
    }

    /// Classify a single feed. Never fails: errors turn into [`FeedResult::Bad`].
    pub fn process_feed(&self, address: &str, date: &str) -> FeedResult {
        tracing::info!(feed = %address, "Trying feed");

        match self.read_feed(address, date) {
            Ok((url, updates)) => {
                tracing::info!(feed = %url, updates = updates.len(), "Feed read");
                FeedResult::Updates {
                    url: url.to_string(),
                    updates,
                }
            }
            Err(e) => {
                let reason = match FailureReason::from_error(&e) {
                    Some(reason) if e.is_feed_failure() => reason,
                    _ => {
                        tracing::error!(feed = %address, error = %e, "Unexpected error reading feed");
                        FailureReason::FetchFailed
                    }
                };
                let bad = e.feed_address().unwrap_or(address).to_string();
                tracing::warn!(feed = %bad, reason = %reason, error = %e, "Bad feed");
                FeedResult::Bad {
                    address: bad,
                    reason,
                }
            }
        }
    }

    fn read_feed(&self, address: &str, date: &str) -> DigestResult<(Url, Vec<Update>)> {
        let base = normalize(address)?;
        // The connection is released when `document` goes out of scope,
        // whether or not extraction succeeds.
        let mut document = fetch_document(&self.client, &base)?;
        let updates = extract_updates(&base, document.body(), date)?;
        Ok((base, updates))
    }
}
