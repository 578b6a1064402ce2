use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::capsule::CapsuleClient;
use crate::digest::EmailComposer;
use crate::errors::DigestResult;
use crate::services::aggregator::AggregatorService;
use crate::services::mail_service::MailTransport;
use crate::storage::SubscriberSource;

/// The day whose entries a run started at `now` looks for.
pub fn yesterday(now: DateTime<Utc>) -> NaiveDate {
    (now - Duration::hours(24)).date_naive()
}

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub subscribers: usize,
    pub sent: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// Drives one complete run: list subscriptions, aggregate, compose, send.
pub struct DigestRunner<S: SubscriberSource, C: CapsuleClient, M: MailTransport> {
    source: S,
    aggregator: AggregatorService<C>,
    composer: EmailComposer,
    mailer: M,
    sender: String,
}

impl<S: SubscriberSource, C: CapsuleClient, M: MailTransport> DigestRunner<S, C, M> {
    pub fn new(
        source: S,
        client: C,
        composer: EmailComposer,
        mailer: M,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            source,
            aggregator: AggregatorService::new(client),
            composer,
            mailer,
            sender: sender.into(),
        }
    }

    /// Process every subscriber for `date`.
    ///
    /// A failure for one recipient is logged and the run moves on; only
    /// failing to list subscriptions ends the run early.
    pub fn run(&self, date: NaiveDate) -> DigestResult<RunSummary> {
        let subscriptions = self.source.list_subscriptions()?;
        let mut summary = RunSummary {
            subscribers: subscriptions.len(),
            ..RunSummary::default()
        };

        tracing::info!(date = %date, subscribers = subscriptions.len(), "Processing feeds");

        for subscription in &subscriptions {
            tracing::info!(recipient = %subscription.recipient, feeds = subscription.feeds.len(), "Processing feeds for subscriber");

            let digest = self.aggregator.aggregate(subscription, &self.sender, date);

            if digest.is_empty() {
                tracing::info!(recipient = %digest.recipient, "No updates, skipping");
                summary.suppressed += 1;
                continue;
            }

            tracing::info!(
                recipient = %digest.recipient,
                feeds = digest.feeds.len(),
                updates = digest.update_count(),
                bad_feeds = digest.bad_feeds.len(),
                "Sending digest"
            );

            let message = match self.composer.compose(&digest) {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!(recipient = %digest.recipient, error = %e, "Could not render digest");
                    summary.failed += 1;
                    continue;
                }
            };

            match self
                .mailer
                .send(&digest.sender, &[digest.recipient.clone()], &message)
            {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    tracing::error!(recipient = %digest.recipient, error = %e, "Could not send digest");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            sent = summary.sent,
            suppressed = summary.suppressed,
            failed = summary.failed,
            "Run done"
        );

        Ok(summary)
    }
}
