use chrono::NaiveDate;
use serde::Serialize;

use super::{FeedUpdates, Update};
use crate::errors::DigestError;

/// Why a feed was classified as bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidAddress,
    UnsupportedScheme,
    FetchFailed,
    UnexpectedStatus,
    StreamReadError,
}

impl FailureReason {
    /// Map a feed-level error to its reason; `None` for errors that are not feed failures.
    pub fn from_error(err: &DigestError) -> Option<Self> {
        match err {
            DigestError::InvalidAddress { .. } => Some(FailureReason::InvalidAddress),
            DigestError::UnsupportedScheme { .. } => Some(FailureReason::UnsupportedScheme),
            DigestError::FetchFailed { .. } => Some(FailureReason::FetchFailed),
            DigestError::UnexpectedStatus { .. } => Some(FailureReason::UnexpectedStatus),
            DigestError::StreamRead { .. } => Some(FailureReason::StreamReadError),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidAddress => "invalid_address",
            FailureReason::UnsupportedScheme => "unsupported_scheme",
            FailureReason::FetchFailed => "fetch_failed",
            FailureReason::UnexpectedStatus => "unexpected_status",
            FailureReason::StreamReadError => "stream_read_error",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of processing a single feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedResult {
    /// The feed was read; holds the updates found (possibly none).
    Updates { url: String, updates: Vec<Update> },
    /// The feed could not be normalized, fetched or read.
    Bad { address: String, reason: FailureReason },
}

/// Everything one recipient receives for one target date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    #[serde(rename = "to")]
    pub recipient: String,
    #[serde(rename = "from")]
    pub sender: String,
    pub subject: String,
    pub feeds: Vec<FeedUpdates>,
    pub bad_feeds: Vec<String>,
    pub date: String,
}

impl Digest {
    pub fn new(recipient: impl Into<String>, sender: impl Into<String>, date: NaiveDate) -> Self {
        let date = date.format("%Y-%m-%d").to_string();
        Self {
            recipient: recipient.into(),
            sender: sender.into(),
            subject: subject_for(&date),
            feeds: Vec::new(),
            bad_feeds: Vec::new(),
            date,
        }
    }

    /// Fold a feed result in. Feeds without updates leave the digest untouched.
    pub fn push(&mut self, result: FeedResult) {
        match result {
            FeedResult::Updates { url, updates } => {
                if !updates.is_empty() {
                    self.feeds.push(FeedUpdates { url, updates });
                }
            }
            FeedResult::Bad { address, .. } => self.bad_feeds.push(address),
        }
    }

    /// A digest with nothing to report is never sent.
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty() && self.bad_feeds.is_empty()
    }

    pub fn update_count(&self) -> usize {
        self.feeds.iter().map(|f| f.updates.len()).sum()
    }
}

pub fn subject_for(date: &str) -> String {
    format!("Daily Capsule News for {}", date)
}
