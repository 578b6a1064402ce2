use serde::{Deserialize, Serialize};

/// A dated entry found on a capsule feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub url: String,
    pub title: String,
}

impl Update {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// The updates one feed contributed to a digest, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedUpdates {
    pub url: String,
    pub updates: Vec<Update>,
}
