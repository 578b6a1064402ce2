use serde::{Deserialize, Serialize};

/// A recipient and the feed addresses they follow, as stored (not normalized).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub recipient: String,
    pub feeds: Vec<String>,
}

impl Subscription {
    pub fn new(recipient: impl Into<String>, feeds: Vec<String>) -> Self {
        Self {
            recipient: recipient.into(),
            feeds,
        }
    }
}
