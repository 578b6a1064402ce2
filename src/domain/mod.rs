pub mod digest;
pub mod subscription;
pub mod update;

pub use digest::{Digest, FailureReason, FeedResult};
pub use subscription::Subscription;
pub use update::{FeedUpdates, Update};
