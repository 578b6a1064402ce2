use crate::domain::Subscription;
use crate::errors::DigestResult;

/// Yields every recipient with the feed addresses they follow.
#[cfg_attr(test, mockall::automock)]
pub trait SubscriberSource: Send + Sync {
    fn list_subscriptions(&self) -> DigestResult<Vec<Subscription>>;
}

/// Records a new feed for a subscriber.
#[cfg_attr(test, mockall::automock)]
pub trait FeedRegistry: Send + Sync {
    fn register_feed(&self, subscriber: &str, address: &str) -> DigestResult<()>;
}

impl<T: SubscriberSource + ?Sized> SubscriberSource for Box<T> {
    fn list_subscriptions(&self) -> DigestResult<Vec<Subscription>> {
        (**self).list_subscriptions()
    }
}

impl<T: FeedRegistry + ?Sized> FeedRegistry for Box<T> {
    fn register_feed(&self, subscriber: &str, address: &str) -> DigestResult<()> {
        (**self).register_feed(subscriber, address)
    }
}
