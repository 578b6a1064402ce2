mod connection;
mod subscriber_repository;

pub use connection::SqliteStorage;
pub use subscriber_repository::SqliteSubscriberRepository;
