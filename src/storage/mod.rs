pub mod flat_file;
pub mod sqlite;
pub mod traits;

pub use flat_file::FlatFileFeeds;
pub use sqlite::{SqliteStorage, SqliteSubscriberRepository};
pub use traits::{FeedRegistry, SubscriberSource};

use crate::config::{Config, SourceKind};
use crate::errors::{DigestError, DigestResult};

/// Open the subscriber source the configuration selects.
pub fn open_source(config: &Config) -> DigestResult<Box<dyn SubscriberSource>> {
    let source: Box<dyn SubscriberSource> = match config.source {
        SourceKind::Store => Box::new(SqliteSubscriberRepository::new(SqliteStorage::new(
            &config.db_path,
        )?)),
        SourceKind::File => Box::new(open_flat_file(config)?),
    };
    Ok(source)
}

/// Open the feed registry the configuration selects.
pub fn open_registry(config: &Config) -> DigestResult<Box<dyn FeedRegistry>> {
    let registry: Box<dyn FeedRegistry> = match config.source {
        SourceKind::Store => Box::new(SqliteSubscriberRepository::new(SqliteStorage::new(
            &config.db_path,
        )?)),
        SourceKind::File => Box::new(open_flat_file(config)?),
    };
    Ok(registry)
}

fn open_flat_file(config: &Config) -> DigestResult<FlatFileFeeds> {
    let recipient = config
        .recipient
        .clone()
        .ok_or_else(|| DigestError::MissingEnvVar("SMTP_TO".to_string()))?;
    Ok(FlatFileFeeds::new(&config.feeds_file, recipient))
}
