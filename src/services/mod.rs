pub mod aggregator;
pub mod mail_service;
pub mod runner;
pub mod scheduler;
pub mod webhook;

pub use aggregator::AggregatorService;
pub use mail_service::{DryRunMailer, MailTransport, SmtpMailer};
pub use runner::{yesterday, DigestRunner, RunSummary};
pub use scheduler::{next_trigger, Clock, Scheduler, SystemClock};
pub use webhook::{parse_subscription, SubscriptionRequest, WebhookService};
