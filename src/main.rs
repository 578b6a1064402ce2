use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use capsule_digest::capsule::{normalize, TlsCapsuleClient};
use capsule_digest::cli::{Cli, Commands};
use capsule_digest::config::Config;
use capsule_digest::digest::EmailComposer;
use capsule_digest::services::{
    yesterday, DigestRunner, DryRunMailer, MailTransport, RunSummary, Scheduler, SmtpMailer,
    SystemClock, WebhookService,
};
use capsule_digest::storage::{self, SubscriberSource};

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env().context("loading configuration")?;

    match cli.command {
        Commands::Run { date, dry_run } => cmd_run(&config, date, dry_run),
        Commands::Schedule { dry_run } => cmd_schedule(&config, dry_run),
        Commands::Serve => cmd_serve(&config),
        Commands::Add { email, address } => cmd_add(&config, &email, &address),
        Commands::List => cmd_list(&config),
    }
}

fn build_runner<M: MailTransport>(
    config: &Config,
    mailer: M,
) -> anyhow::Result<DigestRunner<Box<dyn SubscriberSource>, TlsCapsuleClient, M>> {
    let source = storage::open_source(config).context("opening subscriber source")?;
    let client = TlsCapsuleClient::new(Duration::from_secs(config.fetch_timeout_secs))?;
    let composer = EmailComposer::new().context("loading digest template")?;

    Ok(DigestRunner::new(
        source,
        client,
        composer,
        mailer,
        config.smtp.from.clone(),
    ))
}

fn cmd_run(config: &Config, date: Option<NaiveDate>, dry_run: bool) -> anyhow::Result<()> {
    let date = date.unwrap_or_else(|| yesterday(Utc::now()));
    println!("Looking for entries published on {}\n", date);

    let summary = if dry_run {
        build_runner(config, DryRunMailer)?.run(date)?
    } else {
        let mailer = SmtpMailer::new(&config.smtp).context("configuring SMTP")?;
        build_runner(config, mailer)?.run(date)?
    };

    print_summary(&summary, dry_run);
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    if summary.subscribers == 0 {
        println!("No subscribers configured.");
        return;
    }

    if dry_run {
        println!(
            "Dry run complete. Would send {} digests ({} without updates, {} failed).",
            summary.sent, summary.suppressed, summary.failed
        );
    } else {
        println!(
            "Sent {} digests ({} without updates, {} failed).",
            summary.sent, summary.suppressed, summary.failed
        );
    }
}

fn cmd_schedule(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        schedule(config, DryRunMailer)
    } else {
        let mailer = SmtpMailer::new(&config.smtp).context("configuring SMTP")?;
        schedule(config, mailer)
    }
}

fn schedule<M: MailTransport>(config: &Config, mailer: M) -> anyhow::Result<()> {
    let runner = build_runner(config, mailer)?;
    let scheduler = Scheduler::new(SystemClock, config.run_at);

    println!("Sending digests every day at {} UTC", config.run_at.format("%H:%M"));

    scheduler.run_forever(|now| {
        if let Err(e) = runner.run(yesterday(now)) {
            tracing::error!(error = %e, "Run failed");
        }
    })
}

fn cmd_serve(config: &Config) -> anyhow::Result<()> {
    let registry = storage::open_registry(config).context("opening feed registry")?;
    WebhookService::new(registry).serve(&config.listen_addr)?;
    Ok(())
}

fn cmd_add(config: &Config, email: &str, address: &str) -> anyhow::Result<()> {
    let url = normalize(address).with_context(|| format!("validating {}", address))?;

    let registry = storage::open_registry(config).context("opening feed registry")?;
    registry.register_feed(email, address)?;

    println!("Subscribed {} to {}", email, url);
    Ok(())
}

fn cmd_list(config: &Config) -> anyhow::Result<()> {
    let source = storage::open_source(config).context("opening subscriber source")?;
    let subscriptions = source.list_subscriptions()?;

    if subscriptions.is_empty() {
        println!("No subscribers configured.");
        return Ok(());
    }

    println!("Subscriptions:\n");
    for subscription in subscriptions {
        println!("  {} ({} feeds)", subscription.recipient, subscription.feeds.len());
        for feed in &subscription.feeds {
            println!("    {}", feed);
        }
        println!();
    }

    Ok(())
}
