use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "capsule-digest")]
#[command(about = "Daily email digests of dated entries published on capsule feeds")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch all feeds once and send the digests
    Run {
        /// Day to collect entries for (YYYY-MM-DD, defaults to yesterday UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Dry run - print the messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run every day at CAPSULE_RUN_AT (UTC)
    Schedule {
        /// Print the messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Listen for subscription notifications on CAPSULE_LISTEN_ADDR
    Serve,

    /// Subscribe an email address to a feed
    Add {
        /// Subscriber email address
        email: String,

        /// Feed address (capsule://host/path, //host/path or host/path)
        address: String,
    },

    /// List subscribers and their feeds
    List,
}
