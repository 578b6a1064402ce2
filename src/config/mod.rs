use chrono::NaiveTime;

use crate::errors::{DigestError, DigestResult};

/// Default SMTP port (STARTTLS submission).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default time of day (UTC) for the scheduled run.
pub const DEFAULT_RUN_AT: &str = "17:00";

/// Default address the subscription webhook listens on.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Default timeout for capsule connections, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Where subscriptions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// SQLite store with per-subscriber feeds
    Store,
    /// Append-only list of feed addresses for a single recipient
    File,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "store" | "sqlite" | "db" => Ok(SourceKind::Store),
            "file" | "flat" => Ok(SourceKind::File),
            _ => Err(format!("Unknown subscription source: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceKind,
    pub db_path: String,
    pub feeds_file: String,
    pub run_at: NaiveTime,
    pub listen_addr: String,
    pub fetch_timeout_secs: u64,
    pub smtp: SmtpConfig,
    /// Fixed recipient, only used with [`SourceKind::File`]
    pub recipient: Option<String>,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    fn required(name: &str) -> DigestResult<String> {
        std::env::var(name).map_err(|_| DigestError::MissingEnvVar(name.to_string()))
    }

    fn parsed<T: std::str::FromStr>(name: &str, default: T) -> DigestResult<T> {
        match std::env::var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| DigestError::Config(format!("{} has invalid value {:?}", name, raw))),
            Err(_) => Ok(default),
        }
    }

    pub fn from_env() -> DigestResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        let source = match std::env::var("CAPSULE_SOURCE") {
            Ok(raw) => raw.parse().map_err(DigestError::Config)?,
            Err(_) => SourceKind::Store,
        };

        let db_path = std::env::var("CAPSULE_DB_PATH").unwrap_or_else(|_| {
            exe_dir
                .map(|d| d.join("feed.db").to_string_lossy().into_owned())
                .unwrap_or_else(|| "./feed.db".to_string())
        });

        let feeds_file =
            std::env::var("CAPSULE_FEEDS_FILE").unwrap_or_else(|_| "feeds.txt".to_string());

        let run_at_raw =
            std::env::var("CAPSULE_RUN_AT").unwrap_or_else(|_| DEFAULT_RUN_AT.to_string());
        let run_at = parse_run_at(&run_at_raw)?;

        let listen_addr = std::env::var("CAPSULE_LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());

        let fetch_timeout_secs =
            Self::parsed("CAPSULE_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?;

        let smtp = SmtpConfig {
            host: Self::required("SMTP_HOST")?,
            port: Self::parsed("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: Self::required("SMTP_FROM")?,
        };

        let recipient = std::env::var("SMTP_TO").ok().filter(|to| !to.trim().is_empty());
        if source == SourceKind::File && recipient.is_none() {
            return Err(DigestError::MissingEnvVar("SMTP_TO".to_string()));
        }

        Ok(Self {
            source,
            db_path,
            feeds_file,
            run_at,
            listen_addr,
            fetch_timeout_secs,
            smtp,
            recipient,
        })
    }
}

/// Parse a `HH:MM` (or `HH:MM:SS`) time of day.
pub fn parse_run_at(raw: &str) -> DigestResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| DigestError::Config(format!("invalid run time {:?}: {}", raw, e)))
}
