use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigestError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Feed address errors
    #[error("Invalid feed address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Feed {address} uses unsupported scheme {scheme:?}")]
    UnsupportedScheme { address: String, scheme: String },

    // Capsule transport errors
    #[error("Fetching {address} failed: {reason}")]
    FetchFailed { address: String, reason: String },

    #[error("Unexpected status {status} for {address}: {meta}")]
    UnexpectedStatus {
        address: String,
        status: u8,
        meta: String,
    },

    #[error("Reading lines of {address} failed: {source}")]
    StreamRead {
        address: String,
        #[source]
        source: std::io::Error,
    },

    // Digest errors
    #[error("Rendering digest failed: {0}")]
    Render(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    // Webhook errors
    #[error("Malformed subscription payload: {0}")]
    Payload(#[from] serde_json::Error),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DigestError {
    /// Errors that mark a single feed as bad without affecting the rest of the run.
    pub fn is_feed_failure(&self) -> bool {
        matches!(
            self,
            DigestError::InvalidAddress { .. }
                | DigestError::UnsupportedScheme { .. }
                | DigestError::FetchFailed { .. }
                | DigestError::UnexpectedStatus { .. }
                | DigestError::StreamRead { .. }
        )
    }

    /// The feed address a feed-level error refers to.
    pub fn feed_address(&self) -> Option<&str> {
        match self {
            DigestError::InvalidAddress { address, .. }
            | DigestError::UnsupportedScheme { address, .. }
            | DigestError::FetchFailed { address, .. }
            | DigestError::UnexpectedStatus { address, .. }
            | DigestError::StreamRead { address, .. } => Some(address.as_str()),
            _ => None,
        }
    }
}

impl From<handlebars::RenderError> for DigestError {
    fn from(err: handlebars::RenderError) -> Self {
        DigestError::Render(err.to_string())
    }
}

impl From<handlebars::TemplateError> for DigestError {
    fn from(err: handlebars::TemplateError) -> Self {
        DigestError::Render(err.to_string())
    }
}

pub type DigestResult<T> = Result<T, DigestError>;
