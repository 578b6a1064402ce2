use lettre::address::{Address, Envelope};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{SmtpTransport, Transport};

use crate::config::SmtpConfig;
use crate::errors::{DigestError, DigestResult};

/// Port where SMTP is spoken over implicit TLS rather than STARTTLS.
const SMTPS_PORT: u16 = 465;

/// Hands a fully rendered message to the outside world.
#[cfg_attr(test, mockall::automock)]
pub trait MailTransport: Send + Sync {
    fn send(&self, from: &str, to: &[String], message: &[u8]) -> DigestResult<()>;
}

/// SMTP delivery with PLAIN authentication.
pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> DigestResult<Self> {
        let builder = if config.port == SMTPS_PORT {
            SmtpTransport::relay(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
        }
        .map_err(|e| DigestError::Mail(format!("SMTP relay configuration error: {}", e)))?
        .port(config.port);

        let builder = if config.username.is_empty() {
            builder
        } else {
            builder
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .authentication(vec![Mechanism::Plain])
        };

        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, from: &str, to: &[String], message: &[u8]) -> DigestResult<()> {
        let envelope = envelope(from, to)?;
        self.transport
            .send_raw(&envelope, message)
            .map_err(|e| DigestError::Mail(e.to_string()))?;
        Ok(())
    }
}

/// Prints messages instead of delivering them.
pub struct DryRunMailer;

impl MailTransport for DryRunMailer {
    fn send(&self, from: &str, to: &[String], message: &[u8]) -> DigestResult<()> {
        println!("[DRY RUN] {} -> {}", from, to.join(", "));
        println!("{}", String::from_utf8_lossy(message));
        Ok(())
    }
}

fn envelope(from: &str, to: &[String]) -> DigestResult<Envelope> {
    let from: Address = from
        .parse()
        .map_err(|e| DigestError::Mail(format!("invalid sender {:?}: {}", from, e)))?;

    let to = to
        .iter()
        .map(|recipient| {
            recipient
                .parse::<Address>()
                .map_err(|e| DigestError::Mail(format!("invalid recipient {:?}: {}", recipient, e)))
        })
        .collect::<DigestResult<Vec<_>>>()?;

    Envelope::new(Some(from), to).map_err(|e| DigestError::Mail(e.to_string()))
}
