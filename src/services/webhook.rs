use serde::Deserialize;
use tiny_http::{Response, Server, StatusCode};

use crate::errors::{DigestError, DigestResult};
use crate::storage::FeedRegistry;

/// Path subscription notifications are posted to.
pub const RECEIVE_PATH: &str = "/receive";

/// Outer envelope: the mail notification arrives JSON-encoded inside `Message`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Notification {
    mail: Mail,
}

#[derive(Debug, Deserialize)]
struct Mail {
    source: String,
    #[serde(rename = "commonHeaders")]
    common_headers: CommonHeaders,
}

#[derive(Debug, Deserialize)]
struct CommonHeaders {
    #[serde(rename = "returnPath", default)]
    return_path: String,
    #[serde(default)]
    subject: String,
}

/// Someone mailed in asking to follow a feed; the subject is the feed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub subscriber: String,
    pub return_path: String,
    pub feed: String,
}

/// Decode the double-encoded notification body.
pub fn parse_subscription(body: &[u8]) -> DigestResult<SubscriptionRequest> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    let notification: Notification = serde_json::from_str(&envelope.message)?;

    Ok(SubscriptionRequest {
        subscriber: notification.mail.source,
        return_path: notification.mail.common_headers.return_path,
        feed: notification.mail.common_headers.subject.trim().to_string(),
    })
}

/// Turns subscription notifications into feed registrations.
pub struct WebhookService<R: FeedRegistry> {
    registry: R,
}

impl<R: FeedRegistry> WebhookService<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Handle one notification body. Failures are logged, never surfaced:
    /// the caller acknowledges the delivery either way.
    pub fn receive(&self, body: &[u8]) -> bool {
        match self.try_receive(body) {
            Ok(request) => {
                tracing::info!(
                    subscriber = %request.subscriber,
                    return_path = %request.return_path,
                    feed = %request.feed,
                    "Subscribed"
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not handle subscription notification");
                false
            }
        }
    }

    fn try_receive(&self, body: &[u8]) -> DigestResult<SubscriptionRequest> {
        let request = parse_subscription(body)?;
        if request.feed.is_empty() {
            return Err(DigestError::InvalidInput(format!(
                "subscription from {} has no feed address",
                request.subscriber
            )));
        }
        self.registry
            .register_feed(&request.subscriber, &request.feed)?;
        Ok(request)
    }

    /// Serve the webhook until the listener fails.
    pub fn serve(&self, addr: &str) -> DigestResult<()> {
        let server = Server::http(addr)
            .map_err(|e| DigestError::Config(format!("cannot listen on {}: {}", addr, e)))?;
        tracing::info!(addr, path = RECEIVE_PATH, "Listening for subscriptions");

        for mut request in server.incoming_requests() {
            let path = request.url().split('?').next().unwrap_or_default().to_string();
            if path != RECEIVE_PATH {
                if let Err(e) = request.respond(Response::empty(StatusCode(404))) {
                    tracing::warn!(error = %e, "Could not respond");
                }
                continue;
            }

            let mut body = Vec::new();
            match request.as_reader().read_to_end(&mut body) {
                Ok(_) => {
                    self.receive(&body);
                }
                Err(e) => tracing::warn!(error = %e, "Could not read notification body"),
            }

            if let Err(e) = request.respond(Response::empty(StatusCode(200))) {
                tracing::warn!(error = %e, "Could not respond");
            }
        }

        Ok(())
    }
}
