use std::io::BufRead;

use url::Url;

use crate::capsule::client::CapsuleClient;
use crate::errors::{DigestError, DigestResult};

/// The only status whose body is read.
pub const STATUS_SUCCESS: u8 = 20;

/// A successfully fetched capsule, ready to be scanned line by line.
///
/// The connection stays open until the document is dropped.
pub struct CapsuleDocument {
    pub meta: String,
    body: Box<dyn BufRead + Send>,
}

impl CapsuleDocument {
    pub fn new(meta: String, body: Box<dyn BufRead + Send>) -> Self {
        Self { meta, body }
    }

    pub fn body(&mut self) -> &mut dyn BufRead {
        &mut *self.body
    }
}

/// Fetch `url` once and insist on a success status.
pub fn fetch_document<C: CapsuleClient + ?Sized>(
    client: &C,
    url: &Url,
) -> DigestResult<CapsuleDocument> {
    let response = client.fetch(url)?;

    if response.status != STATUS_SUCCESS {
        return Err(DigestError::UnexpectedStatus {
            address: url.to_string(),
            status: response.status,
            meta: response.meta,
        });
    }

    Ok(CapsuleDocument::new(response.meta, response.body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::client::{CapsuleResponse, MockCapsuleClient};
    use std::io::Cursor;

    fn response(status: u8, meta: &str, body: &str) -> CapsuleResponse {
        CapsuleResponse {
            status,
            meta: meta.to_string(),
            body: Box::new(Cursor::new(body.as_bytes().to_vec())),
        }
    }

    #[test]
    fn test_success_returns_body() {
        let mut client = MockCapsuleClient::new();
        client
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(response(20, "text/gemini", "# Log\n=> /a.gmi A\n")));

        let url = Url::parse("capsule://example.org/").unwrap();
        let mut document = fetch_document(&client, &url).unwrap();

        let mut text = String::new();
        document.body().read_to_string(&mut text).unwrap();
        assert_eq!(text, "# Log\n=> /a.gmi A\n");
        assert_eq!(document.meta, "text/gemini");
    }

    #[test]
    fn test_non_success_status_rejected() {
        let mut client = MockCapsuleClient::new();
        client
            .expect_fetch()
            .returning(|_| Ok(response(51, "Not found", "")));

        let url = Url::parse("capsule://example.org/missing").unwrap();
        let result = fetch_document(&client, &url);

        assert!(matches!(
            result,
            Err(DigestError::UnexpectedStatus { status: 51, .. })
        ));
    }

    #[test]
    fn test_redirect_is_not_followed() {
        let mut client = MockCapsuleClient::new();
        client
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(response(31, "capsule://example.org/new/", "")));

        let url = Url::parse("capsule://example.org/old/").unwrap();
        assert!(fetch_document(&client, &url).is_err());
    }

    #[test]
    fn test_transport_error_propagates() {
        let mut client = MockCapsuleClient::new();
        client.expect_fetch().returning(|url| {
            Err(DigestError::FetchFailed {
                address: url.to_string(),
                reason: "connection refused".to_string(),
            })
        });

        let url = Url::parse("capsule://example.org/").unwrap();
        assert!(matches!(
            fetch_document(&client, &url),
            Err(DigestError::FetchFailed { .. })
        ));
    }
}
