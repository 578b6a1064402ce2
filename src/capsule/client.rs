use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme, StreamOwned};
use url::{Host, Url};

use crate::errors::{DigestError, DigestResult};

/// Port capsules are served on when the address does not name one.
pub const DEFAULT_PORT: u16 = 1965;

/// Longest meta text a server may send in the response header.
const MAX_META_LEN: usize = 1024;

/// A response header plus the unread body.
///
/// Dropping the response closes the underlying connection.
pub struct CapsuleResponse {
    pub status: u8,
    pub meta: String,
    pub body: Box<dyn BufRead + Send>,
}

impl std::fmt::Debug for CapsuleResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapsuleResponse")
            .field("status", &self.status)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait CapsuleClient: Send + Sync {
    /// Perform one request for `url`. Non-success statuses are returned, not errors.
    fn fetch(&self, url: &Url) -> DigestResult<CapsuleResponse>;
}

/// Capsule client over TLS on a plain TCP connection.
///
/// Capsule servers use self-signed certificates, so any certificate is
/// accepted; the handshake signatures are still checked.
pub struct TlsCapsuleClient {
    config: Arc<ClientConfig>,
    timeout: Duration,
}

impl TlsCapsuleClient {
    pub fn new(timeout: Duration) -> DigestResult<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| DigestError::Config(format!("TLS setup failed: {}", e)))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
            .with_no_client_auth();

        Ok(Self {
            config: Arc::new(config),
            timeout,
        })
    }

    fn connect(&self, url: &Url) -> Result<StreamOwned<ClientConnection, TcpStream>, String> {
        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            _ => return Err("address has no host".to_string()),
        };
        let port = url.port().unwrap_or(DEFAULT_PORT);

        let addr = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| format!("resolving {}: {}", host, e))?
            .next()
            .ok_or_else(|| format!("no addresses for {}", host))?;

        let tcp = TcpStream::connect_timeout(&addr, self.timeout).map_err(|e| e.to_string())?;
        tcp.set_read_timeout(Some(self.timeout))
            .and_then(|_| tcp.set_write_timeout(Some(self.timeout)))
            .map_err(|e| e.to_string())?;

        let server_name = ServerName::try_from(host).map_err(|e| e.to_string())?;
        let conn =
            ClientConnection::new(self.config.clone(), server_name).map_err(|e| e.to_string())?;

        Ok(StreamOwned::new(conn, tcp))
    }
}

impl CapsuleClient for TlsCapsuleClient {
    fn fetch(&self, url: &Url) -> DigestResult<CapsuleResponse> {
        let failed = |reason: String| DigestError::FetchFailed {
            address: url.to_string(),
            reason,
        };

        let mut stream = self.connect(url).map_err(failed)?;

        stream
            .write_all(format!("{}\r\n", url).as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| failed(e.to_string()))?;

        let mut reader = BufReader::new(LenientEof(stream));

        let mut header = Vec::new();
        reader
            .by_ref()
            .take((MAX_META_LEN + 5) as u64)
            .read_until(b'\n', &mut header)
            .map_err(|e| failed(e.to_string()))?;

        let (status, meta) =
            parse_header(&String::from_utf8_lossy(&header)).map_err(failed)?;

        tracing::debug!(feed = %url, status, meta = %meta, "Capsule responded");

        Ok(CapsuleResponse {
            status,
            meta,
            body: Box::new(reader),
        })
    }
}

/// Parse `<2-digit status>[ <meta>]\r\n`.
pub fn parse_header(line: &str) -> Result<(u8, String), String> {
    let line = line
        .strip_suffix('\n')
        .ok_or_else(|| "response header not terminated".to_string())?;
    let line = line.strip_suffix('\r').unwrap_or(line);

    let code = line
        .get(..2)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| format!("malformed response header {:?}", line))?;
    let status: u8 = code.parse().map_err(|_| format!("malformed status {:?}", code))?;

    let rest = &line[2..];
    let meta = match rest.strip_prefix(' ') {
        Some(meta) => meta,
        None if rest.is_empty() => "",
        None => return Err(format!("malformed response header {:?}", line)),
    };

    if meta.len() > MAX_META_LEN {
        return Err("response meta too long".to_string());
    }

    Ok((status, meta.to_string()))
}

/// Servers commonly close the connection without a TLS close_notify;
/// treat that as the end of the body.
struct LenientEof<R>(R);

impl<R: Read> Read for LenientEof<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.0.read(buf) {
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(0),
            other => other,
        }
    }
}

#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::normalize;

    #[test]
    fn test_parse_success_header() {
        let (status, meta) = parse_header("20 text/gemini; charset=utf-8\r\n").unwrap();
        assert_eq!(status, 20);
        assert_eq!(meta, "text/gemini; charset=utf-8");
    }

    #[test]
    fn test_parse_header_without_meta() {
        let (status, meta) = parse_header("51\r\n").unwrap();
        assert_eq!(status, 51);
        assert_eq!(meta, "");
    }

    #[test]
    fn test_parse_header_rejects_garbage() {
        assert!(parse_header("hello\r\n").is_err());
        assert!(parse_header("2\r\n").is_err());
        assert!(parse_header("20text/gemini\r\n").is_err());
        assert!(parse_header("20 text/gemini").is_err());
    }

    #[test]
    fn test_address_without_host_fails_to_fetch() {
        let client = TlsCapsuleClient::new(Duration::from_secs(1)).unwrap();
        let url = Url::parse("capsule:/feed").unwrap();

        let result = client.fetch(&url);
        assert!(matches!(result, Err(DigestError::FetchFailed { .. })));

        // A path-relative feed normalizes to an address without a host
        let url = normalize("/feed").unwrap();
        let result = client.fetch(&url);
        assert!(matches!(
            result,
            Err(DigestError::FetchFailed { ref address, .. }) if address == "capsule:/feed"
        ));
    }

    #[test]
    fn test_lenient_eof_ends_body() {
        struct Truncated;
        impl Read for Truncated {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "peer closed connection without sending TLS close_notify",
                ))
            }
        }

        let mut body = String::new();
        LenientEof(Truncated).read_to_string(&mut body).unwrap();
        assert!(body.is_empty());
    }
}
