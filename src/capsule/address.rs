use url::Url;

use crate::errors::{DigestError, DigestResult};

pub const CAPSULE_SCHEME: &str = "capsule";

/// Turn a stored feed string into an absolute capsule address.
///
/// Anything already carrying the capsule scheme (in any letter case) is parsed
/// as-is; scheme-relative (`//host/path`), path-relative (`/path`) and bare
/// (`host/path`) forms get the scheme prepended. Applying it to its own output
/// returns the same address.
pub fn normalize(raw: &str) -> DigestResult<Url> {
    let prefixed = if has_capsule_scheme(raw) {
        raw.to_string()
    } else if raw.starts_with('/') {
        // `//host/path` and `/path` both only lack the scheme
        format!("{}:{}", CAPSULE_SCHEME, raw)
    } else {
        format!("{}://{}", CAPSULE_SCHEME, raw)
    };

    let url = Url::parse(&prefixed).map_err(|e| DigestError::InvalidAddress {
        address: prefixed.clone(),
        reason: e.to_string(),
    })?;

    check_scheme(&url)?;
    Ok(url)
}

fn has_capsule_scheme(raw: &str) -> bool {
    raw.get(..CAPSULE_SCHEME.len() + 1)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("capsule:"))
}

/// Reject anything that would not be fetched over the capsule protocol.
pub fn check_scheme(url: &Url) -> DigestResult<()> {
    if url.scheme() != CAPSULE_SCHEME {
        return Err(DigestError::UnsupportedScheme {
            address: url.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    Ok(())
}
