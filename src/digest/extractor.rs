use std::io::BufRead;

use url::Url;

use crate::domain::Update;
use crate::errors::{DigestError, DigestResult};

/// Marker that starts a link line.
pub const LINK_MARKER: &str = "=>";

const SPACE_TAB: &[char] = &[' ', '\t'];

/// Scan a capsule document for link lines labelled with `date` (`YYYY-MM-DD`).
///
/// Link lines look like `=> <path> <date>[: |- ]<title>`. The path is
/// resolved against `base`. Lines that cannot be split or resolved are
/// logged and skipped; only a failure reading the stream itself is an error.
pub fn extract_updates<R: BufRead + ?Sized>(
    base: &Url,
    reader: &mut R,
    date: &str,
) -> DigestResult<Vec<Update>> {
    let mut updates = Vec::new();
    let mut raw = Vec::new();

    loop {
        raw.clear();
        let read = reader
            .read_until(b'\n', &mut raw)
            .map_err(|source| DigestError::StreamRead {
                address: base.to_string(),
                source,
            })?;
        if read == 0 {
            break;
        }

        let decoded = String::from_utf8_lossy(&raw);
        let line: &str = &decoded;
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(update) = parse_link_line(base, line, date) {
            updates.push(update);
        }
    }

    Ok(updates)
}

/// Turn one document line into an update, if it is a link dated `date`.
pub fn parse_link_line(base: &Url, line: &str, date: &str) -> Option<Update> {
    let rest = line.strip_prefix(LINK_MARKER)?;

    // Cheap check before splitting anything.
    if !line.contains(date) {
        return None;
    }

    let rest = rest.trim_start_matches(SPACE_TAB);
    let Some(split) = rest.find(SPACE_TAB) else {
        tracing::warn!(feed = %base, line = %rest, "Link line has no label, perhaps the date is in the path; skipping");
        return None;
    };

    let path = &rest[..split];
    let label = rest[split..].trim_start_matches(SPACE_TAB);

    let title = label.strip_prefix(date)?.trim();
    let title = title.strip_prefix(": ").map(str::trim).unwrap_or(title);
    let title = title.strip_prefix("- ").map(str::trim).unwrap_or(title);

    match base.join(path) {
        Ok(url) => Some(Update::new(url.to_string(), title)),
        Err(e) => {
            tracing::warn!(feed = %base, path = %path, error = %e, "Could not resolve link; skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    const DATE: &str = "2024-06-01";

    fn base() -> Url {
        Url::parse("capsule://example.org/feed/").unwrap()
    }

    fn extract(body: &str) -> Vec<Update> {
        extract_updates(&base(), &mut Cursor::new(body.as_bytes().to_vec()), DATE).unwrap()
    }

    #[test]
    fn test_dated_link_becomes_update() {
        let update = parse_link_line(&base(), "=> /2024-06-01/post.gmi 2024-06-01: My Post", DATE);
        assert_eq!(
            update,
            Some(Update::new(
                "capsule://example.org/2024-06-01/post.gmi",
                "My Post"
            ))
        );
    }

    #[test]
    fn test_relative_path_resolved_against_feed() {
        let update = parse_link_line(&base(), "=>\tentry.gmi\t2024-06-01 - Hello", DATE).unwrap();
        assert_eq!(update.url, "capsule://example.org/feed/entry.gmi");
        assert_eq!(update.title, "Hello");
    }

    #[test]
    fn test_absolute_link_kept() {
        let update = parse_link_line(
            &base(),
            "=> capsule://other.example/log/1.gmi 2024-06-01 Elsewhere",
            DATE,
        )
        .unwrap();
        assert_eq!(update.url, "capsule://other.example/log/1.gmi");
        assert_eq!(update.title, "Elsewhere");
    }

    #[test]
    fn test_date_mid_label_is_not_an_update() {
        let update = parse_link_line(&base(), "=> /post.gmi Notes from 2024-06-01", DATE);
        assert!(update.is_none());
    }

    #[test]
    fn test_date_only_in_path_is_not_an_update() {
        let update = parse_link_line(&base(), "=> /2024-06-01/post.gmi Some post", DATE);
        assert!(update.is_none());
    }

    #[test]
    fn test_other_dates_ignored() {
        assert!(parse_link_line(&base(), "=> /a.gmi 2024-05-31 Old", DATE).is_none());
    }

    #[test]
    fn test_non_link_lines_ignored() {
        assert!(parse_link_line(&base(), "# 2024-06-01 heading", DATE).is_none());
        assert!(parse_link_line(&base(), "2024-06-01 text", DATE).is_none());
    }

    #[test]
    fn test_both_separators_stripped_in_order() {
        let update = parse_link_line(&base(), "=> /a.gmi 2024-06-01: - Dashed", DATE).unwrap();
        assert_eq!(update.title, "Dashed");

        // "- " then ": " is not unwrapped twice
        let update = parse_link_line(&base(), "=> /a.gmi 2024-06-01 - : Odd", DATE).unwrap();
        assert_eq!(update.title, ": Odd");
    }

    #[test]
    fn test_title_may_be_empty() {
        let update = parse_link_line(&base(), "=> /a.gmi 2024-06-01", DATE).unwrap();
        assert_eq!(update.title, "");
    }

    #[test]
    fn test_malformed_line_does_not_fail_feed() {
        let updates = extract(
            "# My gemlog\n\
             =>/2024-06-01/no-label.gmi\n\
             => /b.gmi 2024-06-01 Second\n",
        );
        assert_eq!(updates, vec![Update::new("capsule://example.org/b.gmi", "Second")]);
    }

    #[test]
    fn test_updates_in_document_order_without_dedup() {
        let updates = extract(
            "=> /a.gmi 2024-06-01 First\r\n\
             => /b.gmi 2024-05-30 Skipped\r\n\
             => /a.gmi 2024-06-01 First\r\n\
             => /c.gmi 2024-06-01: Third\r\n",
        );

        let titles: Vec<&str> = updates.iter().map(|u| u.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "First", "Third"]);
        assert_eq!(updates[2].url, "capsule://example.org/c.gmi");
    }

    #[test]
    fn test_non_ascii_titles_survive() {
        let updates = extract("=> /k.gmi 2024-06-01 — Café über alles\n");
        assert_eq!(updates[0].title, "— Café über alles");
    }

    #[test]
    fn test_invalid_utf8_is_not_fatal() {
        let mut body = b"=> /a.gmi 2024-06-01 Caf\xe9\n".to_vec();
        body.extend_from_slice(b"=> /b.gmi 2024-06-01 Fine\n");
        let updates = extract_updates(&base(), &mut Cursor::new(body), DATE).unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].title, "Fine");
    }

    #[test]
    fn test_read_error_is_fatal() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let mut reader = std::io::BufReader::new(Broken);
        let result = extract_updates(&base(), &mut reader, DATE);
        assert!(matches!(result, Err(DigestError::StreamRead { .. })));
    }
}
