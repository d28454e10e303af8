//! Cache validators.
//!
//! The entity tag is derived from modification time (whole seconds) and
//! size, both in hex: `"<mtime>-<size>"`. It changes whenever either does
//! and costs a single `stat`; it is not a content hash.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Seconds since the Unix epoch, negative for earlier times.
fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

/// Quoted entity tag for a file with the given metadata.
pub fn fingerprint(modified: SystemTime, size: u64) -> String {
    let secs = unix_seconds(modified);
    if secs < 0 {
        format!("\"-{:x}-{:x}\"", secs.unsigned_abs(), size)
    } else {
        format!("\"{:x}-{:x}\"", secs, size)
    }
}

/// Whether an `If-None-Match` value matches `etag`.
///
/// Accepts `*`, a comma-separated list, and weak (`W/`) forms.
pub fn if_none_match(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

/// Format a timestamp as an HTTP-date.
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE).to_string()
}

/// Whether a resource modified at `modified` is unchanged since the
/// `If-Modified-Since` value. Unparseable dates never match.
pub fn not_modified_since(header: &str, modified: SystemTime) -> bool {
    match DateTime::parse_from_rfc2822(header.trim()) {
        Ok(since) => unix_seconds(modified) <= since.timestamp(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fingerprint_format() {
        let modified = UNIX_EPOCH + Duration::from_secs(0x5f5e100);
        assert_eq!(fingerprint(modified, 0x400), "\"5f5e100-400\"");
    }

    #[test]
    fn test_fingerprint_tracks_metadata() {
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(fingerprint(t, 10), fingerprint(t, 10));
        assert_ne!(fingerprint(t, 10), fingerprint(t, 11));
        assert_ne!(fingerprint(t, 10), fingerprint(t + Duration::from_secs(1), 10));
        // sub-second changes are invisible
        assert_eq!(fingerprint(t, 10), fingerprint(t + Duration::from_millis(300), 10));
    }

    #[test]
    fn test_if_none_match_forms() {
        let etag = "\"abc-10\"";
        assert!(if_none_match("\"abc-10\"", etag));
        assert!(if_none_match("\"x\", \"abc-10\"", etag));
        assert!(if_none_match("W/\"abc-10\"", etag));
        assert!(if_none_match("*", etag));
        assert!(!if_none_match("\"abc-11\"", etag));
        assert!(!if_none_match("abc-10", etag));
    }

    #[test]
    fn test_http_date_roundtrip() {
        let t = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(http_date(t), "Sun, 06 Nov 1994 08:49:37 GMT");
        assert!(not_modified_since("Sun, 06 Nov 1994 08:49:37 GMT", t));
        assert!(!not_modified_since("Sun, 06 Nov 1994 08:49:36 GMT", t));
        assert!(!not_modified_since("yesterday", t));
    }
}
