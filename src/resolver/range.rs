//! Single byte-range requests.
//!
//! Only one range per request is honoured. A header listing several ranges
//! is ignored and the whole entity is sent.

use std::time::SystemTime;

use chrono::DateTime;

use super::fingerprint;

/// An inclusive byte range within an entity of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered; never zero.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for an entity of `size` bytes.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// Send the whole entity.
    Full,
    Partial(ByteRange),
    /// Answer 416.
    Unsatisfiable,
}

/// Interpret a `Range` header against an entity of `size` bytes.
pub fn parse_range(header: &str, size: u64) -> RangeRequest {
    let Some(spec) = header.trim().strip_prefix("bytes=") else {
        return RangeRequest::Unsatisfiable;
    };
    if spec.contains(',') {
        return RangeRequest::Full;
    }
    let Some((first, last)) = spec.trim().split_once('-') else {
        return RangeRequest::Unsatisfiable;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // suffix form: the final `last` bytes
        return match last.parse::<u64>() {
            Ok(0) | Err(_) => RangeRequest::Unsatisfiable,
            Ok(_) if size == 0 => RangeRequest::Unsatisfiable,
            Ok(suffix) => RangeRequest::Partial(ByteRange {
                start: size.saturating_sub(suffix),
                end: size - 1,
            }),
        };
    }

    let Ok(start) = first.parse::<u64>() else {
        return RangeRequest::Unsatisfiable;
    };
    if start >= size {
        return RangeRequest::Unsatisfiable;
    }
    let end = if last.is_empty() {
        size - 1
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => end.min(size - 1),
            _ => return RangeRequest::Unsatisfiable,
        }
    };
    RangeRequest::Partial(ByteRange { start, end })
}

/// Whether an `If-Range` value still describes the current entity.
///
/// Entity tags compare strongly, so weak tags never match. Dates must equal
/// the modification time to the second.
pub fn if_range_matches(header: &str, etag: Option<&str>, modified: SystemTime) -> bool {
    let header = header.trim();
    if header.starts_with('"') || header.starts_with("W/") {
        return etag.is_some_and(|etag| header == etag);
    }
    DateTime::parse_from_rfc2822(header)
        .is_ok_and(|date| fingerprint::http_date(modified) == fingerprint::http_date(date.into()))
}
