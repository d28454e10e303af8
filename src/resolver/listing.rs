//! Directory enumeration.
//!
//! Produces the sorted, labelled entries of a directory; presentation lives
//! in [`super::render`].

use std::cmp::Ordering;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use percent_encoding::utf8_percent_encode;

use crate::security::path::PATH_ESCAPE;

const UNITS: &[u8] = b"KMGTPE";

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
    /// `-` for directories.
    pub size_label: String,
    pub mod_time_label: String,
    /// Percent-encoded absolute link to the entry.
    pub href: String,
}

/// Human-readable size in binary units: `1023 B`, `1.0 KB`, `1.5 MB`.
pub fn format_size(size: u64) -> String {
    const UNIT: u64 = 1024;
    if size < UNIT {
        return format!("{size} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = size / UNIT;
    while n >= UNIT && exp + 1 < UNITS.len() {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", size as f64 / div as f64, UNITS[exp] as char)
}

pub fn format_mod_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Directories first, then by name (byte-wise, case-sensitive).
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}

/// Link for `name` inside the directory served at `request_path`.
pub fn entry_href(request_path: &str, name: &str) -> String {
    let base = request_path.trim_end_matches('/');
    let joined = format!("{base}/{name}");
    utf8_percent_encode(&joined, PATH_ESCAPE).to_string()
}

/// Read `dir` into sorted entries. Dot-prefixed names are dropped when
/// `hide_hidden` is set; entries whose metadata cannot be read are skipped.
pub async fn read_entries(
    dir: &Path,
    request_path: &str,
    hide_hidden: bool,
) -> io::Result<Vec<DirectoryEntry>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if hide_hidden && name.starts_with('.') {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };

        let is_dir = metadata.is_dir();
        entries.push(DirectoryEntry {
            href: entry_href(request_path, &name),
            size_label: if is_dir {
                "-".to_string()
            } else {
                format_size(metadata.len())
            },
            mod_time_label: metadata
                .modified()
                .map(format_mod_time)
                .unwrap_or_else(|_| "-".to_string()),
            name,
            is_dir,
        });
    }

    sort_entries(&mut entries);
    Ok(entries)
}
