//! ZIP bundle expansion.
//!
//! Export bundles are ZIP files holding any mix of JSON, Markdown and plain
//! text. [`expand_archive`] yields every entry whose name ends in a
//! recognized extension as UTF-8 text. Directories, binary files and other
//! extensions are skipped silently. An entry that cannot be read or decoded
//! is recorded in [`ExpandedArchive::failures`] and the remaining entries
//! are still extracted.

use std::io::{Cursor, Read};

use crate::error::ArchiveError;

/// One text entry pulled from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ExpandedArchive {
    pub entries: Vec<ArchiveEntry>,
    pub failures: Vec<ArchiveError>,
}

impl ArchiveError {
    /// The entry this error belongs to, if any.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            ArchiveError::Open(_) => None,
            ArchiveError::Entry { name, .. }
            | ArchiveError::EntryTooLarge { name, .. }
            | ArchiveError::NotUtf8(name) => Some(name),
        }
    }
}

/// Whether `name` ends in one of `extensions` (compared case-insensitively,
/// without the leading dot).
pub fn has_extension(name: &str, extensions: &[String]) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// Expand a ZIP archive held in memory.
///
/// Only a container that cannot be opened at all is an error; per-entry
/// problems are collected in the result.
pub fn expand_archive(
    bytes: &[u8],
    extensions: &[String],
    max_entry_bytes: u64,
) -> Result<ExpandedArchive, ArchiveError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ArchiveError::Open(e.to_string()))?;

    let mut out = ExpandedArchive::default();
    for i in 0..archive.len() {
        match read_entry(&mut archive, i, extensions, max_entry_bytes) {
            Ok(Some(entry)) => out.entries.push(entry),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "skipping archive entry");
                out.failures.push(e);
            }
        }
    }
    Ok(out)
}

fn read_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    index: usize,
    extensions: &[String],
    max_bytes: u64,
) -> Result<Option<ArchiveEntry>, ArchiveError> {
    let entry = archive.by_index(index).map_err(|e| ArchiveError::Entry {
        name: format!("#{}", index),
        reason: e.to_string(),
    })?;
    let name = entry.name().to_string();

    if entry.is_dir() || name.starts_with("__MACOSX/") || !has_extension(&name, extensions) {
        tracing::debug!(entry = %name, "skipping non-text archive entry");
        return Ok(None);
    }

    let mut raw = Vec::new();
    entry
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut raw)
        .map_err(|e| ArchiveError::Entry {
            name: name.clone(),
            reason: e.to_string(),
        })?;
    if raw.len() as u64 > max_bytes {
        return Err(ArchiveError::EntryTooLarge {
            name,
            limit: max_bytes,
        });
    }

    let text = String::from_utf8(raw).map_err(|_| ArchiveError::NotUtf8(name.clone()))?;
    Ok(Some(ArchiveEntry { name, text }))
}
