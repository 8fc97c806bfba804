//! Candidate-file discovery.
//!
//! Walks each root (a directory, or a single file) and collects files whose
//! extension maps to a [`SourceKind`]. The walk is bounded by a depth limit
//! and a file-count ceiling so that symlink loops and pathological trees
//! cannot run away. A root that does not exist contributes nothing.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How a source file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Json,
    Markdown,
    Text,
    Archive,
}

impl SourceKind {
    /// Classify a file name by its extension.
    pub fn from_name(name: &str) -> Option<SourceKind> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(SourceKind::Json),
            "md" | "markdown" => Some(SourceKind::Markdown),
            "txt" => Some(SourceKind::Text),
            "zip" => Some(SourceKind::Archive),
            _ => None,
        }
    }
}

/// Limits applied while walking.
#[derive(Debug, Clone)]
pub struct WalkLimits {
    pub max_depth: usize,
    pub max_files: usize,
    pub follow_symlinks: bool,
    pub exclude_globs: Vec<String>,
}

/// Files found under the roots, plus paths the walk could not read.
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<(PathBuf, SourceKind)>,
    pub errors: Vec<(String, String)>,
    /// Set when `max_files` stopped the walk early.
    pub truncated: bool,
}

pub fn discover(roots: &[PathBuf], limits: &WalkLimits) -> Result<Discovery> {
    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(limits.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&default_excludes)?;

    let mut out = Discovery::default();

    'roots: for root in roots {
        if !root.exists() {
            tracing::warn!(root = %root.display(), "root does not exist");
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(limits.follow_symlinks)
            .max_depth(limits.max_depth);
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    tracing::warn!(path = %path, error = %e, "cannot read directory entry");
                    out.errors.push((path, e.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if exclude_set.is_match(relative) {
                continue;
            }

            let Some(kind) = classify(path) else {
                continue;
            };

            if out.files.len() >= limits.max_files {
                tracing::warn!(max_files = limits.max_files, "file ceiling reached; stopping discovery");
                out.truncated = true;
                break 'roots;
            }
            out.files.push((path.to_path_buf(), kind));
        }
    }

    // Sort for deterministic ordering
    out.files.sort_by(|a, b| a.0.cmp(&b.0));
    out.files.dedup_by(|a, b| a.0 == b.0);

    Ok(out)
}

pub fn classify(path: &Path) -> Option<SourceKind> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(SourceKind::from_name)
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
