//! Export the loaded corpus as canonical JSON.
//!
//! The output is an array of conversations in load order, each in the
//! canonical record shape (`startDate`, `endDate`, lower-case roles, RFC 3339
//! timestamps), so other tools can consume a corpus without re-running the
//! format detection.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::ingest::{load_corpus, LoadRequest};

/// Load the corpus and write it as pretty JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes to
/// stdout for piping. Failed sources are listed on stderr.
pub async fn run_export(
    config: &Config,
    request: &LoadRequest,
    output: Option<&Path>,
) -> Result<()> {
    let report = load_corpus(config, request).await?;

    for failed in &report.failures {
        eprintln!("failed: {}: {}", failed.source, failed.error);
    }

    let json = serde_json::to_string_pretty(&report.conversations)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write export to {}", path.display()))?;
            eprintln!(
                "Exported {} conversations to {}",
                report.conversations.len(),
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}
