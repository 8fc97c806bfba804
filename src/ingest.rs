//! Corpus loading for the CLI.
//!
//! Every command starts by loading the corpus through [`load_corpus`]; the
//! `convo load` command ([`run_load`]) prints just the outcome of that step.

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::config::Config;
use crate::loader::{CorpusLoader, LoadOutcome, LoadReport};
use crate::progress::ProgressMode;

/// Where to load from and how, as given on the command line.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Explicit roots; empty means `[loader].roots` from config.
    pub roots: Vec<PathBuf>,
    pub progress: ProgressMode,
    pub parallel: bool,
}

pub async fn load_corpus(config: &Config, request: &LoadRequest) -> Result<LoadReport> {
    let roots = if request.roots.is_empty() {
        config.loader.roots.clone()
    } else {
        request.roots.clone()
    };
    if roots.is_empty() {
        bail!("No roots to load. Pass --root <path> or set [loader].roots in config.");
    }

    let loader = CorpusLoader::new(&config.loader);
    let reporter = request.progress.reporter();
    if request.parallel {
        loader.load_concurrent(&roots, reporter.as_ref()).await
    } else {
        loader.load(&roots, reporter.as_ref())
    }
}

/// Print a one-line failure note on stderr so stdout stays clean.
pub fn note_failures(report: &LoadReport) {
    if !report.failures.is_empty() {
        eprintln!(
            "{} source{} failed to load (run `convo load` for details)",
            report.failures.len(),
            if report.failures.len() == 1 { "" } else { "s" }
        );
    }
}

pub async fn run_load(config: &Config, request: &LoadRequest) -> Result<()> {
    let report = load_corpus(config, request).await?;

    match report.outcome() {
        LoadOutcome::NoSources => {
            println!("no sources found");
            return Ok(());
        }
        LoadOutcome::NoConversations => println!("no conversations extracted"),
        LoadOutcome::Loaded => {}
    }

    let messages: usize = report.conversations.iter().map(|c| c.messages.len()).sum();

    println!(
        "{} conversations from {} sources, {} failed",
        report.conversations.len(),
        report.sources_found,
        report.failures.len()
    );
    println!("  messages: {}", messages);
    println!("  skipped: {}", report.skipped.len());
    for failed in &report.failures {
        println!("  failed: {}: {}", failed.source, failed.error);
    }
    println!("ok");

    Ok(())
}
