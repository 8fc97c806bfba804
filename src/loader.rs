//! Corpus loading.
//!
//! [`CorpusLoader`] discovers candidate files under one or more roots,
//! dispatches each by extension (JSON → schema normalizer, Markdown/text →
//! transcript parser, ZIP → archive expander then per-entry dispatch) and
//! gathers everything into a [`LoadReport`].
//!
//! Every file and archive entry is isolated: a failure is recorded as a
//! [`FailedSource`] and loading continues. Loading holds no state between
//! calls; the caller owns the returned report.
//!
//! Files can be processed sequentially ([`CorpusLoader::load`]) or on a
//! bounded pool of blocking workers ([`CorpusLoader::load_concurrent`]).
//! Each worker returns its own partial report and the partials are merged
//! and sorted at the end, so both strategies produce the same result.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::archive::expand_archive;
use crate::config::LoaderConfig;
use crate::discover::{discover, Discovery, SourceKind, WalkLimits};
use crate::error::NormalizeError;
use crate::models::Conversation;
use crate::normalize::{
    normalize_str, transcript_conversation, NormalizeOptions, TranscriptKind,
};
use crate::progress::{LoadProgressEvent, LoadProgressReporter};
use crate::timestamp::BatchClock;

/// A source that could not be turned into conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSource {
    pub source: String,
    pub error: String,
}

/// Overall result of a load, distinguishing the two empty cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No candidate files were found at all.
    NoSources,
    /// Candidates were found but none produced a conversation.
    NoConversations,
    Loaded,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub conversations: Vec<Conversation>,
    pub failures: Vec<FailedSource>,
    /// Candidate files found (archives count once).
    pub sources_found: usize,
    /// Sources read successfully that held no conversation.
    pub skipped: Vec<String>,
}

impl LoadReport {
    pub fn outcome(&self) -> LoadOutcome {
        if self.sources_found == 0 {
            LoadOutcome::NoSources
        } else if self.conversations.is_empty() {
            LoadOutcome::NoConversations
        } else {
            LoadOutcome::Loaded
        }
    }

    fn fail(&mut self, source: impl Into<String>, error: impl Into<String>) {
        let failed = FailedSource {
            source: source.into(),
            error: error.into(),
        };
        tracing::warn!(source = %failed.source, error = %failed.error, "source failed");
        self.failures.push(failed);
    }

    fn merge(&mut self, other: LoadReport) {
        self.conversations.extend(other.conversations);
        self.failures.extend(other.failures);
        self.sources_found += other.sources_found;
        self.skipped.extend(other.skipped);
    }

    /// Sort into a deterministic order and make conversation ids unique.
    fn finish(&mut self) {
        self.conversations.sort_by(|a, b| {
            (a.start_date, &a.id, source_of(a)).cmp(&(b.start_date, &b.id, source_of(b)))
        });
        let mut seen = HashSet::with_capacity(self.conversations.len());
        for (idx, conv) in self.conversations.iter_mut().enumerate() {
            if !seen.insert(conv.id.clone()) {
                conv.id = format!("{}_{}", conv.id, idx);
                seen.insert(conv.id.clone());
            }
        }
        self.failures.sort_by(|a, b| a.source.cmp(&b.source));
        self.skipped.sort();
    }
}

fn source_of(conv: &Conversation) -> &str {
    conv.metadata
        .get("source")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
}

/// Settings for one loader.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub walk: WalkLimits,
    pub archive_extensions: Vec<String>,
    pub max_entry_bytes: u64,
    pub concurrency: usize,
    pub normalize: NormalizeOptions,
}

impl LoadOptions {
    pub fn from_config(config: &LoaderConfig, clock: BatchClock) -> Self {
        Self {
            walk: config.walk_limits(),
            archive_extensions: config.archive_extensions.clone(),
            max_entry_bytes: config.max_entry_bytes,
            concurrency: config.concurrency.max(1),
            normalize: NormalizeOptions {
                clock,
                dual_shape: config.dual_shape,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorpusLoader {
    options: LoadOptions,
}

impl CorpusLoader {
    /// A loader whose batch clock is read now.
    pub fn new(config: &LoaderConfig) -> Self {
        Self::with_options(LoadOptions::from_config(config, BatchClock::start()))
    }

    pub fn with_options(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load every source under `roots`, one file at a time.
    pub fn load(
        &self,
        roots: &[PathBuf],
        progress: &dyn LoadProgressReporter,
    ) -> Result<LoadReport> {
        let discovery = self.discover(roots, progress)?;
        let total = discovery.files.len() as u64;
        let mut report = report_for(&discovery);

        for (n, (path, kind)) in discovery.files.iter().enumerate() {
            report.merge(self.load_file(path, *kind));
            progress.report(LoadProgressEvent::Loading {
                n: n as u64 + 1,
                total,
            });
        }

        report.finish();
        log_summary(&report);
        Ok(report)
    }

    /// Load every source under `roots` on at most `concurrency` blocking
    /// workers. New files stop being submitted once all are dispatched;
    /// in-flight work always runs to completion.
    pub async fn load_concurrent(
        &self,
        roots: &[PathBuf],
        progress: &dyn LoadProgressReporter,
    ) -> Result<LoadReport> {
        let discovery = self.discover(roots, progress)?;
        let total = discovery.files.len() as u64;
        let mut report = report_for(&discovery);

        let loader = Arc::new(self.clone());
        let limit = self.options.concurrency.max(1);
        let mut pending = discovery.files.into_iter();
        let mut tasks = JoinSet::new();
        let mut done = 0u64;

        loop {
            while tasks.len() < limit {
                let Some((path, kind)) = pending.next() else {
                    break;
                };
                let loader = Arc::clone(&loader);
                tasks.spawn_blocking(move || loader.load_file(&path, kind));
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            match joined {
                Ok(partial) => report.merge(partial),
                Err(e) => report.fail("<worker>", format!("worker did not complete: {}", e)),
            }
            done += 1;
            progress.report(LoadProgressEvent::Loading { n: done, total });
        }

        report.finish();
        log_summary(&report);
        Ok(report)
    }

    /// Load a single in-memory upload, dispatched on `name`'s extension.
    pub fn load_bytes(&self, name: &str, bytes: &[u8]) -> LoadReport {
        let mut report = LoadReport::default();
        match SourceKind::from_name(name) {
            Some(kind) => {
                report.sources_found = 1;
                self.ingest_bytes(name, kind, bytes, &mut report);
            }
            None => {
                tracing::debug!(source = name, "unsupported file type");
                report.skipped.push(name.to_string());
            }
        }
        report.finish();
        report
    }

    fn discover(
        &self,
        roots: &[PathBuf],
        progress: &dyn LoadProgressReporter,
    ) -> Result<Discovery> {
        for root in roots {
            progress.report(LoadProgressEvent::Discovering {
                root: root.display().to_string(),
            });
        }
        discover(roots, &self.options.walk)
    }

    fn load_file(&self, path: &Path, kind: SourceKind) -> LoadReport {
        let label = path.display().to_string();
        let mut report = LoadReport::default();
        match std::fs::read(path) {
            Ok(bytes) => self.ingest_bytes(&label, kind, &bytes, &mut report),
            Err(e) => report.fail(label, format!("cannot read file: {}", e)),
        }
        report
    }

    fn ingest_bytes(&self, label: &str, kind: SourceKind, bytes: &[u8], report: &mut LoadReport) {
        if kind != SourceKind::Archive {
            match std::str::from_utf8(bytes) {
                Ok(text) => self.ingest_text(label, kind, text, report),
                Err(_) => report.fail(label, NormalizeError::NotUtf8.to_string()),
            }
            return;
        }

        let expanded = match expand_archive(
            bytes,
            &self.options.archive_extensions,
            self.options.max_entry_bytes,
        ) {
            Ok(expanded) => expanded,
            Err(e) => {
                report.fail(label, e.to_string());
                return;
            }
        };

        for err in expanded.failures {
            let entry = err.entry_name().unwrap_or("?").to_string();
            report.fail(format!("{}!{}", label, entry), err.to_string());
        }
        for entry in expanded.entries {
            let entry_label = format!("{}!{}", label, entry.name);
            match SourceKind::from_name(&entry.name) {
                Some(SourceKind::Archive) | None => {
                    tracing::debug!(source = %entry_label, "no handler for archive entry");
                    report.skipped.push(entry_label);
                }
                Some(entry_kind) => self.ingest_text(&entry_label, entry_kind, &entry.text, report),
            }
        }
    }

    fn ingest_text(&self, label: &str, kind: SourceKind, text: &str, report: &mut LoadReport) {
        let opts = &self.options.normalize;
        match kind {
            SourceKind::Json => match normalize_str(text, label, opts) {
                Ok(normalized) => {
                    if !normalized.recognized {
                        report.skipped.push(label.to_string());
                    }
                    report.conversations.extend(normalized.conversations);
                    for (source, err) in normalized.failures {
                        report.fail(source, err.to_string());
                    }
                }
                Err(e) => report.fail(label, e.to_string()),
            },
            SourceKind::Markdown | SourceKind::Text => {
                let flavor = if kind == SourceKind::Markdown {
                    TranscriptKind::Markdown
                } else {
                    TranscriptKind::Text
                };
                match transcript_conversation(text, label, flavor, opts) {
                    Some(conv) => report.conversations.push(conv),
                    None => report.skipped.push(label.to_string()),
                }
            }
            SourceKind::Archive => report.skipped.push(label.to_string()),
        }
    }
}

fn report_for(discovery: &Discovery) -> LoadReport {
    let mut report = LoadReport {
        sources_found: discovery.files.len(),
        ..LoadReport::default()
    };
    for (path, error) in &discovery.errors {
        report.fail(path.clone(), error.clone());
    }
    report
}

fn log_summary(report: &LoadReport) {
    tracing::info!(
        sources = report.sources_found,
        conversations = report.conversations.len(),
        failed = report.failures.len(),
        skipped = report.skipped.len(),
        "load finished"
    );
}
