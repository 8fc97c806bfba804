//! # Convo Harness
//!
//! A local-first ingestion and normalization engine for exported AI chat
//! transcripts.
//!
//! Convo Harness reads conversation exports from several chat platforms
//! (tree-structured JSON, flat JSON message lists, role-tagged Markdown or
//! plain text, and ZIP bundles of any of these) and produces one normalized
//! corpus of conversations that can be searched, filtered and summarized.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │  Discovery   │──▶│ CorpusLoader │──▶│ Normalizers      │
//! │ dirs / zips  │   │ seq / pool   │   │ tree/flat/script │
//! └──────────────┘   └──────┬───────┘   └────────┬─────────┘
//!                           │                    │
//!                           ▼                    ▼
//!                     ┌────────────┐      ┌──────────────┐
//!                     │ LoadReport │◀─────│ Conversation │
//!                     └─────┬──────┘      └──────────────┘
//!                           ▼
//!                  query / analytics / export
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! convo load --root ~/exports              # load and summarize
//! convo search "lifetimes" --root ~/exports --platform claude
//! convo stats --root ~/exports.zip
//! convo export --root ~/exports --output corpus.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Canonical conversation and message records |
//! | [`error`] | Per-source error types |
//! | [`role`] | Speaker label normalization |
//! | [`timestamp`] | Instant parsing with explicit units |
//! | [`transcript`] | Role-tagged text parsing |
//! | [`tree`] | Canonical path through tree-shaped exports |
//! | [`normalize`] | JSON shape detection and normalization |
//! | [`archive`] | ZIP bundle expansion |
//! | [`discover`] | Candidate-file discovery |
//! | [`loader`] | Corpus loading (sequential and parallel) |
//! | [`query`] | Text / platform / date filtering |
//! | [`analytics`] | Corpus stats and theme detection |
//! | [`progress`] | Load progress reporting |
//! | [`config`] | TOML configuration parsing |
//! | [`ingest`], [`search`], [`stats`], [`export`] | CLI command bodies |

pub mod analytics;
pub mod archive;
pub mod config;
pub mod discover;
pub mod error;
pub mod export;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod query;
pub mod role;
pub mod search;
pub mod stats;
pub mod timestamp;
pub mod transcript;
pub mod tree;
