//! # Convo Harness CLI (`convo`)
//!
//! The `convo` binary loads exported chat transcripts into a normalized
//! corpus and runs a command over it.
//!
//! ## Usage
//!
//! ```bash
//! convo [--config ./convo.toml] <command> --root <path>...
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `convo load` | Load the corpus and report successes and failures |
//! | `convo search "<query>"` | Find conversations by text, platform and date |
//! | `convo stats` | Totals and per-platform breakdown |
//! | `convo themes` | Keywords recurring across messages |
//! | `convo export` | Write the canonical corpus as JSON |
//!
//! ## Examples
//!
//! ```bash
//! # Load a directory of exports, using four workers
//! convo load --root ~/exports --parallel
//!
//! # Search Claude conversations from March
//! convo search "borrow checker" --root ~/exports --platform claude \
//!     --since 2024-03-01 --until 2024-03-31
//!
//! # Theme scan with custom keywords
//! convo themes --root ~/exports.zip --keyword rust --keyword async
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use convo_harness::config::{self, Config};
use convo_harness::ingest::LoadRequest;
use convo_harness::progress::ProgressMode;
use convo_harness::{export, ingest, search, stats};

/// Convo Harness CLI: load, search and summarize exported AI chat
/// transcripts.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without it, built-in defaults apply.
#[derive(Parser)]
#[command(
    name = "convo",
    about = "Convo Harness: a local-first ingestion engine for exported AI chat transcripts",
    version,
    long_about = "Convo Harness reads conversation exports from multiple chat platforms \
    (tree-structured JSON, flat JSON, role-tagged Markdown or text, and ZIP bundles of these), \
    normalizes them into one corpus and lets you search, summarize and export it."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where to load the corpus from.
#[derive(Args, Clone)]
struct SourceArgs {
    /// Directory, file or `.zip` archive to load. Repeatable.
    /// Defaults to `[loader].roots` from config.
    #[arg(long = "root")]
    roots: Vec<PathBuf>,

    /// Progress on stderr: `off`, `human` or `json`.
    /// Defaults to `human` when stderr is a terminal.
    #[arg(long, value_parser = parse_progress)]
    progress: Option<ProgressMode>,

    /// Load files on a bounded worker pool (`[loader].concurrency`).
    #[arg(long)]
    parallel: bool,
}

impl SourceArgs {
    fn into_request(self) -> LoadRequest {
        LoadRequest {
            roots: self.roots,
            progress: self.progress.unwrap_or_else(ProgressMode::default_for_tty),
            parallel: self.parallel,
        }
    }
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Load the corpus and summarize the result.
    ///
    /// Prints how many conversations were extracted and lists every source
    /// that failed. Per-source failures never change the exit status.
    Load {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Search conversations.
    ///
    /// Matches the query against titles and message content
    /// (case-insensitive), optionally narrowed by platform and date.
    Search {
        /// Text to look for.
        query: String,

        /// Only this platform (`all` for any), case-insensitive.
        #[arg(long)]
        platform: Option<String>,

        /// Only conversations starting on or after this date (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Only conversations ending on or before this date (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,

        /// Maximum number of results to print.
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show corpus statistics.
    Stats {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List recurring themes.
    Themes {
        /// Keyword to scan for. Repeatable; defaults to `[themes].keywords`.
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// A keyword must appear in more than this many messages.
        #[arg(long)]
        threshold: Option<usize>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Export the canonical corpus as JSON.
    Export {
        /// Output file. Writes to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s)
        .ok_or_else(|| format!("invalid progress mode '{}': use off, human or json", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("convo_harness=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Load { source } => {
            ingest::run_load(&cfg, &source.into_request()).await?;
        }
        Commands::Search {
            query,
            platform,
            since,
            until,
            limit,
            source,
        } => {
            search::run_search(
                &cfg,
                &source.into_request(),
                &query,
                platform,
                since,
                until,
                limit,
            )
            .await?;
        }
        Commands::Stats { source } => {
            stats::run_stats(&cfg, &source.into_request()).await?;
        }
        Commands::Themes {
            keywords,
            threshold,
            source,
        } => {
            stats::run_themes(&cfg, &source.into_request(), keywords, threshold).await?;
        }
        Commands::Export { output, source } => {
            export::run_export(&cfg, &source.into_request(), output.as_deref()).await?;
        }
    }

    Ok(())
}
