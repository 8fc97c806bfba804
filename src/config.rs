use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::discover::{build_globset, WalkLimits};
use crate::normalize::DualShapePolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub themes: ThemesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoaderConfig {
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,
    #[serde(default)]
    pub dual_shape: DualShapePolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            archive_extensions: default_archive_extensions(),
            max_depth: default_max_depth(),
            max_files: default_max_files(),
            follow_symlinks: false,
            exclude_globs: Vec::new(),
            concurrency: default_concurrency(),
            max_entry_bytes: default_max_entry_bytes(),
            dual_shape: DualShapePolicy::default(),
        }
    }
}

impl LoaderConfig {
    pub fn walk_limits(&self) -> WalkLimits {
        WalkLimits {
            max_depth: self.max_depth,
            max_files: self.max_files,
            follow_symlinks: self.follow_symlinks,
            exclude_globs: self.exclude_globs.clone(),
        }
    }
}

fn default_archive_extensions() -> Vec<String> {
    vec!["json".to_string(), "md".to_string(), "txt".to_string()]
}
fn default_max_depth() -> usize {
    32
}
fn default_max_files() -> usize {
    50_000
}
fn default_concurrency() -> usize {
    4
}
fn default_max_entry_bytes() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThemesConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for ThemesConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            threshold: default_threshold(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    crate::analytics::DEFAULT_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}
fn default_threshold() -> usize {
    crate::analytics::DEFAULT_THEME_THRESHOLD
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let loader = &config.loader;
    if loader.concurrency == 0 {
        anyhow::bail!("loader.concurrency must be >= 1");
    }
    if loader.max_depth == 0 {
        anyhow::bail!("loader.max_depth must be >= 1");
    }
    if loader.max_files == 0 {
        anyhow::bail!("loader.max_files must be >= 1");
    }
    if loader.max_entry_bytes == 0 {
        anyhow::bail!("loader.max_entry_bytes must be >= 1");
    }
    build_globset(&loader.exclude_globs).with_context(|| "Invalid loader.exclude_globs")?;

    Ok(())
}
