//! Book configuration module.
//!
//! Handles loading and validating `book.toml`. Stock defaults are serialized
//! to a TOML table and the user's file is merged on top of it, so a config
//! file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! Place `book.toml` in the content root, next to the section directories:
//!
//! ```text
//! cookbook/
//! ├── book.toml                # Book config (optional)
//! ├── 01-appetizers/
//! │   └── bruschetta.tex
//! ├── 02-main-dishes/
//! │   └── ...
//! └── _build/                  # Build output (ignored by the scanner)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [book]
//! title = "Family Cookbook"
//! subtitle = ""
//!
//! [authorship]
//! author = ""
//! copyright = ""
//!
//! [style]
//! documentclass = "book"    # LaTeX document class of the master document
//! font_size = "11pt"
//! include_toc = true        # Table of contents in both LaTeX and HTML
//! include_index = false     # Loads makeidx in the LaTeX book
//!
//! [build]
//! output_dir = "_build"     # Relative to the content root
//! html_output_dir = "html"  # Relative to output_dir
//! latex_compiler = "xelatex"
//! compile_pdf = true
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file within the content root.
pub const CONFIG_FILENAME: &str = "book.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Book configuration loaded from `book.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BookConfig {
    /// Title page information.
    pub book: BookInfo,
    /// Author and copyright lines.
    pub authorship: Authorship,
    /// Document style settings shared by the LaTeX and HTML renderers.
    pub style: StyleConfig,
    /// Output locations and LaTeX compiler settings.
    pub build: BuildConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl BookConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.book.title.trim().is_empty() {
            return Err(ConfigError::Validation("book.title must not be empty".into()));
        }
        if !self.style.font_size.ends_with("pt") {
            return Err(ConfigError::Validation(
                "style.font_size must be a point size like \"11pt\"".into(),
            ));
        }
        if self.build.output_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "build.output_dir must not be empty".into(),
            ));
        }
        if self.build.html_output_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "build.html_output_dir must not be empty".into(),
            ));
        }
        if self.build.latex_compiler.trim().is_empty() {
            return Err(ConfigError::Validation(
                "build.latex_compiler must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Title page information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BookInfo {
    pub title: String,
    pub subtitle: String,
}

impl Default for BookInfo {
    fn default() -> Self {
        Self {
            title: "Family Cookbook".to_string(),
            subtitle: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Authorship {
    pub author: String,
    pub copyright: String,
}

/// Document style settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    /// LaTeX document class of the master document.
    pub documentclass: String,
    /// Base font size, e.g. `"11pt"`.
    pub font_size: String,
    /// Emit a table of contents.
    pub include_toc: bool,
    /// Load `makeidx` in the LaTeX book.
    pub include_index: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            documentclass: "book".to_string(),
            font_size: "11pt".to_string(),
            include_toc: true,
            include_index: false,
        }
    }
}

/// Output locations and compiler settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Build directory, relative to the content root.
    pub output_dir: String,
    /// HTML export directory, relative to `output_dir`.
    pub html_output_dir: String,
    /// Executable used to compile `book.tex`.
    pub latex_compiler: String,
    /// Run the LaTeX compiler after writing `book.tex`.
    pub compile_pdf: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: "_build".to_string(),
            html_output_dir: "html".to_string(),
            latex_compiler: "xelatex".to_string(),
            compile_pdf: true,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel extraction/conversion workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BookConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `book.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `book.toml` in the content root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<BookConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: BookConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `book.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Recipe Book Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Title page
# ---------------------------------------------------------------------------
[book]
title = "Family Cookbook"
subtitle = ""

[authorship]
author = ""
copyright = ""

# ---------------------------------------------------------------------------
# Style (shared by the LaTeX book and the HTML export)
# ---------------------------------------------------------------------------
[style]
# LaTeX document class of the master document.
documentclass = "book"
# Base font size; must end in "pt".
font_size = "11pt"
# Table of contents in both outputs.
include_toc = true
# Load makeidx in the LaTeX book.
include_index = false

# ---------------------------------------------------------------------------
# Build
# ---------------------------------------------------------------------------
[build]
# Build directory, relative to the content root. Directories starting with
# "_" or "." are never scanned as sections.
output_dir = "_build"
# HTML export directory, relative to output_dir.
html_output_dir = "html"
# Compiler used for book.tex; run twice so the table of contents resolves.
latex_compiler = "xelatex"
# Set to false to stop after writing book.tex.
compile_pdf = true

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for extraction and HTML conversion.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
