//! Library API for archaudit.
//!
//! Unlike the CLI commands, which print output and return exit codes, these
//! functions return `Result`s for the calling code to handle.
//!
//! # Example
//!
//! ```no_run
//! use archaudit::{assess_path, AssessOptions};
//! use std::path::Path;
//!
//! let report = assess_path(Path::new("."), AssessOptions::default())?;
//! println!("Overall score: {}/100", report.metrics.overall_score);
//! for v in &report.violations {
//!     println!("{} {} {}", v.id, v.rule_id, v.title);
//! }
//! # Ok::<(), archaudit::AuditError>(())
//! ```

use crate::analysis::{self, ExpectedPatterns};
use crate::cache::{CACHE_FILE, JsonFileCache, NoCache};
use crate::config::{Config, ConfigError, SelfLoopPolicy};
use crate::fs::{default_fs, discover_sources};
use crate::model::{AssessmentReport, SourceFile};
use crate::parser::ParserRegistry;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AuditError {
    /// The specified path could not be found or resolved.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for `assess_path`.
#[derive(Debug, Clone, Default)]
pub struct AssessOptions {
    /// Languages to analyze (empty means all supported languages).
    pub languages: Vec<String>,

    /// Config file to use instead of `<path>/.archaudit.toml`.
    pub config_path: Option<PathBuf>,

    /// Reuse parse results from `<path>/.archaudit-cache.json` and update it.
    pub use_cache: bool,

    /// Overrides `[graph] self_loops`.
    pub self_loops: Option<SelfLoopPolicy>,

    /// Overrides `[drift] expected_patterns`.
    pub expected_patterns: Option<PathBuf>,
}

fn load_config(root: &Path, options: &AssessOptions) -> Result<Config, AuditError> {
    let mut config = match &options.config_path {
        Some(path) => Config::load_file(path)?,
        None => Config::load(root)?,
    };
    if let Some(policy) = options.self_loops {
        config.self_loops = policy;
    }
    if let Some(path) = &options.expected_patterns {
        config.expected_patterns = Some(path.clone());
    }
    Ok(config)
}

/// An unreadable document is logged and treated as absent.
fn load_expected(root: &Path, config: &Config) -> Option<ExpectedPatterns> {
    let path = config.expected_patterns.as_ref()?;
    let path = if path.is_absolute() {
        path.clone()
    } else {
        root.join(path)
    };
    match ExpectedPatterns::load(&path) {
        Ok(expected) => Some(expected),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping drift check");
            None
        }
    }
}

/// Discover, parse and assess every supported source file under `path`.
///
/// Configuration errors are returned before any file is read.
pub fn assess_path(path: &Path, options: AssessOptions) -> Result<AssessmentReport, AuditError> {
    let root = path
        .canonicalize()
        .map_err(|_| AuditError::PathNotFound(path.to_path_buf()))?;
    let config = load_config(&root, &options)?;

    let registry = if options.languages.is_empty() {
        ParserRegistry::new()
    } else {
        ParserRegistry::with_languages(&options.languages)
    };
    let sources = discover_sources(&root, &registry, &config.exclude, default_fs());
    info!(root = %root.display(), files = sources.len(), "discovered sources");

    let expected = load_expected(&root, &config);

    let mut report = if options.use_cache {
        let cache = JsonFileCache::load(root.join(CACHE_FILE));
        let report = analysis::assess(&sources, &config, &cache, expected.as_ref());
        if let Err(e) = cache.flush() {
            warn!(error = %e, "could not write parse cache");
        }
        report
    } else {
        analysis::assess(&sources, &config, &NoCache, expected.as_ref())
    };

    report.project_name = root
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("project")
        .to_string();
    Ok(report)
}

/// Assess an already-collected set of sources. No cache, no drift check.
pub fn assess_sources(sources: &[SourceFile], config: &Config) -> AssessmentReport {
    let mut report = analysis::assess(sources, config, &NoCache, None);
    report.project_name = "project".to_string();
    report
}
