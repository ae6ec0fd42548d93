use crate::config::SelfLoopPolicy;
use crate::model::Severity;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "archaudit")]
#[command(about = "Assess the architecture of Python and JavaScript/TypeScript codebases")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to analyze (defaults to current directory)
    /// Used when no subcommand is specified
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a full architecture assessment (default behavior)
    Analyze(AnalyzeArgs),

    /// Generate a starter .archaudit.toml configuration file
    Init(InitArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to analyze (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "markdown")]
    pub format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Minimum severity to report
    #[arg(long, default_value = "low")]
    pub min_severity: Severity,

    /// Exit with code 1 when a violation at or above this severity exists
    #[arg(long, default_value = "critical")]
    pub fail_on: Severity,

    /// Config file (defaults to <path>/.archaudit.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Languages to analyze (comma-separated: python,typescript)
    #[arg(long, value_delimiter = ',')]
    pub lang: Option<Vec<String>>,

    /// Do not read or write the parse cache
    #[arg(long)]
    pub no_cache: bool,

    /// How a module importing itself is treated
    #[arg(long)]
    pub self_loops: Option<SelfLoopPolicy>,

    /// Expected-patterns document for the drift check
    #[arg(long)]
    pub expected_patterns: Option<PathBuf>,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            format: OutputFormat::Markdown,
            output: None,
            min_severity: Severity::Low,
            fail_on: Severity::Critical,
            config: None,
            lang: None,
            no_cache: false,
            self_loops: None,
            expected_patterns: None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Path where to create .archaudit.toml (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
    Tasks,
}
