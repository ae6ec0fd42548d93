pub mod analysis;
pub mod api;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod fs;
pub mod metrics;
pub mod model;
pub mod output;
pub mod parser;
pub mod project;
pub mod style;

pub use api::{AssessOptions, AuditError, assess_path, assess_sources};
pub use cli::Cli;
pub use commands::{cmd_analyze, cmd_init};
pub use config::{Config, ConfigError, SelfLoopPolicy};
pub use model::{AssessmentReport, Category, ProjectMetrics, Severity, SourceFile, Violation};
