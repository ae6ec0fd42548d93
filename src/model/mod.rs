mod layer;
mod metrics;
mod pattern;
mod source;
mod violation;

pub use layer::{Layer, LayerMap, glob_match, validate_glob};
pub use metrics::{CouplingMetrics, ModuleCoupling, ProjectMetrics, SolidScores};
pub use pattern::{PatternFinding, PatternKind};
pub use source::{
    ClassDefinition, ConditionalChain, FunctionDefinition, GlobalWrite, ImportKind,
    ImportStatement, Instantiation, Language, NumericLiteral, ParseResult, ParsedFile,
    SourceFile, is_root_base,
};
pub use violation::{Category, Severity, Violation, finalize};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file whose parse failed; kept so the report can show it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileError {
    pub file_path: PathBuf,
    pub line: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Bare specifier with no matching module: an installed package.
    External,
    /// Relative import whose target is not among the analyzed files.
    MissingTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnresolvedImport {
    pub source_file: PathBuf,
    pub module_path: String,
    pub line: usize,
    pub reason: UnresolvedReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzerFailure {
    pub analyzer: String,
    pub message: String,
}

/// Everything one assessment run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub project_name: String,
    pub project_type: String,
    pub violations: Vec<Violation>,
    pub metrics: ProjectMetrics,
    pub patterns: Vec<PatternFinding>,
    pub parse_errors: Vec<FileError>,
    pub unresolved_imports: Vec<UnresolvedImport>,
    pub analyzer_failures: Vec<AnalyzerFailure>,
}

impl AssessmentReport {
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity >= severity)
            .count()
    }
}
