use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Design patterns recognized as present in the codebase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Repository,
    Factory,
    Strategy,
    DependencyInjection,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKind::Repository => write!(f, "Repository"),
            PatternKind::Factory => write!(f, "Factory"),
            PatternKind::Strategy => write!(f, "Strategy"),
            PatternKind::DependencyInjection => write!(f, "Dependency Injection"),
        }
    }
}

impl std::str::FromStr for PatternKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "repository" => Ok(PatternKind::Repository),
            "factory" => Ok(PatternKind::Factory),
            "strategy" => Ok(PatternKind::Strategy),
            "dependency_injection" | "di" => Ok(PatternKind::DependencyInjection),
            _ => Err(format!("Unknown pattern: {}", s)),
        }
    }
}

/// Informational finding; never counted against the score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternFinding {
    pub kind: PatternKind,
    pub file_path: PathBuf,
    pub line: usize,
    pub subject: String,
    pub evidence: String,
}
