use crate::model::{Category, PatternFinding, PatternKind, Severity, Violation};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("Failed to read expected-patterns document: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse expected-patterns document: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Unknown pattern `{0}` (expected repository, factory, strategy or dependency_injection)")]
    UnknownPattern(String),
}

/// Patterns the architecture is documented to use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedPatterns {
    pub expected: Vec<PatternKind>,
}

#[derive(Debug, Deserialize)]
struct RawExpected {
    expected: Option<Vec<String>>,
}

impl ExpectedPatterns {
    pub fn new(expected: Vec<PatternKind>) -> Self {
        Self { expected }
    }

    pub fn load(path: &Path) -> Result<Self, DriftError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, DriftError> {
        let raw: RawExpected = toml::from_str(content)?;
        let mut expected = Vec::new();
        for name in raw.expected.unwrap_or_default() {
            let kind: PatternKind = name
                .parse()
                .map_err(|_| DriftError::UnknownPattern(name.clone()))?;
            if !expected.contains(&kind) {
                expected.push(kind);
            }
        }
        Ok(Self { expected })
    }
}

/// One violation per expected pattern that was never recognized.
pub fn check_drift(expected: &ExpectedPatterns, found: &[PatternFinding]) -> Vec<Violation> {
    expected
        .expected
        .iter()
        .filter(|kind| !found.iter().any(|f| f.kind == **kind))
        .map(|kind| {
            Violation::new(
                "PAT-009",
                Category::Pattern,
                Severity::Low,
                format!("Expected pattern missing: {}", kind),
                "",
            )
            .describe(format!(
                "The architecture documents the {} pattern but no occurrence was found.",
                kind
            ))
            .recommend("Either apply the documented pattern or update the expected-patterns document.")
            .detail("pattern", kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn finding(kind: PatternKind) -> PatternFinding {
        PatternFinding {
            kind,
            file_path: PathBuf::from("app/repo.py"),
            line: 1,
            subject: "UserRepository".to_string(),
            evidence: "name".to_string(),
        }
    }

    #[test]
    fn test_parse_document() {
        let doc = ExpectedPatterns::from_toml("expected = [\"repository\", \"DI\", \"repository\"]\n")
            .unwrap();
        assert_eq!(
            doc.expected,
            vec![PatternKind::Repository, PatternKind::DependencyInjection]
        );
    }

    #[test]
    fn test_unknown_pattern_rejected() {
        let err = ExpectedPatterns::from_toml("expected = [\"singleton\"]\n").unwrap_err();
        assert!(matches!(err, DriftError::UnknownPattern(ref p) if p == "singleton"));
    }

    #[test]
    fn test_missing_patterns_reported() {
        let expected = ExpectedPatterns::new(vec![PatternKind::Repository, PatternKind::Factory]);
        let found = check_drift(&expected, &[finding(PatternKind::Repository)]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule_id, "PAT-009");
        assert_eq!(found[0].details["pattern"], "Factory");
    }
}
