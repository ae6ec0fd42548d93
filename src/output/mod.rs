mod json;
mod markdown;
mod tasks;

pub use json::JsonOutput;
pub use markdown::MarkdownOutput;
pub use tasks::TaskListOutput;

use crate::model::{AssessmentReport, Severity, Violation};
use std::io::Write;

/// Reporters only format; every number they print comes from the report.
pub trait OutputFormatter {
    fn format<W: Write>(&self, report: &AssessmentReport, writer: &mut W) -> std::io::Result<()>;
}

/// Violations at or above `min_severity`, in report order.
pub fn visible_violations(report: &AssessmentReport, min_severity: Severity) -> Vec<&Violation> {
    report
        .violations
        .iter()
        .filter(|v| v.severity >= min_severity)
        .collect()
}

/// `path:line`, or just the path for file-level findings.
pub fn location(violation: &Violation) -> String {
    let path = violation.file_path.display().to_string();
    let path = if path.is_empty() { "(project)".to_string() } else { path };
    match violation.line {
        Some(line) => format!("{}:{}", path, line),
        None => path,
    }
}

pub fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🔴",
        Severity::High => "🟠",
        Severity::Medium => "🟡",
        Severity::Low => "🔵",
    }
}
