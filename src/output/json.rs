use crate::model::{
    AnalyzerFailure, AssessmentReport, FileError, PatternFinding, ProjectMetrics, Severity,
    UnresolvedImport, Violation,
};
use crate::output::{OutputFormatter, visible_violations};
use serde::Serialize;
use std::io::Write;

pub struct JsonOutput {
    pub min_severity: Severity,
    pub pretty: bool,
}

impl JsonOutput {
    pub fn new(min_severity: Severity) -> Self {
        Self {
            min_severity,
            pretty: true,
        }
    }

    #[must_use]
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new(Severity::Low)
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    project_name: &'a str,
    project_type: &'a str,
    metrics: &'a ProjectMetrics,
    violations: Vec<&'a Violation>,
    patterns: &'a [PatternFinding],
    parse_errors: &'a [FileError],
    unresolved_imports: &'a [UnresolvedImport],
    analyzer_failures: &'a [AnalyzerFailure],
}

impl OutputFormatter for JsonOutput {
    fn format<W: Write>(&self, report: &AssessmentReport, writer: &mut W) -> std::io::Result<()> {
        let json = JsonReport {
            version: env!("CARGO_PKG_VERSION"),
            project_name: &report.project_name,
            project_type: &report.project_type,
            metrics: &report.metrics,
            violations: visible_violations(report, self.min_severity),
            patterns: &report.patterns,
            parse_errors: &report.parse_errors,
            unresolved_imports: &report.unresolved_imports,
            analyzer_failures: &report.analyzer_failures,
        };

        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &json)?;
        } else {
            serde_json::to_writer(&mut *writer, &json)?;
        }
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::assess;
    use crate::cache::NoCache;
    use crate::config::Config;
    use crate::model::{Language, SourceFile};

    #[test]
    fn test_json_shape() {
        let sources = vec![SourceFile::new(
            "app/views/users.py",
            Language::Python,
            "rows = db.query(\"users\")\n",
        )];
        let report = assess(&sources, &Config::default(), &NoCache, None);

        let mut buffer = Vec::new();
        JsonOutput::default().compact().format(&report, &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value["violations"][0]["rule_id"], "LAYER-001");
        assert_eq!(value["violations"][0]["severity"], "HIGH");
        assert_eq!(value["violations"][0]["category"], "Layer");
        assert_eq!(value["metrics"]["files_analyzed"], 1);
        assert!(value["metrics"]["by_severity"]["CRITICAL"].is_number());
    }
}
