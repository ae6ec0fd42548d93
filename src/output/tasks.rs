use crate::model::{AssessmentReport, Severity};
use crate::output::{OutputFormatter, location, visible_violations};
use std::io::Write;

/// A markdown checklist, one task per violation, worst first.
pub struct TaskListOutput {
    pub min_severity: Severity,
}

impl TaskListOutput {
    pub fn new(min_severity: Severity) -> Self {
        Self { min_severity }
    }
}

impl Default for TaskListOutput {
    fn default() -> Self {
        Self::new(Severity::Low)
    }
}

impl OutputFormatter for TaskListOutput {
    fn format<W: Write>(&self, report: &AssessmentReport, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "# Refactoring Tasks: {}\n", report.project_name)?;

        let violations = visible_violations(report, self.min_severity);
        if violations.is_empty() {
            writeln!(writer, "Nothing to do.")?;
            return Ok(());
        }

        for severity in Severity::all() {
            let group: Vec<_> = violations.iter().filter(|v| v.severity == severity).collect();
            if group.is_empty() {
                continue;
            }
            writeln!(writer, "## {} ({})\n", severity, group.len())?;
            for v in group {
                writeln!(
                    writer,
                    "- [ ] **{}** {}: {} (`{}`)",
                    v.rule_id,
                    v.id,
                    v.title,
                    location(v)
                )?;
                if !v.recommendation.is_empty() {
                    writeln!(writer, "  - {}", v.recommendation)?;
                }
            }
            writeln!(writer)?;
        }

        if !report.parse_errors.is_empty() {
            writeln!(writer, "## Fix parse errors\n")?;
            for e in &report.parse_errors {
                writeln!(writer, "- [ ] `{}`: {}", e.file_path.display(), e.message)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, ProjectMetrics, Violation, finalize};

    fn report(violations: Vec<Violation>) -> AssessmentReport {
        AssessmentReport {
            project_name: "demo".to_string(),
            project_type: "Python".to_string(),
            violations,
            metrics: ProjectMetrics {
                overall_score: 100,
                solid_scores: Default::default(),
                coupling: Default::default(),
                files_analyzed: 0,
                files_failed: 0,
                by_severity: Default::default(),
                by_category: Default::default(),
            },
            patterns: Vec::new(),
            parse_errors: Vec::new(),
            unresolved_imports: Vec::new(),
            analyzer_failures: Vec::new(),
        }
    }

    #[test]
    fn test_grouped_by_severity() {
        let mut violations = vec![
            Violation::new("PAT-004", Category::Pattern, Severity::Low, "Magic numbers", "a.py"),
            Violation::new("COUP-001", Category::Coupling, Severity::High, "Cycle", "b.py")
                .recommend("Break the cycle."),
        ];
        finalize(&mut violations);

        let mut buffer = Vec::new();
        TaskListOutput::default()
            .format(&report(violations), &mut buffer)
            .unwrap();
        let out = String::from_utf8(buffer).unwrap();

        let high = out.find("## HIGH (1)").unwrap();
        let low = out.find("## LOW (1)").unwrap();
        assert!(high < low);
        assert!(out.contains("- [ ] **COUP-001** V0001: Cycle (`b.py`)"));
        assert!(out.contains("  - Break the cycle."));
    }

    #[test]
    fn test_empty_report() {
        let mut buffer = Vec::new();
        TaskListOutput::default()
            .format(&report(Vec::new()), &mut buffer)
            .unwrap();
        assert!(String::from_utf8(buffer).unwrap().contains("Nothing to do."));
    }
}
