use crate::model::{AssessmentReport, Category, Severity, UnresolvedReason};
use crate::output::{OutputFormatter, location, severity_marker, visible_violations};
use std::io::Write;

pub struct MarkdownOutput {
    pub min_severity: Severity,
}

impl MarkdownOutput {
    pub fn new(min_severity: Severity) -> Self {
        Self { min_severity }
    }
}

impl Default for MarkdownOutput {
    fn default() -> Self {
        Self::new(Severity::Low)
    }
}

fn category_heading(category: Category) -> &'static str {
    match category {
        Category::Solid => "SOLID Principles",
        Category::Pattern => "Patterns & Anti-Patterns",
        Category::Layer => "Layer Separation",
        Category::Coupling => "Coupling",
    }
}

impl OutputFormatter for MarkdownOutput {
    fn format<W: Write>(&self, report: &AssessmentReport, writer: &mut W) -> std::io::Result<()> {
        let metrics = &report.metrics;
        writeln!(writer, "# Architecture Assessment: {}\n", report.project_name)?;
        writeln!(writer, "**Project type:** {}\n", report.project_type)?;

        writeln!(writer, "## Summary\n")?;
        writeln!(writer, "- **Overall score:** {}/100", metrics.overall_score)?;
        writeln!(
            writer,
            "- **SOLID score:** {:.0}/100",
            metrics.solid_scores.overall
        )?;
        writeln!(
            writer,
            "- **Files analyzed:** {} ({} failed to parse)",
            metrics.files_analyzed, metrics.files_failed
        )?;
        let counts: Vec<String> = Severity::all()
            .into_iter()
            .map(|s| format!("{} {}", metrics.by_severity.get(&s).copied().unwrap_or(0), s))
            .collect();
        writeln!(writer, "- **Violations:** {}\n", counts.join(", "))?;

        writeln!(writer, "### SOLID\n")?;
        writeln!(writer, "| Principle | Score |")?;
        writeln!(writer, "|---|---|")?;
        let solid = &metrics.solid_scores;
        for (name, score) in [
            ("Single Responsibility", solid.srp),
            ("Open/Closed", solid.ocp),
            ("Liskov Substitution", solid.lsp),
            ("Interface Segregation", solid.isp),
            ("Dependency Inversion", solid.dip),
        ] {
            writeln!(writer, "| {} | {:.0} |", name, score)?;
        }
        writeln!(writer)?;

        let coupling = &metrics.coupling;
        writeln!(writer, "### Coupling\n")?;
        writeln!(
            writer,
            "- {} internal edges, {} cycle(s), average fan-out {:.1}, max fan-out {}\n",
            coupling.edge_count, coupling.cycle_count, coupling.avg_fan_out, coupling.max_fan_out
        )?;
        if !coupling.top_coupled_modules.is_empty() {
            writeln!(writer, "| Module | Fan-in | Fan-out | External | Instability |")?;
            writeln!(writer, "|---|---|---|---|---|")?;
            for m in &coupling.top_coupled_modules {
                writeln!(
                    writer,
                    "| `{}` | {} | {} | {} | {:.2} |",
                    m.path.display(),
                    m.fan_in,
                    m.fan_out,
                    m.external_fan_out,
                    m.instability
                )?;
            }
            writeln!(writer)?;
        }

        let violations = visible_violations(report, self.min_severity);
        if violations.is_empty() {
            writeln!(writer, "## No Violations Found\n")?;
        } else {
            writeln!(writer, "## Violations\n")?;
            for category in [
                Category::Layer,
                Category::Coupling,
                Category::Solid,
                Category::Pattern,
            ] {
                let in_category: Vec<_> =
                    violations.iter().filter(|v| v.category == category).collect();
                if in_category.is_empty() {
                    continue;
                }
                writeln!(writer, "### {}\n", category_heading(category))?;
                for v in in_category {
                    writeln!(
                        writer,
                        "- {} **{}** `{}` {} (`{}`)",
                        severity_marker(v.severity),
                        v.id,
                        v.rule_id,
                        v.title,
                        location(v)
                    )?;
                    if !v.description.is_empty() {
                        writeln!(writer, "  {}", v.description)?;
                    }
                    if !v.recommendation.is_empty() {
                        writeln!(writer, "  → {}", v.recommendation)?;
                    }
                }
                writeln!(writer)?;
            }
        }

        if !report.patterns.is_empty() {
            writeln!(writer, "## Recognized Patterns\n")?;
            for p in &report.patterns {
                writeln!(
                    writer,
                    "- **{}**: `{}` in `{}:{}` ({})",
                    p.kind,
                    p.subject,
                    p.file_path.display(),
                    p.line,
                    p.evidence
                )?;
            }
            writeln!(writer)?;
        }

        if !report.parse_errors.is_empty() {
            writeln!(writer, "## Parse Errors\n")?;
            for e in &report.parse_errors {
                let line = e.line.map(|l| format!(":{}", l)).unwrap_or_default();
                writeln!(writer, "- `{}{}`: {}", e.file_path.display(), line, e.message)?;
            }
            writeln!(writer)?;
        }

        let missing: Vec<_> = report
            .unresolved_imports
            .iter()
            .filter(|u| u.reason == UnresolvedReason::MissingTarget)
            .collect();
        let external = report.unresolved_imports.len() - missing.len();
        if !missing.is_empty() {
            writeln!(writer, "## Unresolved Imports\n")?;
            for u in missing.iter().take(20) {
                writeln!(
                    writer,
                    "- `{}:{}` imports `{}`, which is not among the analyzed files",
                    u.source_file.display(),
                    u.line,
                    u.module_path
                )?;
            }
            if missing.len() > 20 {
                writeln!(writer, "- ... and {} more", missing.len() - 20)?;
            }
            writeln!(writer)?;
        }
        if external > 0 {
            writeln!(writer, "_{} external package import(s) not analyzed._\n", external)?;
        }

        if !report.analyzer_failures.is_empty() {
            writeln!(writer, "## Analyzer Failures\n")?;
            for f in &report.analyzer_failures {
                writeln!(writer, "- **{}**: {}", f.analyzer, f.message)?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::assess;
    use crate::cache::NoCache;
    use crate::config::Config;
    use crate::model::{Language, SourceFile};

    fn render(min_severity: Severity) -> String {
        let sources = vec![
            SourceFile::new("app/views/users.py", Language::Python, "rows = db.query(\"users\")\n"),
            SourceFile::new("broken.py", Language::Python, "def (:\n"),
        ];
        let mut report = assess(&sources, &Config::default(), &NoCache, None);
        report.project_name = "shop".to_string();

        let mut buffer = Vec::new();
        MarkdownOutput::new(min_severity)
            .format(&report, &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_renders_sections() {
        let out = render(Severity::Low);
        assert!(out.starts_with("# Architecture Assessment: shop"));
        assert!(out.contains("## Summary"));
        assert!(out.contains("### Layer Separation"));
        assert!(out.contains("LAYER-001"));
        assert!(out.contains("app/views/users.py:1"));
        assert!(out.contains("## Parse Errors"));
        assert!(out.contains("broken.py"));
    }

    #[test]
    fn test_min_severity_hides_lower() {
        let out = render(Severity::Critical);
        assert!(!out.contains("LAYER-001"));
        assert!(out.contains("## No Violations Found"));
    }
}
