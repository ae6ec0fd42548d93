use crate::analysis::{AnalysisContext, Analyzer, AnalyzerError, DependencyGraph};
use crate::config::Config;
use crate::model::{Category, Severity, Violation};
use std::path::{Path, PathBuf};

pub struct CouplingAnalyzer;

impl Analyzer for CouplingAnalyzer {
    fn name(&self) -> &'static str {
        "coupling"
    }

    fn analyze(&self, ctx: &AnalysisContext) -> Result<Vec<Violation>, AnalyzerError> {
        let mut violations = detect_cycles(ctx.graph);
        violations.extend(detect_high_fan_out(ctx.graph, ctx.config));
        violations.extend(detect_high_fan_in(ctx.graph, ctx.config));
        violations.extend(detect_deep_chains(ctx.graph, ctx.config));
        Ok(violations)
    }
}

fn import_line(graph: &DependencyGraph, from: &Path, to: &Path) -> Option<usize> {
    graph
        .links(from)
        .iter()
        .find(|l| l.target == to)
        .map(|l| l.line)
}

fn render_chain(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Violation> {
    graph
        .find_cycles()
        .into_iter()
        .map(|cycle| {
            let head = cycle[0].clone();
            let next = cycle.get(1).unwrap_or(&head);
            let mut closed = cycle.clone();
            closed.push(head.clone());
            let rendered = render_chain(&closed);

            let violation = if cycle.len() == 1 {
                Violation::new(
                    "COUP-001",
                    Category::Coupling,
                    Severity::Medium,
                    "Module imports itself",
                    &head,
                )
                .describe(format!("`{}` imports its own module.", head.display()))
                .recommend("Remove the self-import; refer to local names directly.")
            } else {
                Violation::new(
                    "COUP-001",
                    Category::Coupling,
                    Severity::High,
                    format!("Circular dependency across {} modules", cycle.len()),
                    &head,
                )
                .describe(format!("Import cycle: {}", rendered))
                .recommend("Break the cycle by extracting the shared part into a module both can depend on, or invert one dependency behind an interface.")
            };

            let violation = violation
                .detail("cycle", &rendered)
                .detail("length", cycle.len());
            match import_line(graph, &head, next) {
                Some(line) => violation.at_line(line),
                None => violation,
            }
        })
        .collect()
}

pub fn detect_high_fan_out(graph: &DependencyGraph, config: &Config) -> Vec<Violation> {
    let limit = config.thresholds.max_fan_out;
    graph
        .module_metrics()
        .into_iter()
        .filter(|m| m.total_fan_out() > limit)
        .map(|m| {
            Violation::new(
                "COUP-002",
                Category::Coupling,
                Severity::Medium,
                format!("High fan-out ({} dependencies)", m.total_fan_out()),
                &m.path,
            )
            .describe(format!(
                "`{}` depends on {} modules ({} internal, {} external); limit {}.",
                m.path.display(),
                m.total_fan_out(),
                m.fan_out,
                m.external_fan_out,
                limit
            ))
            .recommend("Split the module or introduce a facade so it depends on fewer collaborators.")
            .detail("fan_out", m.total_fan_out())
            .detail("internal", m.fan_out)
            .detail("external", m.external_fan_out)
            .detail("instability", format!("{:.2}", m.instability))
        })
        .collect()
}

/// Hub modules many others depend on: changes ripple widely.
pub fn detect_high_fan_in(graph: &DependencyGraph, config: &Config) -> Vec<Violation> {
    let limit = config.thresholds.max_fan_in;
    graph
        .module_metrics()
        .into_iter()
        .filter(|m| m.fan_in >= limit)
        .map(|m| {
            Violation::new(
                "COUP-003",
                Category::Coupling,
                Severity::Low,
                format!("High fan-in ({} dependents)", m.fan_in),
                &m.path,
            )
            .describe(format!(
                "{} modules import `{}`; any change here ripples to all of them.",
                m.fan_in,
                m.path.display()
            ))
            .recommend("Keep the module's interface small and stable, or split it by consumer.")
            .detail("fan_in", m.fan_in)
        })
        .collect()
}

pub fn detect_deep_chains(graph: &DependencyGraph, config: &Config) -> Vec<Violation> {
    let limit = config.thresholds.max_chain_depth;
    graph
        .deep_chains(limit)
        .into_iter()
        .map(|chain| {
            let depth = chain.len() - 1;
            let violation = Violation::new(
                "COUP-004",
                Category::Coupling,
                Severity::Low,
                format!("Deep dependency chain ({} levels)", depth),
                &chain[0],
            )
            .describe(format!("Import chain: {}", render_chain(&chain)))
            .recommend("Introduce an abstraction layer so high-level modules do not reach through many levels.")
            .detail("depth", depth)
            .detail("chain", render_chain(&chain));
            match import_line(graph, &chain[0], &chain[1]) {
                Some(line) => violation.at_line(line),
                None => violation,
            }
        })
        .collect()
}
