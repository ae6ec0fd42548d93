use crate::analysis::AnalysisContext;
use crate::model::{
    Category, CouplingMetrics, Layer, ProjectMetrics, Severity, SolidScores, Violation,
};
use std::collections::BTreeMap;

/// How many modules the report lists as most coupled.
const TOP_COUPLED: usize = 10;

/// Weighted deduction, floored at 0. Unrelated to the SOLID sub-scores.
pub fn overall_score(violations: &[Violation]) -> u32 {
    let deducted: u32 = violations.iter().map(|v| v.severity.weight()).sum();
    100u32.saturating_sub(deducted)
}

/// Number of things each principle was checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolidCoverage {
    pub classes: usize,
    pub functions: usize,
    pub subclass_methods: usize,
    pub non_data_files: usize,
}

impl SolidCoverage {
    pub fn from_context(ctx: &AnalysisContext) -> Self {
        let mut coverage = Self::default();
        for file in ctx.parsed() {
            coverage.classes += file.result.classes.len();
            coverage.functions += file.result.all_functions().count();
            coverage.subclass_methods += file
                .result
                .classes
                .iter()
                .filter(|c| c.is_subclass() && !c.is_interface)
                .map(|c| c.methods.len())
                .sum::<usize>();
            if ctx.config.layers.classify(file.path()) != Some(Layer::Data) {
                coverage.non_data_files += 1;
            }
        }
        coverage
    }
}

fn principle_score(violations: usize, considered: usize) -> f64 {
    let ratio = violations as f64 / considered.max(1) as f64;
    (100.0 - 100.0 * ratio).max(0.0)
}

pub fn solid_scores(violations: &[Violation], coverage: SolidCoverage) -> SolidScores {
    let mut per_principle: BTreeMap<&str, usize> = BTreeMap::new();
    for principle in violations.iter().filter_map(Violation::principle) {
        *per_principle.entry(principle).or_default() += 1;
    }
    let count = |p: &str| per_principle.get(p).copied().unwrap_or(0);

    let srp = principle_score(count("SRP"), coverage.classes);
    let ocp = principle_score(count("OCP"), coverage.functions);
    let lsp = principle_score(count("LSP"), coverage.subclass_methods);
    let isp = principle_score(count("ISP"), coverage.classes);
    let dip = principle_score(count("DIP"), coverage.non_data_files);

    SolidScores {
        srp,
        ocp,
        lsp,
        isp,
        dip,
        overall: (srp + ocp + lsp + isp + dip) / 5.0,
    }
}

fn coupling_metrics(ctx: &AnalysisContext) -> CouplingMetrics {
    let mut modules = ctx.graph.module_metrics();
    if modules.is_empty() {
        return CouplingMetrics::default();
    }

    let total: usize = modules.iter().map(|m| m.total_fan_out()).sum();
    let max_fan_out = modules
        .iter()
        .map(|m| m.total_fan_out())
        .max()
        .unwrap_or(0);
    let avg_fan_out = total as f64 / modules.len() as f64;

    modules.sort_by(|a, b| {
        (b.fan_in + b.total_fan_out())
            .cmp(&(a.fan_in + a.total_fan_out()))
            .then_with(|| a.path.cmp(&b.path))
    });
    modules.truncate(TOP_COUPLED);

    CouplingMetrics {
        avg_fan_out,
        max_fan_out,
        top_coupled_modules: modules,
        edge_count: ctx.graph.edge_count(),
        cycle_count: ctx.graph.find_cycles().len(),
    }
}

pub fn compute_metrics(violations: &[Violation], ctx: &AnalysisContext) -> ProjectMetrics {
    let mut by_severity: BTreeMap<Severity, usize> =
        Severity::all().into_iter().map(|s| (s, 0)).collect();
    let mut by_category: BTreeMap<Category, usize> = BTreeMap::new();
    for v in violations {
        *by_severity.entry(v.severity).or_default() += 1;
        *by_category.entry(v.category).or_default() += 1;
    }

    ProjectMetrics {
        overall_score: overall_score(violations),
        solid_scores: solid_scores(violations, SolidCoverage::from_context(ctx)),
        coupling: coupling_metrics(ctx),
        files_analyzed: ctx.files.len(),
        files_failed: ctx.files.iter().filter(|f| !f.ok()).count(),
        by_severity,
        by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(rule: &str, category: Category, severity: Severity) -> Violation {
        Violation::new(rule, category, severity, "t", "a.py")
    }

    #[test]
    fn test_score_floors_at_zero() {
        let violations: Vec<_> = (0..10)
            .map(|_| violation("COUP-001", Category::Coupling, Severity::Critical))
            .collect();
        assert_eq!(overall_score(&violations), 0);

        let more: Vec<_> = (0..25)
            .map(|_| violation("COUP-001", Category::Coupling, Severity::Critical))
            .collect();
        assert_eq!(overall_score(&more), 0);
    }

    #[test]
    fn test_critical_strictly_lowers_score() {
        let mut violations = vec![
            violation("PAT-004", Category::Pattern, Severity::Low),
            violation("SRP-002", Category::Solid, Severity::Medium),
        ];
        let before = overall_score(&violations);
        violations.push(violation("LAYER-001", Category::Layer, Severity::Critical));
        assert!(overall_score(&violations) < before);
        assert_eq!(before, 95);
    }

    #[test]
    fn test_solid_stays_perfect_while_overall_hits_floor() {
        let violations: Vec<_> = (0..15)
            .map(|_| violation("COUP-001", Category::Coupling, Severity::High))
            .collect();
        let coverage = SolidCoverage {
            classes: 4,
            functions: 20,
            subclass_methods: 3,
            non_data_files: 6,
        };
        let solid = solid_scores(&violations, coverage);

        assert_eq!(overall_score(&violations), 0);
        assert_eq!(solid.overall, 100.0);
    }

    #[test]
    fn test_principle_score_uses_coverage() {
        let violations = vec![violation("SRP-001", Category::Solid, Severity::High)];
        let coverage = SolidCoverage {
            classes: 4,
            ..Default::default()
        };
        let solid = solid_scores(&violations, coverage);
        assert_eq!(solid.srp, 75.0);
        assert_eq!(solid.isp, 100.0);
    }

    #[test]
    fn test_more_violations_than_subjects_floors_at_zero() {
        let violations = vec![
            violation("DIP-001", Category::Solid, Severity::Medium),
            violation("DIP-001", Category::Solid, Severity::Medium),
        ];
        let coverage = SolidCoverage {
            non_data_files: 1,
            ..Default::default()
        };
        assert_eq!(solid_scores(&violations, coverage).dip, 0.0);
    }
}
