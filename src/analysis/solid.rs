use crate::analysis::{AnalysisContext, Analyzer, AnalyzerError};
use crate::config::Config;
use crate::model::{
    Category, ClassDefinition, ConditionalChain, Layer, ParsedFile, Severity, Violation,
};
use rayon::prelude::*;
use regex::Regex;
use std::sync::LazyLock;

static TYPE_LIKE_DISCRIMINANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(type|kind|mode|strategy|format|action|category|variant|provider|channel|command|\bop\b)",
    )
    .expect("valid discriminant regex")
});

pub struct SolidAnalyzer;

impl Analyzer for SolidAnalyzer {
    fn name(&self) -> &'static str {
        "solid"
    }

    fn analyze(&self, ctx: &AnalysisContext) -> Result<Vec<Violation>, AnalyzerError> {
        let dip = dip_pattern(&ctx.config.dip_markers).map_err(|e| AnalyzerError::Internal {
            analyzer: self.name().to_string(),
            message: format!("invalid DIP marker pattern: {}", e),
        })?;

        let violations = ctx
            .files
            .par_iter()
            .filter(|f| f.ok())
            .flat_map_iter(|file| {
                let mut found = detect_srp(file, ctx.config);
                found.extend(detect_ocp(file, ctx.config));
                found.extend(detect_lsp(file));
                found.extend(detect_isp(file, ctx.config));
                if let Some(dip) = &dip {
                    found.extend(detect_dip(file, ctx.config, dip));
                }
                found
            })
            .collect();
        Ok(violations)
    }
}

/// Share of method pairs that touch no common instance field.
///
/// 0.0 when every pair shares a field, 1.0 when none do. Classes with fewer
/// than two methods, or whose methods touch no fields at all, count as cohesive.
pub fn lcom(class: &ClassDefinition) -> f64 {
    let fields: Vec<_> = class
        .methods
        .iter()
        .filter(|m| !m.is_static && !m.is_abstract)
        .map(|m| &m.instance_fields)
        .collect();

    if fields.len() < 2 || fields.iter().all(|f| f.is_empty()) {
        return 0.0;
    }

    let mut sharing = 0usize;
    let mut total = 0usize;
    for i in 0..fields.len() {
        for j in (i + 1)..fields.len() {
            total += 1;
            if fields[i].intersection(fields[j]).next().is_some() {
                sharing += 1;
            }
        }
    }
    1.0 - sharing as f64 / total as f64
}

pub fn detect_srp(file: &ParsedFile, config: &Config) -> Vec<Violation> {
    let t = &config.thresholds;
    let mut violations = Vec::new();

    for class in &file.result.classes {
        let loc = class.loc();
        if loc > t.max_class_loc {
            violations.push(
                Violation::new(
                    "SRP-001",
                    Category::Solid,
                    Severity::High,
                    format!("God Class: {}", class.name),
                    file.path(),
                )
                .at_line(class.start_line)
                .describe(format!(
                    "Class `{}` spans {} lines (limit {}), a sign it carries more than one responsibility.",
                    class.name, loc, t.max_class_loc
                ))
                .recommend("Split the class along its responsibilities into smaller collaborating classes.")
                .detail("class", &class.name)
                .detail("loc", loc)
                .detail("threshold", t.max_class_loc),
            );
        }

        if class.method_count > t.max_method_count {
            violations.push(
                Violation::new(
                    "SRP-002",
                    Category::Solid,
                    Severity::Medium,
                    format!("Too many methods: {}", class.name),
                    file.path(),
                )
                .at_line(class.start_line)
                .describe(format!(
                    "Class `{}` defines {} methods (limit {}).",
                    class.name, class.method_count, t.max_method_count
                ))
                .recommend("Group related methods and extract them into dedicated classes.")
                .detail("class", &class.name)
                .detail("method_count", class.method_count)
                .detail("threshold", t.max_method_count),
            );
        }

        if class.is_interface {
            continue;
        }
        let score = lcom(class);
        if score > t.lcom_threshold {
            violations.push(
                Violation::new(
                    "SRP-003",
                    Category::Solid,
                    Severity::Medium,
                    format!("Low cohesion: {}", class.name),
                    file.path(),
                )
                .at_line(class.start_line)
                .describe(format!(
                    "Methods of `{}` rarely share instance fields (LCOM {:.2}, limit {:.2}).",
                    class.name, score, t.lcom_threshold
                ))
                .recommend("Move methods that use disjoint fields into separate classes.")
                .detail("class", &class.name)
                .detail("lcom", format!("{:.2}", score)),
            );
        }
    }

    violations
}

/// A chain that dispatches on a type, kind or tag rather than on data.
pub fn is_type_like_chain(chain: &ConditionalChain) -> bool {
    chain.uses_type_check
        || (chain.discriminant.is_some() && chain.compares_literals)
        || chain
            .discriminant
            .as_deref()
            .is_some_and(|d| TYPE_LIKE_DISCRIMINANT.is_match(d))
}

/// One violation per threshold crossed, so a growing switch keeps surfacing.
pub fn detect_ocp(file: &ParsedFile, config: &Config) -> Vec<Violation> {
    let threshold = config.thresholds.strategy_branch_threshold;
    let mut violations = Vec::new();

    for chain in &file.result.conditional_chains {
        if chain.branch_count < threshold || !is_type_like_chain(chain) {
            continue;
        }
        let subject = chain.discriminant.as_deref().unwrap_or("a type tag");
        for crossed in threshold..=chain.branch_count {
            violations.push(
                Violation::new(
                    "OCP-001",
                    Category::Solid,
                    Severity::Medium,
                    format!("Type switch reached {} branches", crossed),
                    file.path(),
                )
                .at_line(chain.line)
                .describe(format!(
                    "Conditional on `{}` has {} branches; each new variant means editing this code.",
                    subject, chain.branch_count
                ))
                .recommend("Replace the branches with polymorphism or a strategy lookup table.")
                .detail("branches", chain.branch_count)
                .detail("threshold", crossed),
            );
        }
    }

    violations
}

pub fn detect_lsp(file: &ParsedFile) -> Vec<Violation> {
    let mut violations = Vec::new();

    for class in &file.result.classes {
        if !class.is_subclass() || class.is_interface {
            continue;
        }
        for method in &class.methods {
            if !method.raises_not_implemented || method.is_abstract {
                continue;
            }
            violations.push(
                Violation::new(
                    "LSP-001",
                    Category::Solid,
                    Severity::High,
                    format!("Refused bequest: {}.{}", class.name, method.name),
                    file.path(),
                )
                .at_line(method.start_line)
                .describe(format!(
                    "`{}` extends {} but `{}` unconditionally raises not-implemented, so it cannot stand in for its base.",
                    class.name,
                    class.bases.join(", "),
                    method.name
                ))
                .recommend("Implement the method, or stop inheriting behavior the subclass cannot honor.")
                .detail("class", &class.name)
                .detail("method", &method.name),
            );
        }
    }

    violations
}

pub fn detect_isp(file: &ParsedFile, config: &Config) -> Vec<Violation> {
    let t = &config.thresholds;
    let mut violations = Vec::new();

    for class in &file.result.classes {
        if class.method_count > t.fat_interface_methods {
            violations.push(
                Violation::new(
                    "ISP-001",
                    Category::Solid,
                    Severity::Medium,
                    format!("Fat interface: {}", class.name),
                    file.path(),
                )
                .at_line(class.start_line)
                .describe(format!(
                    "`{}` exposes {} methods (limit {}); clients depend on more than they use.",
                    class.name, class.method_count, t.fat_interface_methods
                ))
                .recommend("Split the interface into smaller role interfaces.")
                .detail("class", &class.name)
                .detail("method_count", class.method_count),
            );
        }

        if !class.is_subclass() {
            continue;
        }
        let stubs: Vec<&str> = class
            .methods
            .iter()
            .filter(|m| m.is_stub && !m.is_abstract && !m.is_constructor())
            .map(|m| m.name.as_str())
            .collect();
        if stubs.len() >= t.stub_method_min {
            violations.push(
                Violation::new(
                    "ISP-002",
                    Category::Solid,
                    Severity::Low,
                    format!("Stubbed overrides: {}", class.name),
                    file.path(),
                )
                .at_line(class.start_line)
                .describe(format!(
                    "`{}` leaves {} inherited methods empty: {}.",
                    class.name,
                    stubs.len(),
                    stubs.join(", ")
                ))
                .recommend("Depend on a narrower interface that only declares what this class supports.")
                .detail("class", &class.name)
                .detail("stubs", stubs.join(",")),
            );
        }
    }

    violations
}

/// Marker regex matched against import path segments, `None` when no usable
/// marker is configured.
pub fn dip_pattern(markers: &[String]) -> Result<Option<Regex>, regex::Error> {
    let alternatives: Vec<String> = markers
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    Regex::new(&format!(
        r"(?i)(^|[./\-_@])({})($|[./\-_])",
        alternatives.join("|")
    ))
    .map(Some)
}

pub fn detect_dip(file: &ParsedFile, config: &Config, pattern: &Regex) -> Vec<Violation> {
    if config.layers.classify(file.path()) == Some(Layer::Data) {
        return Vec::new();
    }

    file.result
        .imports
        .iter()
        .filter(|import| pattern.is_match(&import.module_path))
        .map(|import| {
            Violation::new(
                "DIP-001",
                Category::Solid,
                Severity::Medium,
                format!("Concrete dependency: {}", import.module_path),
                file.path(),
            )
            .at_line(import.line)
            .describe(format!(
                "Imports low-level module `{}` directly instead of depending on an abstraction.",
                import.module_path
            ))
            .recommend("Depend on an interface and inject the concrete client from the composition root.")
            .detail("import", &import.module_path)
        })
        .collect()
}
