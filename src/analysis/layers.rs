use crate::analysis::{AnalysisContext, Analyzer, AnalyzerError, DependencyGraph};
use crate::config::Config;
use crate::model::{Category, Layer, ParsedFile, Severity, Violation};
use crate::parser::normalize_path;
use rayon::prelude::*;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static RAW_SQL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bSELECT\b.+\bFROM\b|\bINSERT\s+INTO\b|\bUPDATE\s+\w+\s+SET\b|\bDELETE\s+FROM\b")
        .expect("valid SQL regex")
});

/// ORM and driver calls that touch the database.
const DB_CALL_MARKERS: &[&str] = &[
    ".query(",
    ".execute(",
    ".executemany(",
    ".raw(",
    ".objects.",
    ".filter_by(",
    ".delete(",
    ".findOne(",
    ".findMany(",
    ".findUnique(",
    ".findAll(",
    ".aggregate(",
    "getRepository(",
    "createQueryBuilder(",
    "db.session.",
    "cursor(",
];

pub struct LayerAnalyzer;

impl Analyzer for LayerAnalyzer {
    fn name(&self) -> &'static str {
        "layers"
    }

    fn analyze(&self, ctx: &AnalysisContext) -> Result<Vec<Violation>, AnalyzerError> {
        if ctx.config.layers.is_empty() {
            return Ok(Vec::new());
        }
        let business = business_pattern(&ctx.config.business_markers).map_err(|e| {
            AnalyzerError::Internal {
                analyzer: self.name().to_string(),
                message: format!("invalid business-logic marker pattern: {}", e),
            }
        })?;

        let violations = ctx
            .files
            .par_iter()
            .filter(|f| f.ok())
            .flat_map_iter(|file| {
                // Unmapped files are outside the layering scheme
                let Some(layer) = ctx.config.layers.classify(file.path()) else {
                    return Vec::new();
                };
                let mut found = match layer {
                    Layer::Presentation => detect_db_access_in_presentation(file),
                    Layer::Data => business
                        .as_ref()
                        .map(|pattern| detect_business_logic_in_data(file, pattern))
                        .unwrap_or_default(),
                    Layer::Business => Vec::new(),
                };
                found.extend(detect_layer_imports(file, layer, ctx.graph, ctx.config));
                found
            })
            .collect();
        Ok(violations)
    }
}

/// Check if the indicator appears inside a string literal definition (e.g., in a config array).
fn is_string_literal_definition(line: &str, indicator: &str) -> bool {
    if let Some(pos) = line.find(indicator) {
        let trimmed = line[..pos].trim_end();
        if trimmed.ends_with('"') || trimmed.ends_with('\'') || trimmed.ends_with('`') {
            return true;
        }
    }
    false
}

/// Word-like markers must start on a word boundary, so `precursor(` is not `cursor(`.
fn contains_marker(line: &str, marker: &str) -> bool {
    let word_start = marker.starts_with(|c: char| c.is_alphanumeric() || c == '_');
    line.match_indices(marker).any(|(pos, _)| {
        !word_start
            || !line[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    })
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('#')
        || trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
}

/// At most one violation per source line; raw SQL outranks an ORM call.
pub fn detect_db_access_in_presentation(file: &ParsedFile) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (idx, line) in file.text.lines().enumerate() {
        if is_comment_line(line) {
            continue;
        }

        let hit = if RAW_SQL.is_match(line) {
            Some((Severity::Critical, "raw SQL".to_string()))
        } else {
            DB_CALL_MARKERS
                .iter()
                .find(|m| contains_marker(line, m) && !is_string_literal_definition(line, m))
                .map(|m| (Severity::High, format!("`{}`", m)))
        };

        if let Some((severity, marker)) = hit {
            violations.push(
                Violation::new(
                    "LAYER-001",
                    Category::Layer,
                    severity,
                    "Direct database access in presentation layer",
                    file.path(),
                )
                .at_line(idx + 1)
                .describe(format!(
                    "Presentation code issues {} directly: `{}`",
                    marker,
                    line.trim()
                ))
                .recommend("Move data access into a repository or service and call that instead.")
                .detail("marker", marker)
                .detail("layer", Layer::Presentation),
            );
        }
    }

    violations
}

/// `None` when no usable marker is configured.
pub fn business_pattern(markers: &[String]) -> Result<Option<Regex>, regex::Error> {
    let alternatives: Vec<String> = markers
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    Regex::new(&format!(r"\b(?:{})", alternatives.join("|"))).map(Some)
}

/// Aggregated per file.
pub fn detect_business_logic_in_data(file: &ParsedFile, pattern: &Regex) -> Vec<Violation> {
    let mut first_line = None;
    let mut markers: BTreeSet<&str> = BTreeSet::new();
    let mut hits = 0usize;

    for (idx, line) in file.text.lines().enumerate() {
        if is_comment_line(line) {
            continue;
        }
        let found: Vec<&str> = pattern.find_iter(line).map(|m| m.as_str()).collect();
        if found.is_empty() {
            continue;
        }
        first_line.get_or_insert(idx + 1);
        hits += 1;
        markers.extend(found);
    }

    let Some(line) = first_line else {
        return Vec::new();
    };
    let markers: Vec<&str> = markers.into_iter().collect();
    vec![
        Violation::new(
            "LAYER-002",
            Category::Layer,
            Severity::Medium,
            "Business logic in data layer",
            file.path(),
        )
        .at_line(line)
        .describe(format!(
            "Data-layer module contains business rules ({}) on {} line(s).",
            markers.join(", "),
            hits
        ))
        .recommend("Keep persistence code free of rules; move validation and calculations into the service layer.")
        .detail("markers", markers.join(","))
        .detail("lines", hits),
    ]
}

pub fn detect_layer_imports(
    file: &ParsedFile,
    layer: Layer,
    graph: &DependencyGraph,
    config: &Config,
) -> Vec<Violation> {
    let permitted = config.permitted_layers(layer);
    let mut seen = BTreeSet::new();
    let mut violations = Vec::new();

    for link in graph.links(&normalize_path(file.path())) {
        let Some(target_layer) = config.layers.classify(&link.target) else {
            continue;
        };
        if permitted.contains(&target_layer) || !seen.insert((link.line, link.target.clone())) {
            continue;
        }
        violations.push(
            Violation::new(
                "LAYER-003",
                Category::Layer,
                Severity::High,
                format!("{} layer imports from {} layer", layer, target_layer),
                file.path(),
            )
            .at_line(link.line)
            .describe(format!(
                "`{}` resolves to {} which belongs to the {} layer; {} may only depend on {}.",
                link.module_path,
                link.target.display(),
                target_layer,
                layer,
                permitted
                    .iter()
                    .map(Layer::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .recommend("Route the dependency through a layer this module is allowed to use.")
            .detail("from_layer", layer)
            .detail("to_layer", target_layer)
            .detail("target", link.target.display()),
        );
    }

    violations
}
