mod coupling;
mod drift;
mod graph;
mod layers;
mod patterns;
mod solid;

pub use coupling::{
    CouplingAnalyzer, detect_cycles, detect_deep_chains, detect_high_fan_in, detect_high_fan_out,
};
pub use drift::{DriftError, ExpectedPatterns, check_drift};
pub use graph::{DependencyGraph, ImportLink};
pub use layers::{
    LayerAnalyzer, detect_business_logic_in_data, detect_db_access_in_presentation,
    detect_layer_imports,
};
pub use patterns::{
    PatternAnalyzer, detect_complex_methods, detect_factory_opportunities, detect_global_state,
    detect_god_classes, detect_long_methods, detect_magic_numbers, detect_strategy_opportunities,
    detect_unused_imports, recognize_patterns,
};
pub use solid::{
    SolidAnalyzer, detect_dip, detect_isp, detect_lsp, detect_ocp, detect_srp, is_type_like_chain,
    lcom,
};

use crate::cache::{ParseCache, content_hash};
use crate::config::Config;
use crate::metrics::compute_metrics;
use crate::model::{
    AnalyzerFailure, AssessmentReport, FileError, ParsedFile, SourceFile, Violation, finalize,
};
use crate::parser::{ParserRegistry, decode_source};
use crate::project::detect_project_type;
use rayon::prelude::*;
use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("{analyzer} analyzer failed: {message}")]
    Internal { analyzer: String, message: String },
}

/// Everything an analyzer may read. Nothing in here is mutated during a run.
pub struct AnalysisContext<'a> {
    pub files: &'a [ParsedFile],
    pub graph: &'a DependencyGraph,
    pub config: &'a Config,
}

impl<'a> AnalysisContext<'a> {
    /// Files whose parse succeeded.
    pub fn parsed(&self) -> impl Iterator<Item = &'a ParsedFile> {
        self.files.iter().filter(|f| f.ok())
    }
}

pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;
    fn analyze(&self, ctx: &AnalysisContext) -> Result<Vec<Violation>, AnalyzerError>;
}

pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(SolidAnalyzer),
        Box::new(PatternAnalyzer),
        Box::new(LayerAnalyzer),
        Box::new(CouplingAnalyzer),
    ]
}

/// Run every analyzer in parallel. A failing or panicking analyzer
/// contributes no violations and is reported as a failure instead.
pub fn run_analyzers(
    analyzers: &[Box<dyn Analyzer>],
    ctx: &AnalysisContext,
) -> (Vec<Violation>, Vec<AnalyzerFailure>) {
    let outcomes: Vec<(&'static str, Result<Vec<Violation>, AnalyzerError>)> = analyzers
        .par_iter()
        .map(|analyzer| {
            let name = analyzer.name();
            let outcome = catch_unwind(AssertUnwindSafe(|| analyzer.analyze(ctx)))
                .unwrap_or_else(|panic| {
                    Err(AnalyzerError::Internal {
                        analyzer: name.to_string(),
                        message: panic_message(panic.as_ref()),
                    })
                });
            (name, outcome)
        })
        .collect();

    let mut violations = Vec::new();
    let mut failures = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(found) => violations.extend(found),
            Err(e) => {
                error!(analyzer = name, error = %e, "analyzer failed");
                failures.push(AnalyzerFailure {
                    analyzer: name.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
    (violations, failures)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}

/// Parse every source in parallel. Cache hits skip parsing; misses are
/// written back once all files are done.
pub fn parse_sources(
    sources: &[SourceFile],
    registry: &ParserRegistry,
    cache: &dyn ParseCache,
) -> Vec<ParsedFile> {
    let parsed: Vec<(ParsedFile, Option<String>)> = sources
        .par_iter()
        .map(|source| {
            let hash = content_hash(&source.content);
            match cache.get(&source.path, &hash) {
                Some(result) => (
                    ParsedFile {
                        result,
                        text: decode_source(&source.content),
                    },
                    None,
                ),
                None => (registry.parse(source), Some(hash)),
            }
        })
        .collect();

    parsed
        .into_iter()
        .map(|(file, miss)| {
            if let Some(hash) = miss.filter(|_| file.ok()) {
                cache.put(file.path(), &hash, &file.result);
            }
            file
        })
        .collect()
}

/// Run the whole pipeline over an ordered set of sources.
pub fn assess(
    sources: &[SourceFile],
    config: &Config,
    cache: &dyn ParseCache,
    expected: Option<&ExpectedPatterns>,
) -> AssessmentReport {
    assess_with(&default_analyzers(), sources, config, cache, expected)
}

pub fn assess_with(
    analyzers: &[Box<dyn Analyzer>],
    sources: &[SourceFile],
    config: &Config,
    cache: &dyn ParseCache,
    expected: Option<&ExpectedPatterns>,
) -> AssessmentReport {
    let registry = ParserRegistry::new().with_max_file_bytes(config.thresholds.max_file_bytes);
    let files = parse_sources(sources, &registry, cache);

    let parse_errors: Vec<FileError> = files
        .iter()
        .filter(|f| !f.ok())
        .map(|f| FileError {
            file_path: f.result.file_path.clone(),
            line: f.result.error_line,
            message: f.result.error.clone().unwrap_or_default(),
        })
        .collect();

    let graph = DependencyGraph::build(&files, config.self_loops);
    info!(
        files = files.len(),
        failed = parse_errors.len(),
        edges = graph.edge_count(),
        "dependency graph built"
    );

    let ctx = AnalysisContext {
        files: &files,
        graph: &graph,
        config,
    };
    let (mut violations, analyzer_failures) = run_analyzers(analyzers, &ctx);

    let patterns = recognize_patterns(&ctx);
    if let Some(expected) = expected {
        violations.extend(check_drift(expected, &patterns));
    }

    finalize(&mut violations);
    let metrics = compute_metrics(&violations, &ctx);
    info!(
        violations = violations.len(),
        score = metrics.overall_score,
        "assessment complete"
    );

    AssessmentReport {
        project_name: String::new(),
        project_type: detect_project_type(&files).to_string(),
        violations,
        metrics,
        patterns,
        parse_errors,
        unresolved_imports: graph.unresolved().to_vec(),
        analyzer_failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NoCache};
    use crate::model::{Category, Language, Severity};

    struct Exploding;

    impl Analyzer for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn analyze(&self, _ctx: &AnalysisContext) -> Result<Vec<Violation>, AnalyzerError> {
            panic!("boom");
        }
    }

    struct Fixed;

    impl Analyzer for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn analyze(&self, _ctx: &AnalysisContext) -> Result<Vec<Violation>, AnalyzerError> {
            Ok(vec![Violation::new(
                "PAT-004",
                Category::Pattern,
                Severity::Low,
                "Magic numbers",
                "a.py",
            )])
        }
    }

    fn sources() -> Vec<SourceFile> {
        vec![
            SourceFile::new("a.py", Language::Python, "import b\n"),
            SourceFile::new("b.py", Language::Python, "x = 1\n"),
        ]
    }

    #[test]
    fn test_panicking_analyzer_is_isolated() {
        let analyzers: Vec<Box<dyn Analyzer>> = vec![Box::new(Exploding), Box::new(Fixed)];
        let report = assess_with(&analyzers, &sources(), &Config::default(), &NoCache, None);

        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.analyzer_failures.len(), 1);
        assert_eq!(report.analyzer_failures[0].analyzer, "exploding");
        assert!(report.analyzer_failures[0].message.contains("boom"));
    }

    #[test]
    fn test_cache_hits_skip_parsing() {
        let cache = MemoryCache::new();
        let registry = ParserRegistry::new();
        let first = parse_sources(&sources(), &registry, &cache);
        assert_eq!(cache.len(), 2);

        let second = parse_sources(&sources(), &registry, &cache);
        assert_eq!(
            first.iter().map(|f| &f.result).collect::<Vec<_>>(),
            second.iter().map(|f| &f.result).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_failed_parse_is_not_cached() {
        let cache = MemoryCache::new();
        let bad = vec![SourceFile::new("bad.py", Language::Python, "def (:\n")];
        parse_sources(&bad, &ParserRegistry::new(), &cache);
        assert_eq!(cache.len(), 0);
    }
}
