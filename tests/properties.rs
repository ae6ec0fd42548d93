//! Whole-pipeline properties over in-memory sources.

use archaudit::analysis::DependencyGraph;
use archaudit::config::SelfLoopPolicy;
use archaudit::metrics::overall_score;
use archaudit::model::{Language, ParsedFile};
use archaudit::parser::ParserRegistry;
use archaudit::{Category, Config, Severity, SourceFile, Violation, assess_sources};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

fn py(path: &str, content: &str) -> SourceFile {
    SourceFile::new(path, Language::Python, content)
}

fn ts(path: &str, content: &str) -> SourceFile {
    SourceFile::new(path, Language::TypeScript, content)
}

fn parse_all(sources: &[SourceFile]) -> Vec<ParsedFile> {
    let registry = ParserRegistry::new();
    sources.iter().map(|s| registry.parse(s)).collect()
}

fn mixed_corpus() -> Vec<SourceFile> {
    vec![
        py(
            "app/services/orders.py",
            "from app.models.order import Order\n\nclass OrderService:\n    def __init__(self, repo):\n        self.repo = repo\n    def total(self, order):\n        if order.kind == \"a\":\n            return 42\n        elif order.kind == \"b\":\n            return 42\n        return 42\n",
        ),
        py("app/models/order.py", "class Order:\n    def validate(self):\n        return True\n"),
        ts("web/pages/home.ts", "import { api } from '../lib/api';\nexport const home = () => api.query('x');\n"),
        ts("web/lib/api.ts", "import { home } from '../pages/home';\nexport const api = { query: (q: string) => q };\n"),
    ]
}

#[test]
fn test_idempotent_runs() {
    let config = Config::default();
    let first = assess_sources(&mixed_corpus(), &config);
    let second = assess_sources(&mixed_corpus(), &config);

    assert!(!first.violations.is_empty());
    assert_eq!(first.violations, second.violations);
    assert_eq!(first.metrics.overall_score, second.metrics.overall_score);
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn test_adding_critical_never_raises_score() {
    let base = assess_sources(&mixed_corpus(), &Config::default()).violations;
    let before = overall_score(&base);

    let mut with_critical = base.clone();
    with_critical.push(Violation::new(
        "LAYER-001",
        Category::Layer,
        Severity::Critical,
        "Direct database access in presentation layer",
        "web/pages/home.ts",
    ));
    let after = overall_score(&with_critical);

    assert!(after < before || after == 0);
}

#[test]
fn test_cycle_found_once_from_either_root() {
    let files = parse_all(&[
        ts("a.ts", "import { b } from './b';\nexport const a = b;\n"),
        ts("b.ts", "import { a } from './a';\nexport const b = a;\n"),
    ]);
    let graph = DependencyGraph::build(&files, SelfLoopPolicy::Suppress);

    let as_set = |cycles: Vec<Vec<PathBuf>>| -> Vec<BTreeSet<PathBuf>> {
        cycles.into_iter().map(|c| c.into_iter().collect()).collect()
    };
    let from_a = as_set(graph.find_cycles_from(Path::new("a.ts")));
    let from_b = as_set(graph.find_cycles_from(Path::new("b.ts")));

    assert_eq!(from_a.len(), 1);
    assert_eq!(from_a, from_b);
    assert_eq!(graph.find_cycles().len(), 1);

    let report = assess_sources(
        &[
            ts("a.ts", "import { b } from './b';\nexport const a = b;\n"),
            ts("b.ts", "import { a } from './a';\nexport const b = a;\n"),
        ],
        &Config::default(),
    );
    let cycles: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "COUP-001")
        .collect();
    assert_eq!(cycles.len(), 1);
}

#[test]
fn test_fan_in_fan_out_duality() {
    let files = parse_all(&[
        ts("src/a.ts", "import { b } from './b';\nimport { c } from './c';\nimport { b as b2 } from './b';\n"),
        ts("src/b.ts", "import { c } from './c';\n"),
        ts("src/c.ts", "import React from 'react';\nexport const c = 1;\n"),
        py("pkg/x.py", "from pkg import y\n"),
        py("pkg/y.py", "import os\n"),
        py("pkg/__init__.py", ""),
    ]);
    let graph = DependencyGraph::build(&files, SelfLoopPolicy::Suppress);

    let paths: Vec<PathBuf> = graph.paths().cloned().collect();
    let fan_in: usize = paths.iter().map(|p| graph.fan_in(p)).sum();
    let fan_out: usize = paths.iter().map(|p| graph.fan_out(p)).sum();
    assert_eq!(fan_in, graph.edge_count());
    assert_eq!(fan_out, graph.edge_count());

    for u in &paths {
        let targets: BTreeSet<&PathBuf> = graph.links(u).iter().map(|l| &l.target).collect();
        for v in targets {
            let dependents = graph.dependents(v);
            assert_eq!(dependents.iter().filter(|d| *d == u).count(), 1);
        }
    }
    assert_eq!(graph.fan_out(Path::new("src/a.ts")), 2);
    assert_eq!(graph.external_fan_out(Path::new("src/c.ts")), 1);
}

#[test]
fn test_one_bad_file_does_not_stop_the_run() {
    let mut sources: Vec<SourceFile> = (0..10)
        .map(|i| py(&format!("lib/mod{i}.py"), "def area(r):\n    return 42 * r + 42 - 42\n"))
        .collect();
    sources.push(py("lib/broken.py", "def broken(:\n    pass\n"));

    let report = assess_sources(&sources, &Config::default());

    assert_eq!(report.parse_errors.len(), 1);
    assert_eq!(report.parse_errors[0].file_path, PathBuf::from("lib/broken.py"));
    assert_eq!(report.metrics.files_analyzed, 11);
    assert_eq!(report.metrics.files_failed, 1);

    let flagged: BTreeSet<&PathBuf> = report.violations.iter().map(|v| &v.file_path).collect();
    assert_eq!(flagged.len(), 10);
    assert!(!flagged.contains(&PathBuf::from("lib/broken.py")));
}

#[test]
fn test_god_class_scenario() {
    let mut src = String::from("class Everything:\n");
    for i in 0..12 {
        src.push_str(&format!("    def m{i}(self):\n        return self.f{i}\n"));
    }
    for _ in 0..600 {
        src.push_str("    x = None\n");
    }
    let report = assess_sources(&[py("app/everything.py", &src)], &Config::default());

    let rules = ["SRP-001", "SRP-002", "ISP-001"];
    let hits: Vec<_> = report
        .violations
        .iter()
        .filter(|v| rules.contains(&v.rule_id.as_str()))
        .collect();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|v| v.file_path == PathBuf::from("app/everything.py")));
    assert!(hits.iter().all(|v| v.line == Some(1)));
    assert!(report.violations.iter().any(|v| v.rule_id == "SRP-003"));
}

#[test]
fn test_score_floor() {
    let violations: Vec<Violation> = (0..10)
        .map(|i| {
            Violation::new("LAYER-001", Category::Layer, Severity::Critical, "SQL", "v.py")
                .at_line(i + 1)
        })
        .collect();
    assert_eq!(overall_score(&violations), 0);
}

#[test]
fn test_layer_scenario() {
    let mut src = String::new();
    for i in 1..=11 {
        src.push_str(&format!("# note {i}\n"));
    }
    src.push_str("users = session.query(User).all()\n");
    let report = assess_sources(&[py("shop/views/users.py", &src)], &Config::default());

    let layer: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.category == Category::Layer)
        .collect();
    assert_eq!(layer.len(), 1);
    assert_eq!(layer[0].line, Some(12));
    assert!(layer[0].severity >= Severity::High);
}

#[test]
fn test_solid_and_overall_scores_diverge() {
    let mut sources = Vec::new();
    for i in 0..15 {
        sources.push(ts(
            &format!("ring{i}/left.ts"),
            "import { right } from './right';\nexport const left = () => right();\n",
        ));
        sources.push(ts(
            &format!("ring{i}/right.ts"),
            "import { left } from './left';\nexport const right = () => left();\n",
        ));
    }
    let report = assess_sources(&sources, &Config::default());

    assert_eq!(report.metrics.overall_score, 0);
    assert_eq!(report.metrics.solid_scores.overall, 100.0);
    assert_eq!(report.metrics.coupling.cycle_count, 15);
}

#[test]
fn test_report_order_and_ids() {
    let report = assess_sources(&mixed_corpus(), &Config::default());
    for (i, v) in report.violations.iter().enumerate() {
        assert_eq!(v.id, format!("V{:04}", i + 1));
    }
    for pair in report.violations.windows(2) {
        assert!(pair[0].severity >= pair[1].severity);
    }
}
