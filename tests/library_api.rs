//! Integration tests for the archaudit library API against on-disk projects.

use archaudit::cache::CACHE_FILE;
use archaudit::{AssessOptions, AuditError, SelfLoopPolicy, assess_path};
use std::path::{Path, PathBuf};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn sample_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "shop/views/orders.py",
        "from shop.services.billing import BillingService\n\ndef show(request):\n    rows = db.query(\"orders\")\n    return BillingService().render(rows)\n",
    );
    write(
        root,
        "shop/services/billing.py",
        "from shop.repositories.orders import OrderRepository\n\nclass BillingService:\n    def __init__(self, repo: OrderRepository):\n        self.repo = repo\n    def render(self, rows):\n        return rows\n",
    );
    write(
        root,
        "shop/repositories/orders.py",
        "class OrderRepository:\n    def get(self, id):\n        return id\n    def save(self, order):\n        pass\n    def delete(self, order):\n        pass\n",
    );
    write(root, "shop/__init__.py", "");
    write(root, "node_modules/left-pad/index.js", "module.exports = () => 1;\n");
    dir
}

#[test]
fn test_assess_project_directory() {
    let dir = sample_project();
    let report = assess_path(dir.path(), AssessOptions::default()).unwrap();

    assert!(!report.project_name.is_empty());
    assert_eq!(report.metrics.files_analyzed, 4);
    assert!(report.parse_errors.is_empty());

    let layer: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "LAYER-001")
        .collect();
    assert_eq!(layer.len(), 1);
    assert_eq!(layer[0].file_path, PathBuf::from("shop/views/orders.py"));
    assert_eq!(layer[0].line, Some(4));

    assert!(
        report
            .patterns
            .iter()
            .any(|p| p.subject == "OrderRepository")
    );
    assert_eq!(report.metrics.coupling.edge_count, 2);
}

#[test]
fn test_invalid_path() {
    let result = assess_path(Path::new("/nonexistent/path"), AssessOptions::default());
    match result {
        Err(AuditError::PathNotFound(_)) => {}
        Err(e) => panic!("Expected PathNotFound error, got: {:?}", e),
        Ok(_) => panic!("Expected error for invalid path"),
    }
}

#[test]
fn test_config_error_is_fatal() {
    let dir = sample_project();
    write(dir.path(), ".archaudit.toml", "[thresholds]\nlcom_threshold = 0\n");

    let result = assess_path(dir.path(), AssessOptions::default());
    assert!(matches!(result, Err(AuditError::Config(_))));
}

#[test]
fn test_config_thresholds_apply() {
    let dir = sample_project();
    write(
        dir.path(),
        ".archaudit.toml",
        "[thresholds]\nmax_method_count = 1\n",
    );

    let report = assess_path(dir.path(), AssessOptions::default()).unwrap();
    assert!(report.violations.iter().any(|v| v.rule_id == "SRP-002"));
}

#[test]
fn test_cache_is_written_and_reused() {
    let dir = sample_project();
    let options = AssessOptions {
        use_cache: true,
        ..Default::default()
    };

    let first = assess_path(dir.path(), options.clone()).unwrap();
    assert!(dir.path().join(CACHE_FILE).exists());

    let second = assess_path(dir.path(), options).unwrap();
    assert_eq!(first.violations, second.violations);
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn test_drift_check() {
    let dir = sample_project();
    write(
        dir.path(),
        "docs/patterns.toml",
        "expected = [\"repository\", \"factory\"]\n",
    );
    let options = AssessOptions {
        expected_patterns: Some(PathBuf::from("docs/patterns.toml")),
        ..Default::default()
    };

    let report = assess_path(dir.path(), options).unwrap();
    let drift: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule_id == "PAT-009")
        .collect();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].details["pattern"], "Factory");
}

#[test]
fn test_missing_drift_document_is_skipped() {
    let dir = sample_project();
    let options = AssessOptions {
        expected_patterns: Some(PathBuf::from("docs/missing.toml")),
        ..Default::default()
    };

    let report = assess_path(dir.path(), options).unwrap();
    assert!(report.violations.iter().all(|v| v.rule_id != "PAT-009"));
}

#[test]
fn test_self_loop_policy_override() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/index.ts", "import { x } from './index';\nexport const x = 1;\n");

    let suppressed = assess_path(dir.path(), AssessOptions::default()).unwrap();
    assert!(suppressed.violations.iter().all(|v| v.rule_id != "COUP-001"));

    let reported = assess_path(
        dir.path(),
        AssessOptions {
            self_loops: Some(SelfLoopPolicy::Report),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(
        reported
            .violations
            .iter()
            .filter(|v| v.rule_id == "COUP-001")
            .count(),
        1
    );
}
