use crate::analysis::solid::is_type_like_chain;
use crate::analysis::{AnalysisContext, Analyzer, AnalyzerError};
use crate::config::Config;
use crate::model::{
    Category, ClassDefinition, FunctionDefinition, ImportKind, ParsedFile, PatternFinding,
    PatternKind, Severity, Violation,
};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const MAX_EXAMPLE_LINES: usize = 5;

const READ_VERBS: &[&str] = &["get", "find", "fetch", "list", "all", "read", "load", "query"];
const WRITE_VERBS: &[&str] = &[
    "add", "create", "save", "insert", "update", "delete", "remove", "store", "put",
];
const ABSTRACTION_SUFFIXES: &[&str] = &[
    "Repository",
    "Repo",
    "Service",
    "Interface",
    "Protocol",
    "Gateway",
    "Port",
    "Provider",
    "Client",
];

pub struct PatternAnalyzer;

impl Analyzer for PatternAnalyzer {
    fn name(&self) -> &'static str {
        "patterns"
    }

    fn analyze(&self, ctx: &AnalysisContext) -> Result<Vec<Violation>, AnalyzerError> {
        let violations = ctx
            .files
            .par_iter()
            .filter(|f| f.ok())
            .flat_map_iter(|file| {
                let mut found = detect_long_methods(file, ctx.config);
                found.extend(detect_complex_methods(file, ctx.config));
                found.extend(detect_god_classes(file, ctx.config));
                found.extend(detect_magic_numbers(file, ctx.config));
                found.extend(detect_unused_imports(file));
                found.extend(detect_factory_opportunities(file, ctx.config));
                found.extend(detect_strategy_opportunities(file, ctx.config));
                found.extend(detect_global_state(file));
                found
            })
            .collect();
        Ok(violations)
    }
}

/// Top-level functions by name, methods as `Class.method`.
fn qualified_functions(file: &ParsedFile) -> Vec<(String, &FunctionDefinition)> {
    let mut out: Vec<(String, &FunctionDefinition)> = file
        .result
        .functions
        .iter()
        .map(|f| (f.name.clone(), f))
        .collect();
    for class in &file.result.classes {
        for method in &class.methods {
            out.push((format!("{}.{}", class.name, method.name), method));
        }
    }
    out
}

pub fn detect_long_methods(file: &ParsedFile, config: &Config) -> Vec<Violation> {
    let limit = config.thresholds.long_method_lines;
    qualified_functions(file)
        .into_iter()
        .filter(|(_, f)| f.length() > limit)
        .map(|(name, f)| {
            Violation::new(
                "PAT-001",
                Category::Pattern,
                Severity::Medium,
                format!("Long method: {}", name),
                file.path(),
            )
            .at_line(f.start_line)
            .describe(format!("`{}` is {} lines long (limit {}).", name, f.length(), limit))
            .recommend("Extract cohesive blocks into well-named helper functions.")
            .detail("function", &name)
            .detail("lines", f.length())
        })
        .collect()
}

pub fn detect_complex_methods(file: &ParsedFile, config: &Config) -> Vec<Violation> {
    let limit = config.thresholds.complex_method_branches;
    qualified_functions(file)
        .into_iter()
        .filter(|(_, f)| f.complexity > limit)
        .map(|(name, f)| {
            Violation::new(
                "PAT-002",
                Category::Pattern,
                Severity::Medium,
                format!("Complex method: {}", name),
                file.path(),
            )
            .at_line(f.start_line)
            .describe(format!(
                "`{}` has cyclomatic complexity {} (limit {}).",
                name, f.complexity, limit
            ))
            .recommend("Flatten nested conditionals with early returns or split the decision logic.")
            .detail("function", &name)
            .detail("complexity", f.complexity)
        })
        .collect()
}

pub fn detect_god_classes(file: &ParsedFile, config: &Config) -> Vec<Violation> {
    let t = &config.thresholds;
    file.result
        .classes
        .iter()
        .filter(|c| c.loc() > t.max_class_loc || c.method_count > t.max_method_count)
        .map(|class| {
            Violation::new(
                "PAT-003",
                Category::Pattern,
                Severity::High,
                format!("God Class: {}", class.name),
                file.path(),
            )
            .at_line(class.start_line)
            .describe(format!(
                "`{}` has {} lines and {} methods.",
                class.name,
                class.loc(),
                class.method_count
            ))
            .recommend("Break the class up; move each responsibility behind its own type.")
            .detail("class", &class.name)
            .detail("loc", class.loc())
            .detail("method_count", class.method_count)
        })
        .collect()
}

/// Aggregated per file: repeated non-trivial literals outside constant declarations.
pub fn detect_magic_numbers(file: &ParsedFile, config: &Config) -> Vec<Violation> {
    let min = config.thresholds.magic_number_min_occurrences;
    let mut by_value: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for literal in &file.result.numeric_literals {
        if literal.in_constant || literal.is_trivial() {
            continue;
        }
        by_value.entry(&literal.value).or_default().push(literal.line);
    }

    let repeated: Vec<(&str, Vec<usize>)> = by_value
        .into_iter()
        .filter(|(_, lines)| lines.len() >= min)
        .collect();
    if repeated.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<usize> = repeated.iter().flat_map(|(_, l)| l.iter().copied()).collect();
    lines.sort_unstable();
    lines.dedup();
    let values: Vec<&str> = repeated.iter().map(|(v, _)| *v).collect();
    let examples: Vec<String> = lines
        .iter()
        .take(MAX_EXAMPLE_LINES)
        .map(|l| l.to_string())
        .collect();

    vec![
        Violation::new(
            "PAT-004",
            Category::Pattern,
            Severity::Low,
            "Magic numbers",
            file.path(),
        )
        .at_line(lines[0])
        .describe(format!(
            "Literal values {} repeat across the file (lines {}).",
            values.join(", "),
            examples.join(", ")
        ))
        .recommend("Name the values as constants so their meaning and changes live in one place.")
        .detail("values", values.join(","))
        .detail("lines", examples.join(",")),
    ]
}

fn is_reexport_hub(file: &ParsedFile) -> bool {
    let name = file
        .path()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    matches!(name, "__init__" | "index")
}

/// Aggregated per file: one violation listing every binding never referenced.
pub fn detect_unused_imports(file: &ParsedFile) -> Vec<Violation> {
    if is_reexport_hub(file) {
        return Vec::new();
    }
    let result = &file.result;

    let mut unused: Vec<(&str, usize)> = Vec::new();
    for import in &result.imports {
        if matches!(import.kind, ImportKind::ReExport | ImportKind::Dynamic)
            || import.module_path == "__future__"
        {
            continue;
        }
        for binding in &import.bindings {
            let referenced = result.identifiers.contains(binding)
                // names exported through `__all__`
                || result.raw_string_literals.iter().any(|s| s == binding);
            if !referenced {
                unused.push((binding.as_str(), import.line));
            }
        }
    }
    if unused.is_empty() {
        return Vec::new();
    }

    let names: Vec<&str> = unused.iter().map(|(n, _)| *n).collect();
    vec![
        Violation::new(
            "PAT-005",
            Category::Pattern,
            Severity::Low,
            "Unused imports",
            file.path(),
        )
        .at_line(unused[0].1)
        .describe(format!("Imported but never used: {}.", names.join(", ")))
        .recommend("Remove the unused imports.")
        .detail("names", names.join(",")),
    ]
}

pub fn detect_factory_opportunities(file: &ParsedFile, config: &Config) -> Vec<Violation> {
    let t = &config.thresholds;
    let mut by_class: BTreeMap<&str, Vec<(usize, usize)>> = BTreeMap::new();
    for inst in &file.result.instantiations {
        by_class
            .entry(&inst.class_name)
            .or_default()
            .push((inst.line, inst.argument_count));
    }

    by_class
        .into_iter()
        .filter(|(_, sites)| {
            sites.len() >= t.factory_min_instantiations
                && sites.iter().all(|(_, args)| *args >= t.factory_min_arguments)
        })
        .map(|(class, sites)| {
            Violation::new(
                "PAT-006",
                Category::Pattern,
                Severity::Low,
                format!("Factory opportunity: {}", class),
                file.path(),
            )
            .at_line(sites[0].0)
            .describe(format!(
                "`{}` is constructed {} times with {}+ arguments each.",
                class,
                sites.len(),
                t.factory_min_arguments
            ))
            .recommend("Centralize construction in a factory function or builder.")
            .detail("class", class)
            .detail("instantiations", sites.len())
        })
        .collect()
}

pub fn detect_strategy_opportunities(file: &ParsedFile, config: &Config) -> Vec<Violation> {
    let threshold = config.thresholds.strategy_branch_threshold;
    file.result
        .conditional_chains
        .iter()
        .filter(|c| c.branch_count >= threshold && is_type_like_chain(c))
        .map(|chain| {
            let subject = chain.discriminant.as_deref().unwrap_or("a type tag");
            Violation::new(
                "PAT-007",
                Category::Pattern,
                Severity::Low,
                format!("Strategy opportunity on {}", subject),
                file.path(),
            )
            .at_line(chain.line)
            .describe(format!(
                "{} branches dispatch on `{}`.",
                chain.branch_count, subject
            ))
            .recommend("Map each variant to a strategy object or handler function.")
            .detail("branches", chain.branch_count)
        })
        .collect()
}

/// Module-level mutable state reassigned from more than one function.
pub fn detect_global_state(file: &ParsedFile) -> Vec<Violation> {
    let mut writers: BTreeMap<&str, (usize, BTreeSet<&str>)> = BTreeMap::new();
    for write in &file.result.global_writes {
        let entry = writers
            .entry(&write.name)
            .or_insert_with(|| (write.line, BTreeSet::new()));
        entry.0 = entry.0.min(write.line);
        entry.1.insert(&write.function);
    }

    writers
        .into_iter()
        .filter(|(_, (_, functions))| functions.len() >= 2)
        .map(|(name, (line, functions))| {
            let functions: Vec<&str> = functions.into_iter().collect();
            Violation::new(
                "PAT-008",
                Category::Pattern,
                Severity::Medium,
                format!("Mutable global: {}", name),
                file.path(),
            )
            .at_line(line)
            .describe(format!(
                "Module state `{}` is reassigned from {}.",
                name,
                functions.join(", ")
            ))
            .recommend("Own the state in an object and pass it to the functions that need it.")
            .detail("name", name)
            .detail("functions", functions.join(","))
        })
        .collect()
}

fn verb_of(method: &str) -> String {
    let lower = method.trim_start_matches('_').to_lowercase();
    lower
        .split(|c: char| c == '_' || c.is_ascii_digit())
        .next()
        .unwrap_or("")
        .to_string()
}

/// Leading lowercase word of a camelCase or snake_case name.
fn leading_word(method: &str) -> String {
    let trimmed = method.trim_start_matches('_');
    let end = trimmed
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_ascii_uppercase() || *c == '_')
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    verb_of(&trimmed[..end])
}

fn recognize_repository(class: &ClassDefinition) -> Option<String> {
    if class.name.ends_with("Repository") || class.name.ends_with("Repo") {
        return Some("named as a repository".to_string());
    }
    let verbs: BTreeSet<String> = class.methods.iter().map(|m| leading_word(&m.name)).collect();
    let reads: Vec<&String> = verbs.iter().filter(|v| READ_VERBS.contains(&v.as_str())).collect();
    let writes: Vec<&String> = verbs.iter().filter(|v| WRITE_VERBS.contains(&v.as_str())).collect();
    (!reads.is_empty() && writes.len() >= 2).then(|| {
        let all: Vec<&str> = reads.iter().chain(writes.iter()).map(|s| s.as_str()).collect();
        format!("CRUD methods: {}", all.join(", "))
    })
}

fn recognize_factory(class: &ClassDefinition) -> Option<String> {
    if class.name.ends_with("Factory") {
        return Some("named as a factory".to_string());
    }
    let creators: Vec<&str> = class
        .methods
        .iter()
        .filter(|m| m.is_static || m.decorators.iter().any(|d| d == "classmethod"))
        .filter(|m| {
            let verb = leading_word(&m.name);
            matches!(verb.as_str(), "create" | "make" | "build" | "from")
        })
        .map(|m| m.name.as_str())
        .collect();
    (!creators.is_empty()).then(|| format!("static creators: {}", creators.join(", ")))
}

fn looks_abstract(type_name: &str, interfaces: &BTreeSet<&str>) -> bool {
    let base = type_name
        .split(['[', '<', '|'])
        .next()
        .unwrap_or(type_name)
        .trim();
    let base = base.rsplit('.').next().unwrap_or(base);
    interfaces.contains(base)
        || ABSTRACTION_SUFFIXES.iter().any(|s| base.ends_with(s))
        || (base.len() > 1
            && base.starts_with('I')
            && base.chars().nth(1).is_some_and(|c| c.is_ascii_uppercase()))
}

/// Informational findings: patterns already present in the codebase.
pub fn recognize_patterns(ctx: &AnalysisContext) -> Vec<PatternFinding> {
    let mut findings = Vec::new();

    let interfaces: BTreeSet<&str> = ctx
        .parsed()
        .flat_map(|f| f.result.classes.iter())
        .filter(|c| c.is_interface)
        .map(|c| c.name.as_str())
        .collect();

    let mut implementers: HashMap<&str, Vec<&str>> = HashMap::new();
    for file in ctx.parsed() {
        for class in &file.result.classes {
            for base in &class.bases {
                let base = base.rsplit('.').next().unwrap_or(base);
                let base = base.split(['<', '[']).next().unwrap_or(base);
                if interfaces.contains(base) {
                    implementers.entry(base).or_default().push(&class.name);
                }
            }
        }
    }

    for file in ctx.parsed() {
        for class in &file.result.classes {
            let finding = |kind: PatternKind, evidence: String| PatternFinding {
                kind,
                file_path: file.path().to_path_buf(),
                line: class.start_line,
                subject: class.name.clone(),
                evidence,
            };

            if let Some(evidence) = recognize_repository(class) {
                findings.push(finding(PatternKind::Repository, evidence));
            }
            if let Some(evidence) = recognize_factory(class) {
                findings.push(finding(PatternKind::Factory, evidence));
            }
            if class.is_interface {
                if let Some(impls) = implementers.get(class.name.as_str()) {
                    if impls.len() >= 2 {
                        let mut impls = impls.clone();
                        impls.sort_unstable();
                        impls.dedup();
                        findings.push(finding(
                            PatternKind::Strategy,
                            format!("implemented by {}", impls.join(", ")),
                        ));
                    }
                }
            }
            if let Some(ctor) = class.constructor() {
                let injected: Vec<&str> = ctor
                    .parameter_types
                    .iter()
                    .flatten()
                    .filter(|t| looks_abstract(t, &interfaces))
                    .map(String::as_str)
                    .collect();
                if !injected.is_empty() {
                    findings.push(finding(
                        PatternKind::DependencyInjection,
                        format!("constructor receives {}", injected.join(", ")),
                    ));
                }
            }
        }
    }

    findings.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.subject.cmp(&b.subject))
    });
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DependencyGraph;
    use crate::config::SelfLoopPolicy;
    use crate::model::SourceFile;
    use crate::parser::ParserRegistry;

    fn parse(path: &str, source: &str) -> ParsedFile {
        ParserRegistry::new().parse(&SourceFile::from_path(path, source).unwrap())
    }

    #[test]
    fn test_long_and_complex_methods() {
        let mut body = String::from("def process(x):\n");
        for i in 0..12 {
            body.push_str(&format!("    if x == {i}:\n        x += 1\n"));
        }
        for _ in 0..30 {
            body.push_str("    x += 1\n");
        }
        let file = parse("proc.py", &body);
        let config = Config::default();

        let long = detect_long_methods(&file, &config);
        assert_eq!(long.len(), 1);
        assert_eq!(long[0].line, Some(1));

        let complex = detect_complex_methods(&file, &config);
        assert_eq!(complex.len(), 1);
        assert_eq!(complex[0].details["complexity"], "13");
    }

    #[test]
    fn test_magic_numbers_aggregated_per_file() {
        let file = parse(
            "pricing.py",
            "RATE = 42\ndef a(x):\n    return x * 42\ndef b(x):\n    return x + 42 + 1\ndef c(x):\n    return x - 42\n",
        );
        let found = detect_magic_numbers(&file, &Config::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, Some(3));
        assert_eq!(found[0].details["values"], "42");
        assert_eq!(found[0].details["lines"], "3,5,7");
    }

    #[test]
    fn test_unused_imports_listed_together() {
        let file = parse(
            "app.py",
            "import os\nimport sys\nfrom typing import List, Dict\n\ndef f(x: List[int]):\n    return sys.argv\n",
        );
        let found = detect_unused_imports(&file);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].details["names"], "os,Dict");
        assert_eq!(found[0].line, Some(1));
    }

    #[test]
    fn test_init_files_are_not_checked_for_unused_imports() {
        let file = parse("pkg/__init__.py", "from .models import User\n");
        assert!(detect_unused_imports(&file).is_empty());
    }

    #[test]
    fn test_factory_opportunity() {
        let file = parse(
            "build.py",
            "a = Order(1, 2, 3, 4, 5)\nb = Order(1, 2, 3, 4, 5)\nc = Order(1, 2, 3, 4, 5, 6)\nd = Small(1)\n",
        );
        let found = detect_factory_opportunities(&file, &Config::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].details["class"], "Order");
    }

    #[test]
    fn test_global_state_written_from_two_functions() {
        let file = parse(
            "state.py",
            "_conn = None\ndef open_conn():\n    global _conn\n    _conn = 1\ndef close_conn():\n    global _conn\n    _conn = None\n",
        );
        let found = detect_global_state(&file);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].details["functions"], "close_conn,open_conn");
    }

    #[test]
    fn test_recognizes_positive_patterns() {
        let files = vec![
            parse(
                "repo.py",
                "class UserStore:\n    def get(self, id):\n        return self.db\n    def add(self, u):\n        self.db = u\n    def delete(self, id):\n        self.db = None\n",
            ),
            parse(
                "shapes.ts",
                "interface Shape { area(): number; }\nclass Circle implements Shape { area() { return 1; } }\nclass Square implements Shape { area() { return 2; } }\nclass ShapeMaker { static createCircle() { return new Circle(); } }\n",
            ),
            parse(
                "service.py",
                "class OrderService:\n    def __init__(self, repo: OrderRepository, clock):\n        self.repo = repo\n",
            ),
        ];
        let config = Config::default();
        let graph = DependencyGraph::build(&files, SelfLoopPolicy::Suppress);
        let ctx = AnalysisContext {
            files: &files,
            graph: &graph,
            config: &config,
        };
        let kinds: Vec<(PatternKind, String)> = recognize_patterns(&ctx)
            .into_iter()
            .map(|f| (f.kind, f.subject))
            .collect();
        let has = |kind: PatternKind, subject: &str| kinds.contains(&(kind, subject.to_string()));
        assert!(has(PatternKind::Repository, "UserStore"));
        assert!(has(PatternKind::Strategy, "Shape"));
        assert!(has(PatternKind::Factory, "ShapeMaker"));
        assert!(has(PatternKind::DependencyInjection, "OrderService"));
    }

    #[test]
    fn test_leading_word() {
        assert_eq!(leading_word("findById"), "find");
        assert_eq!(leading_word("save_all"), "save");
        assert_eq!(leading_word("_delete"), "delete");
    }
}
