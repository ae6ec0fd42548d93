use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "py" | "pyi" => Some(Language::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::JavaScript => write!(f, "javascript"),
            Language::TypeScript => write!(f, "typescript"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }
}

/// One file handed to the core by discovery.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
    pub content: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, language: Language, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            language,
            content: content.into(),
        }
    }

    /// Build a source file whose language is inferred from its extension.
    pub fn from_path(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Option<Self> {
        let path = path.into();
        let language = Language::from_path(&path)?;
        Some(Self::new(path, language, content))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Static,
    Require,
    Dynamic,
    ReExport,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportStatement {
    /// Module specifier as written (`..models.user`, `./service`, `react`).
    pub module_path: String,
    pub imported_names: Vec<String>,
    /// Local names the statement introduces into the file's scope.
    pub bindings: Vec<String>,
    pub is_relative: bool,
    /// For relative imports: the target joined onto the importer's directory,
    /// lexically normalized, without extension.
    pub resolved_base: Option<PathBuf>,
    pub kind: ImportKind,
    pub source_file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub parameter_count: usize,
    /// Annotation text per parameter, `None` when untyped.
    pub parameter_types: Vec<Option<String>>,
    pub is_exported: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub decorators: Vec<String>,
    /// 1 + if/elif/for/while/and/or/case constructs in the body.
    pub complexity: usize,
    pub is_stub: bool,
    pub raises_not_implemented: bool,
    /// Instance fields (`self.x`, `this.x`) referenced in the body.
    pub instance_fields: BTreeSet<String>,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            name: name.into(),
            start_line,
            end_line,
            complexity: 1,
            ..Default::default()
        }
    }

    pub fn length(&self) -> usize {
        self.end_line.saturating_sub(self.start_line)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "__init__" || self.name == "constructor"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassDefinition {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub bases: Vec<String>,
    pub is_exported: bool,
    /// TS interfaces, abstract classes, ABC/Protocol subclasses.
    pub is_interface: bool,
    pub method_count: usize,
    pub instance_variable_refs_per_method: BTreeMap<String, BTreeSet<String>>,
    pub methods: Vec<FunctionDefinition>,
}

impl ClassDefinition {
    pub fn new(name: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            name: name.into(),
            start_line,
            end_line,
            ..Default::default()
        }
    }

    /// Record a method, keeping `method_count` and the per-method field map in step.
    pub fn push_method(&mut self, method: FunctionDefinition) {
        self.method_count += 1;
        self.instance_variable_refs_per_method
            .insert(method.name.clone(), method.instance_fields.clone());
        self.methods.push(method);
    }

    pub fn loc(&self) -> usize {
        self.end_line.saturating_sub(self.start_line)
    }

    pub fn is_subclass(&self) -> bool {
        self.bases.iter().any(|b| !is_root_base(b))
    }

    pub fn constructor(&self) -> Option<&FunctionDefinition> {
        self.methods.iter().find(|m| m.is_constructor())
    }
}

/// Bases that do not make a class a meaningful subclass.
pub fn is_root_base(base: &str) -> bool {
    matches!(
        base,
        "object" | "ABC" | "abc.ABC" | "Protocol" | "typing.Protocol" | "Generic" | "Exception"
    ) || base.starts_with("metaclass=")
        || base.starts_with("Generic[")
        || base.starts_with("Protocol[")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionalChain {
    pub line: usize,
    pub branch_count: usize,
    /// Expression every branch tests, when they all test the same one.
    pub discriminant: Option<String>,
    /// isinstance / type() / typeof / instanceof tests.
    pub uses_type_check: bool,
    /// Every branch compares against a string literal.
    pub compares_literals: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instantiation {
    pub class_name: String,
    pub line: usize,
    pub argument_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumericLiteral {
    pub value: String,
    pub line: usize,
    pub in_constant: bool,
}

impl NumericLiteral {
    pub fn is_trivial(&self) -> bool {
        match self.value.replace('_', "").parse::<f64>() {
            Ok(v) => v == 0.0 || v == 1.0 || v == -1.0,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalWrite {
    pub name: String,
    pub function: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseResult {
    pub file_path: PathBuf,
    pub language: Language,
    pub line_count: usize,
    pub imports: Vec<ImportStatement>,
    pub classes: Vec<ClassDefinition>,
    pub functions: Vec<FunctionDefinition>,
    pub raw_string_literals: Vec<String>,
    pub conditional_chains: Vec<ConditionalChain>,
    pub instantiations: Vec<Instantiation>,
    pub numeric_literals: Vec<NumericLiteral>,
    pub identifiers: BTreeSet<String>,
    pub global_writes: Vec<GlobalWrite>,
    pub parse_succeeded: bool,
    pub error: Option<String>,
    pub error_line: Option<usize>,
}

impl ParseResult {
    pub fn new(file_path: PathBuf, language: Language) -> Self {
        Self {
            file_path,
            language,
            line_count: 0,
            imports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            raw_string_literals: Vec::new(),
            conditional_chains: Vec::new(),
            instantiations: Vec::new(),
            numeric_literals: Vec::new(),
            identifiers: BTreeSet::new(),
            global_writes: Vec::new(),
            parse_succeeded: true,
            error: None,
            error_line: None,
        }
    }

    pub fn failed(
        file_path: PathBuf,
        language: Language,
        message: impl Into<String>,
        line: Option<usize>,
    ) -> Self {
        let mut result = Self::new(file_path, language);
        result.parse_succeeded = false;
        result.error = Some(message.into());
        result.error_line = line;
        result
    }

    /// Top-level functions followed by every class method.
    pub fn all_functions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.functions
            .iter()
            .chain(self.classes.iter().flat_map(|c| c.methods.iter()))
    }
}

/// A parse result paired with the decoded text it came from.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub result: ParseResult,
    pub text: String,
}

impl ParsedFile {
    pub fn path(&self) -> &Path {
        &self.result.file_path
    }

    pub fn ok(&self) -> bool {
        self.result.parse_succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_path(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("a/b.jsx")), Some(Language::JavaScript));
        assert_eq!(Language::from_path(Path::new("a/b.tsx")), Some(Language::TypeScript));
        assert_eq!(Language::from_path(Path::new("a/b.rs")), None);
    }

    #[test]
    fn test_push_method_tracks_counts() {
        let mut class = ClassDefinition::new("Service", 1, 40);
        let mut method = FunctionDefinition::new("run", 2, 10);
        method.instance_fields.insert("repo".to_string());
        class.push_method(method);
        class.push_method(FunctionDefinition::new("stop", 11, 20));

        assert_eq!(class.method_count, 2);
        assert_eq!(class.instance_variable_refs_per_method.len(), 2);
        assert!(class.instance_variable_refs_per_method["run"].contains("repo"));
    }

    #[test]
    fn test_trivial_numbers() {
        let lit = |v: &str| NumericLiteral {
            value: v.to_string(),
            line: 1,
            in_constant: false,
        };
        assert!(lit("0").is_trivial());
        assert!(lit("-1").is_trivial());
        assert!(lit("1.0").is_trivial());
        assert!(!lit("42").is_trivial());
        assert!(!lit("0x1F").is_trivial());
    }

    #[test]
    fn test_subclass_ignores_root_bases() {
        let mut class = ClassDefinition::new("Repo", 1, 2);
        class.bases = vec!["ABC".to_string()];
        assert!(!class.is_subclass());
        class.bases.push("BaseRepo".to_string());
        assert!(class.is_subclass());
    }
}
