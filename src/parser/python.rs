use crate::define_parser;
use crate::model::{
    ClassDefinition, ConditionalChain, FunctionDefinition, GlobalWrite, ImportKind,
    ImportStatement, Instantiation, Language, NumericLiteral, ParseResult,
};
use crate::parser::common::{
    check_syntax, compact, end_line, importer_dir, is_constant_name, node_text, normalize_path,
    start_line, unquote,
};
use crate::parser::{LanguageParser, ParseError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

define_parser!(PYTHON_PARSER, tree_sitter_python::LANGUAGE);

pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Self {
        Self
    }

    /// In Python, names starting with _ are considered private
    fn is_public(name: &str) -> bool {
        !name.starts_with('_') || (name.starts_with("__") && name.ends_with("__"))
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &[&str] {
        &["py", "pyi"]
    }

    fn parse_source(&self, path: &Path, source: &str) -> Result<ParseResult, ParseError> {
        let tree = PYTHON_PARSER
            .with(|parser| parser.borrow_mut().parse(source, None))
            .ok_or_else(|| ParseError::Grammar("python parser produced no tree".to_string()))?;

        let root = tree.root_node();
        check_syntax(&root)?;

        let mut walker = Walker::new(path, source);
        walker.visit(root, &Scope::default());
        walker.result.line_count = source.lines().count();
        Ok(walker.result)
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
struct Scope {
    function: Option<String>,
    in_class_body: bool,
    in_constant: bool,
}

struct Walker<'s> {
    source: &'s str,
    path: &'s Path,
    result: ParseResult,
    class_stack: Vec<ClassDefinition>,
}

impl<'s> Walker<'s> {
    fn new(path: &'s Path, source: &'s str) -> Self {
        Self {
            source,
            path,
            result: ParseResult::new(path.to_path_buf(), Language::Python),
            class_stack: Vec::new(),
        }
    }

    fn text(&self, node: &Node) -> &'s str {
        node_text(node, self.source)
    }

    fn visit_children(&mut self, node: Node, scope: &Scope) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, scope);
        }
    }

    fn visit(&mut self, node: Node, scope: &Scope) {
        match node.kind() {
            "import_statement" => return self.import_statement(node),
            "import_from_statement" => return self.import_from(node),
            "future_import_statement" | "comment" => return,
            "class_definition" => return self.class_definition(node, scope),
            "function_definition" => return self.function_definition(node, scope, &[]),
            "decorated_definition" => return self.decorated_definition(node, scope),
            "identifier" => {
                self.result.identifiers.insert(self.text(&node).to_string());
                return;
            }
            "integer" | "float" => return self.numeric_literal(node, scope),
            "string" => {
                self.result.raw_string_literals.push(unquote(self.text(&node)));
            }
            "call" => self.call(node),
            "if_statement" => self.if_chain(node),
            "match_statement" => self.match_chain(node),
            "global_statement" => return self.global_statement(node, scope),
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value, scope);
                }
                return;
            }
            "assignment" => {
                if self.constant_assignment(node, scope) {
                    return;
                }
            }
            _ => {}
        }
        self.visit_children(node, scope);
    }

    fn import_statement(&mut self, node: Node) {
        let line = start_line(&node);
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let (module, binding) = match child.kind() {
                "dotted_name" => {
                    let module = self.text(&child).to_string();
                    let root = module.split('.').next().unwrap_or(&module).to_string();
                    (module, root)
                }
                "aliased_import" => {
                    let module = child
                        .child_by_field_name("name")
                        .map(|n| self.text(&n))
                        .unwrap_or("")
                        .to_string();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|n| self.text(&n))
                        .unwrap_or("")
                        .to_string();
                    (module, alias)
                }
                _ => continue,
            };
            if module.is_empty() {
                continue;
            }
            self.result.imports.push(ImportStatement {
                module_path: module.clone(),
                imported_names: vec![module],
                bindings: vec![binding],
                is_relative: false,
                resolved_base: None,
                kind: ImportKind::Static,
                source_file: self.path.to_path_buf(),
                line,
            });
        }
    }

    fn import_from(&mut self, node: Node) {
        let module_path = node
            .child_by_field_name("module_name")
            .map(|n| self.text(&n))
            .unwrap_or("")
            .to_string();

        let mut imported_names = Vec::new();
        let mut bindings = Vec::new();
        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            match child.kind() {
                "aliased_import" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        imported_names.push(self.text(&name).to_string());
                    }
                    if let Some(alias) = child.child_by_field_name("alias") {
                        bindings.push(self.text(&alias).to_string());
                    }
                }
                _ => {
                    let name = self.text(&child);
                    imported_names.push(name.to_string());
                    bindings.push(name.rsplit('.').next().unwrap_or(name).to_string());
                }
            }
        }

        let mut cursor = node.walk();
        if node
            .children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import")
        {
            imported_names.push("*".to_string());
        }

        let is_relative = module_path.starts_with('.');
        let resolved_base = is_relative.then(|| resolve_relative(self.path, &module_path));

        self.result.imports.push(ImportStatement {
            module_path,
            imported_names,
            bindings,
            is_relative,
            resolved_base,
            kind: ImportKind::Static,
            source_file: self.path.to_path_buf(),
            line: start_line(&node),
        });
    }

    fn decorated_definition(&mut self, node: Node, scope: &Scope) {
        let mut decorators = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "decorator" {
                let text = self.text(&child).trim_start_matches('@').trim();
                let name = text.split('(').next().unwrap_or(text).to_string();
                decorators.push(name);
                // Decorators reference imported names
                self.visit_children(child, scope);
            }
        }

        if let Some(def) = node.child_by_field_name("definition") {
            match def.kind() {
                "function_definition" => self.function_definition(def, scope, &decorators),
                "class_definition" => self.class_definition(def, scope),
                _ => self.visit(def, scope),
            }
        }
    }

    fn function_definition(&mut self, node: Node, scope: &Scope, decorators: &[String]) {
        let name_node = node.child_by_field_name("name");
        let name = name_node
            .map(|n| self.text(&n))
            .unwrap_or("<anonymous>")
            .to_string();
        let is_method = scope.in_class_body && !self.class_stack.is_empty();

        let mut function = FunctionDefinition::new(name.clone(), start_line(&node), end_line(&node));
        function.decorators = decorators.to_vec();
        function.is_static = decorators
            .iter()
            .any(|d| d.ends_with("staticmethod") || d.ends_with("classmethod"));
        function.is_abstract = decorators.iter().any(|d| d.ends_with("abstractmethod"));
        function.is_exported = PythonParser::is_public(&name) && scope.function.is_none();

        if let Some(params) = node.child_by_field_name("parameters") {
            let types = self.parameter_types(params, is_method);
            function.parameter_count = types.len();
            function.parameter_types = types;
        }

        if let Some(body) = node.child_by_field_name("body") {
            function.complexity = 1 + count_branches(body);
            let (is_stub, raises) = self.inspect_body(body);
            function.is_stub = is_stub;
            function.raises_not_implemented = raises;
            self.collect_self_fields(body, &mut function.instance_fields);
        }

        if is_method {
            if let Some(class) = self.class_stack.last_mut() {
                class.push_method(function);
            }
        } else if scope.function.is_none() {
            self.result.functions.push(function);
        }

        let inner = Scope {
            function: Some(name),
            in_class_body: false,
            in_constant: false,
        };
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if Some(child) != name_node {
                self.visit(child, &inner);
            }
        }
    }

    fn parameter_types(&self, params: Node, is_method: bool) -> Vec<Option<String>> {
        let mut types = Vec::new();
        let mut first = true;
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            let (name, ty) = match param.kind() {
                "identifier" => (self.text(&param), None),
                "typed_parameter" => {
                    let mut inner = param.walk();
                    let name = param
                        .named_children(&mut inner)
                        .next()
                        .map(|n| self.text(&n))
                        .unwrap_or("");
                    (name, param.child_by_field_name("type"))
                }
                "default_parameter" | "typed_default_parameter" => (
                    param
                        .child_by_field_name("name")
                        .map(|n| self.text(&n))
                        .unwrap_or(""),
                    param.child_by_field_name("type"),
                ),
                "list_splat_pattern" | "dictionary_splat_pattern" => (self.text(&param), None),
                _ => continue,
            };
            let is_receiver = first && is_method && (name == "self" || name == "cls");
            first = false;
            if is_receiver {
                continue;
            }
            types.push(ty.map(|t| compact(self.text(&t))));
        }
        types
    }

    /// (is_stub, raises_not_implemented) for a function body.
    fn inspect_body(&self, body: Node) -> (bool, bool) {
        let mut cursor = body.walk();
        let mut statements: Vec<Node> = body
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();

        if statements.first().is_some_and(|s| is_docstring(s)) {
            statements.remove(0);
        }

        let is_stub = statements.iter().all(|s| match s.kind() {
            "pass_statement" => true,
            "expression_statement" => {
                let mut c = s.walk();
                let only: Vec<_> = s.named_children(&mut c).collect();
                only.len() == 1 && only[0].kind() == "ellipsis"
            }
            _ => false,
        });

        let raises = statements.first().is_some_and(|s| {
            if s.kind() != "raise_statement" {
                return false;
            }
            let mut c = s.walk();
            let raised = s.named_children(&mut c).next();
            raised.is_some_and(|r| {
                let target = match r.kind() {
                    "call" => r.child_by_field_name("function").unwrap_or(r),
                    _ => r,
                };
                let name = self.text(&target);
                name.ends_with("NotImplementedError") || name == "NotImplemented"
            })
        });

        (is_stub, raises)
    }

    fn collect_self_fields(&self, node: Node, fields: &mut BTreeSet<String>) {
        if node.kind() == "attribute" {
            if let (Some(object), Some(attr)) = (
                node.child_by_field_name("object"),
                node.child_by_field_name("attribute"),
            ) {
                if object.kind() == "identifier" && self.text(&object) == "self" {
                    fields.insert(self.text(&attr).to_string());
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_self_fields(child, fields);
        }
    }

    fn class_definition(&mut self, node: Node, scope: &Scope) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(&n))
            .unwrap_or("<anonymous>")
            .to_string();

        let mut class = ClassDefinition::new(name.clone(), start_line(&node), end_line(&node));
        class.is_exported = PythonParser::is_public(&name) && scope.function.is_none();

        let superclasses = node.child_by_field_name("superclasses");
        if let Some(supers) = superclasses {
            let mut cursor = supers.walk();
            for base in supers.named_children(&mut cursor) {
                if base.kind() != "comment" {
                    class.bases.push(compact(self.text(&base)));
                }
            }
        }
        class.is_interface = class.bases.iter().any(|b| {
            matches!(b.as_str(), "ABC" | "abc.ABC" | "Protocol" | "typing.Protocol")
                || b.contains("ABCMeta")
                || b.starts_with("Protocol[")
        });

        self.class_stack.push(class);

        if let Some(supers) = superclasses {
            self.visit_children(supers, scope);
        }
        if let Some(body) = node.child_by_field_name("body") {
            let class_scope = Scope {
                function: scope.function.clone(),
                in_class_body: true,
                in_constant: false,
            };
            self.visit_children(body, &class_scope);
        }

        if let Some(mut class) = self.class_stack.pop() {
            if class.methods.iter().any(|m| m.is_abstract) {
                class.is_interface = true;
            }
            self.result.classes.push(class);
        }
    }

    fn constant_assignment(&mut self, node: Node, scope: &Scope) -> bool {
        if scope.function.is_some() {
            return false;
        }
        let Some(left) = node.child_by_field_name("left") else {
            return false;
        };
        if left.kind() != "identifier" || !is_constant_name(self.text(&left)) {
            return false;
        }
        let const_scope = Scope {
            in_constant: true,
            ..scope.clone()
        };
        if let Some(ty) = node.child_by_field_name("type") {
            self.visit(ty, scope);
        }
        if let Some(right) = node.child_by_field_name("right") {
            self.visit(right, &const_scope);
        }
        true
    }

    fn numeric_literal(&mut self, node: Node, scope: &Scope) {
        let text = self.text(&node);
        let negative = node.parent().is_some_and(|p| {
            p.kind() == "unary_operator"
                && p.child_by_field_name("operator")
                    .is_some_and(|op| self.text(&op) == "-")
        });
        let value = if negative {
            format!("-{}", text)
        } else {
            text.to_string()
        };
        self.result.numeric_literals.push(NumericLiteral {
            value,
            line: start_line(&node),
            in_constant: scope.in_constant,
        });
    }

    fn call(&mut self, node: Node) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let name = match function.kind() {
            "identifier" => self.text(&function),
            "attribute" => function
                .child_by_field_name("attribute")
                .map(|a| self.text(&a))
                .unwrap_or(""),
            _ => return,
        };
        if !looks_like_class(name) {
            return;
        }
        let argument_count = node
            .child_by_field_name("arguments")
            .map(|args| {
                let mut cursor = args.walk();
                args.named_children(&mut cursor)
                    .filter(|a| a.kind() != "comment")
                    .count()
            })
            .unwrap_or(0);
        self.result.instantiations.push(Instantiation {
            class_name: name.to_string(),
            line: start_line(&node),
            argument_count,
        });
    }

    fn if_chain(&mut self, node: Node) {
        let mut conditions = Vec::new();
        if let Some(cond) = node.child_by_field_name("condition") {
            conditions.push(cond);
        }
        let mut cursor = node.walk();
        for alt in node.children_by_field_name("alternative", &mut cursor) {
            if alt.kind() == "elif_clause" {
                if let Some(cond) = alt.child_by_field_name("condition") {
                    conditions.push(cond);
                }
            }
        }
        if conditions.len() < 2 {
            return;
        }

        let tests: Vec<BranchTest> = conditions.iter().map(|c| self.branch_test(*c)).collect();
        self.result
            .conditional_chains
            .push(summarize_chain(start_line(&node), &tests));
    }

    fn branch_test(&self, condition: Node) -> BranchTest {
        let condition = unwrap_parens(condition);
        match condition.kind() {
            "comparison_operator" => {
                let mut cursor = condition.walk();
                let children: Vec<Node> = condition.children(&mut cursor).collect();
                let is_equality = children
                    .iter()
                    .any(|c| matches!(c.kind(), "==" | "is"));
                let operands: Vec<&Node> = children.iter().filter(|c| c.is_named()).collect();
                if !is_equality || operands.len() != 2 {
                    return BranchTest::default();
                }
                let left = compact(self.text(operands[0]));
                BranchTest {
                    uses_type_check: left.starts_with("type("),
                    compares_literal: operands[1].kind() == "string",
                    discriminant: Some(left),
                }
            }
            "call" => {
                let function = condition
                    .child_by_field_name("function")
                    .map(|f| self.text(&f))
                    .unwrap_or("");
                if function != "isinstance" {
                    return BranchTest::default();
                }
                let subject = condition.child_by_field_name("arguments").and_then(|args| {
                    let mut cursor = args.walk();
                    args.named_children(&mut cursor)
                        .next()
                        .map(|a| compact(self.text(&a)))
                });
                BranchTest {
                    discriminant: subject,
                    uses_type_check: true,
                    compares_literal: false,
                }
            }
            _ => BranchTest::default(),
        }
    }

    fn match_chain(&mut self, node: Node) {
        let subject = node
            .child_by_field_name("subject")
            .map(|s| compact(self.text(&s)));
        let mut cases = Vec::new();
        collect_case_clauses(node, &mut cases);

        let patterns: Vec<&str> = cases
            .iter()
            .map(|c| self.text(c).split(':').next().unwrap_or("").trim())
            .filter(|p| *p != "case _")
            .collect();
        if patterns.len() < 2 {
            return;
        }

        self.result.conditional_chains.push(ConditionalChain {
            line: start_line(&node),
            branch_count: patterns.len(),
            discriminant: subject,
            uses_type_check: patterns.iter().any(|p| p.contains('(')),
            compares_literals: patterns
                .iter()
                .all(|p| p.contains('"') || p.contains('\'')),
        });
    }

    fn global_statement(&mut self, node: Node, scope: &Scope) {
        let Some(function) = scope.function.clone() else {
            return;
        };
        let mut cursor = node.walk();
        for name in node.named_children(&mut cursor) {
            if name.kind() == "identifier" {
                self.result.global_writes.push(GlobalWrite {
                    name: self.text(&name).to_string(),
                    function: function.clone(),
                    line: start_line(&node),
                });
            }
        }
    }
}

#[derive(Debug, Default)]
struct BranchTest {
    discriminant: Option<String>,
    uses_type_check: bool,
    compares_literal: bool,
}

fn summarize_chain(line: usize, tests: &[BranchTest]) -> ConditionalChain {
    let first = tests.first().and_then(|t| t.discriminant.clone());
    let shared = first.filter(|d| {
        tests
            .iter()
            .all(|t| t.discriminant.as_deref() == Some(d.as_str()))
    });
    ConditionalChain {
        line,
        branch_count: tests.len(),
        uses_type_check: shared.is_some() && tests.iter().any(|t| t.uses_type_check),
        compares_literals: tests.iter().all(|t| t.compares_literal),
        discriminant: shared,
    }
}

fn unwrap_parens(node: Node) -> Node {
    if node.kind() == "parenthesized_expression" {
        let mut cursor = node.walk();
        let inner = node.named_children(&mut cursor).next();
        if let Some(inner) = inner {
            return unwrap_parens(inner);
        }
    }
    node
}

fn collect_case_clauses<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "case_clause" => out.push(child),
            "block" => collect_case_clauses(child, out),
            _ => {}
        }
    }
}

fn is_docstring(statement: &Node) -> bool {
    if statement.kind() != "expression_statement" {
        return false;
    }
    let mut cursor = statement.walk();
    let children: Vec<_> = statement.named_children(&mut cursor).collect();
    children.len() == 1 && children[0].kind() == "string"
}

/// Branching constructs in a body, not descending into nested definitions.
fn count_branches(node: Node) -> usize {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .map(|c| match c.kind() {
            "function_definition" | "class_definition" => 0,
            "if_statement" | "elif_clause" | "for_statement" | "while_statement"
            | "boolean_operator" | "case_clause" => 1 + count_branches(c),
            _ => count_branches(c),
        })
        .sum()
}

fn looks_like_class(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) && !is_constant_name(name)
}

/// `from ..models import x` in `app/views/user.py` -> `app/models`.
fn resolve_relative(importer: &Path, module_path: &str) -> PathBuf {
    let level = module_path.chars().take_while(|c| *c == '.').count();
    let rest = &module_path[level..];
    let mut base = importer_dir(importer);
    for _ in 1..level {
        base.push("..");
    }
    if !rest.is_empty() {
        base.push(rest.replace('.', "/"));
    }
    normalize_path(&base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, source: &str) -> ParseResult {
        PythonParser::new()
            .parse_source(Path::new(path), source)
            .expect("valid python")
    }

    #[test]
    fn test_imports() {
        let result = parse(
            "app/views/user.py",
            "import os\nimport numpy as np\nfrom ..models.user import User, Admin as A\nfrom . import helpers\nfrom django.db import *\n",
        );
        assert_eq!(result.imports.len(), 5);

        let np = &result.imports[1];
        assert_eq!(np.module_path, "numpy");
        assert_eq!(np.bindings, vec!["np"]);
        assert!(!np.is_relative);

        let models = &result.imports[2];
        assert!(models.is_relative);
        assert_eq!(models.imported_names, vec!["User", "Admin"]);
        assert_eq!(models.bindings, vec!["User", "A"]);
        assert_eq!(models.resolved_base, Some(PathBuf::from("app/models/user")));
        assert_eq!(models.line, 3);

        let helpers = &result.imports[3];
        assert_eq!(helpers.resolved_base, Some(PathBuf::from("app/views")));
        assert_eq!(result.imports[4].imported_names, vec!["*"]);
    }

    #[test]
    fn test_function_visibility() {
        let result = parse(
            "app/util.py",
            "def load():\n    def inner():\n        pass\n    return inner\n\ndef _helper():\n    pass\n",
        );
        let load = result.functions.iter().find(|f| f.name == "load").unwrap();
        let helper = result.functions.iter().find(|f| f.name == "_helper").unwrap();
        assert!(load.is_exported);
        assert!(!helper.is_exported);
    }

    #[test]
    fn test_class_structure() {
        let source = r#"
class UserService(BaseService):
    def __init__(self, repo: UserRepository, mailer):
        self.repo = repo
        self.mailer = mailer

    def register(self, name):
        if name:
            self.repo.add(name)
        return self.repo

    @staticmethod
    def helper(x, y):
        return x and y
"#;
        let result = parse("svc.py", source);
        assert_eq!(result.classes.len(), 1);
        let class = &result.classes[0];
        assert_eq!(class.name, "UserService");
        assert_eq!(class.bases, vec!["BaseService"]);
        assert_eq!(class.method_count, 3);
        assert_eq!(class.start_line, 2);
        assert_eq!(class.end_line, 14);

        let init = &class.methods[0];
        assert_eq!(init.parameter_count, 2);
        assert_eq!(init.parameter_types[0].as_deref(), Some("UserRepository"));
        assert!(init.instance_fields.contains("repo"));

        let register = &class.methods[1];
        assert_eq!(register.complexity, 2);

        let helper = &class.methods[2];
        assert!(helper.is_static);
        assert_eq!(helper.parameter_count, 2);
        assert_eq!(helper.complexity, 2);
        assert!(result.functions.is_empty());
    }

    #[test]
    fn test_stubs_and_not_implemented() {
        let source = r#"
class Penguin(Bird):
    def fly(self):
        """Penguins cannot fly."""
        raise NotImplementedError("no")

    def sing(self):
        pass

    def dance(self):
        ...
"#;
        let result = parse("birds.py", source);
        let methods = &result.classes[0].methods;
        assert!(methods[0].raises_not_implemented);
        assert!(!methods[0].is_stub);
        assert!(methods[1].is_stub);
        assert!(methods[2].is_stub);
    }

    #[test]
    fn test_abstract_class_is_interface() {
        let source = "from abc import ABC, abstractmethod\n\nclass Shape(ABC):\n    @abstractmethod\n    def area(self):\n        raise NotImplementedError\n";
        let result = parse("shape.py", source);
        let class = &result.classes[0];
        assert!(class.is_interface);
        assert!(class.methods[0].is_abstract);
    }

    #[test]
    fn test_type_chain() {
        let source = r#"
def render(shape):
    if shape.kind == "circle":
        return 1
    elif shape.kind == "square":
        return 2
    elif shape.kind == "triangle":
        return 3
    else:
        return 0
"#;
        let result = parse("render.py", source);
        assert_eq!(result.conditional_chains.len(), 1);
        let chain = &result.conditional_chains[0];
        assert_eq!(chain.branch_count, 3);
        assert_eq!(chain.discriminant.as_deref(), Some("shape.kind"));
        assert!(chain.compares_literals);
        assert_eq!(chain.line, 3);
    }

    #[test]
    fn test_isinstance_chain() {
        let source = "def f(x):\n    if isinstance(x, A):\n        pass\n    elif isinstance(x, B):\n        pass\n";
        let chain = &parse("f.py", source).conditional_chains[0];
        assert!(chain.uses_type_check);
        assert_eq!(chain.discriminant.as_deref(), Some("x"));
    }

    #[test]
    fn test_mixed_conditions_have_no_discriminant() {
        let source = "def f(a, b):\n    if a == 1:\n        pass\n    elif b == 2:\n        pass\n";
        let chain = &parse("f.py", source).conditional_chains[0];
        assert_eq!(chain.discriminant, None);
    }

    #[test]
    fn test_numeric_literals_and_constants() {
        let source = "TIMEOUT = 30\n\ndef wait():\n    sleep(30)\n    retry(-1, 0, 42)\n";
        let result = parse("wait.py", source);
        let values: Vec<(&str, bool)> = result
            .numeric_literals
            .iter()
            .map(|n| (n.value.as_str(), n.in_constant))
            .collect();
        assert_eq!(
            values,
            vec![("30", true), ("30", false), ("-1", false), ("0", false), ("42", false)]
        );
    }

    #[test]
    fn test_instantiations_and_identifiers() {
        let source = "import json\nimport os\n\nuser = models.User(1, 2, 3, 4, 5)\nprint(json.dumps(user))\n";
        let result = parse("x.py", source);
        assert_eq!(result.instantiations.len(), 1);
        assert_eq!(result.instantiations[0].class_name, "User");
        assert_eq!(result.instantiations[0].argument_count, 5);
        assert!(result.identifiers.contains("json"));
        assert!(!result.identifiers.contains("os"));
    }

    #[test]
    fn test_global_writes() {
        let source = "_instance = None\n\ndef get():\n    global _instance\n    _instance = 1\n\ndef reset():\n    global _instance\n    _instance = None\n";
        let result = parse("single.py", source);
        let functions: Vec<_> = result.global_writes.iter().map(|g| g.function.as_str()).collect();
        assert_eq!(functions, vec!["get", "reset"]);
    }

    #[test]
    fn test_syntax_error() {
        let err = PythonParser::new()
            .parse_source(Path::new("bad.py"), "def f(:\n  return 1\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }
}
