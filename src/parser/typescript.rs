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
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tree_sitter::Node;

define_parser!(TS_PARSER, tree_sitter_typescript::LANGUAGE_TYPESCRIPT);
define_parser!(TSX_PARSER, tree_sitter_typescript::LANGUAGE_TSX);

pub struct TypeScriptParser;

impl TypeScriptParser {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageParser for TypeScriptParser {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn extensions(&self) -> &[&str] {
        &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"]
    }

    fn parse_source(&self, path: &Path, source: &str) -> Result<ParseResult, ParseError> {
        // Plain TS grammar rejects JSX, so only .ts-family files use it
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let tree = if matches!(ext, "ts" | "mts" | "cts") {
            TS_PARSER.with(|parser| parser.borrow_mut().parse(source, None))
        } else {
            TSX_PARSER.with(|parser| parser.borrow_mut().parse(source, None))
        }
        .ok_or_else(|| ParseError::Grammar("typescript parser produced no tree".to_string()))?;

        let root = tree.root_node();
        check_syntax(&root)?;

        let language = match ext {
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            _ => Language::TypeScript,
        };

        let mut walker = Walker::new(path, source, language);
        walker.module_mutables = module_mutables(root, source);
        walker.visit(root, &Scope::default());
        walker.result.line_count = source.lines().count();
        Ok(walker.result)
    }
}

impl Default for TypeScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
struct Scope {
    function: Option<String>,
    in_constant: bool,
    exported: bool,
}

impl Scope {
    fn inside(name: &str) -> Self {
        Self {
            function: Some(name.to_string()),
            in_constant: false,
            exported: false,
        }
    }

    fn constant(&self) -> Self {
        Self {
            in_constant: true,
            exported: false,
            ..self.clone()
        }
    }

    fn plain(&self) -> Self {
        Self {
            exported: false,
            ..self.clone()
        }
    }
}

struct Walker<'s> {
    source: &'s str,
    path: &'s Path,
    result: ParseResult,
    /// Top-level `let`/`var` names: state a function can reassign.
    module_mutables: HashSet<String>,
}

impl<'s> Walker<'s> {
    fn new(path: &'s Path, source: &'s str, language: Language) -> Self {
        Self {
            source,
            path,
            result: ParseResult::new(path.to_path_buf(), language),
            module_mutables: HashSet::new(),
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
            "comment" => return,
            "import_statement" => return self.import_statement(node),
            "export_statement" => {
                if node.child_by_field_name("source").is_some() {
                    return self.re_export(node);
                }
                let exported = Scope {
                    exported: true,
                    ..scope.clone()
                };
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.visit(child, &exported);
                }
                return;
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                return self.class_declaration(node, scope);
            }
            "interface_declaration" => return self.interface_declaration(node, scope),
            "function_declaration" | "generator_function_declaration" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(&n))
                    .unwrap_or("<anonymous>");
                let mut function = self.function_like(node, name);
                function.is_exported = scope.exported;
                if scope.function.is_none() {
                    self.result.functions.push(function);
                }
                return;
            }
            "lexical_declaration" | "variable_declaration" => {
                return self.declaration(node, scope);
            }
            "enum_declaration" => {
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_children(body, &scope.constant());
                }
                return;
            }
            "identifier" | "type_identifier" | "shorthand_property_identifier" => {
                self.result.identifiers.insert(self.text(&node).to_string());
                return;
            }
            "number" => return self.numeric_literal(node, scope),
            "string" | "template_string" => {
                self.result.raw_string_literals.push(unquote(self.text(&node)));
            }
            "call_expression" => self.call_expression(node),
            "new_expression" => self.new_expression(node),
            "if_statement" => self.if_chain(node),
            "switch_statement" => self.switch_chain(node),
            "assignment_expression" | "augmented_assignment_expression" => {
                let target = node.child_by_field_name("left");
                self.global_write(target, node, scope);
            }
            "update_expression" => {
                let target = node.child_by_field_name("argument");
                self.global_write(target, node, scope);
            }
            _ => {}
        }
        self.visit_children(node, &scope.plain());
    }

    fn push_import(
        &mut self,
        spec: String,
        imported_names: Vec<String>,
        bindings: Vec<String>,
        kind: ImportKind,
        line: usize,
    ) {
        if spec.is_empty() {
            return;
        }
        let is_relative = is_relative_specifier(&spec);
        let resolved_base =
            is_relative.then(|| normalize_path(&importer_dir(self.path).join(&spec)));
        self.result.imports.push(ImportStatement {
            module_path: spec,
            imported_names,
            bindings,
            is_relative,
            resolved_base,
            kind,
            source_file: self.path.to_path_buf(),
            line,
        });
    }

    fn import_statement(&mut self, node: Node) {
        let line = start_line(&node);
        let mut names = Vec::new();
        let mut bindings = Vec::new();

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_clause" => self.import_clause(child, &mut names, &mut bindings),
                "import_require_clause" => {
                    // import fs = require("fs")
                    let spec = child
                        .child_by_field_name("source")
                        .map(|s| unquote(self.text(&s)))
                        .unwrap_or_default();
                    let mut inner = child.walk();
                    let binding: Vec<String> = child
                        .named_children(&mut inner)
                        .filter(|c| c.kind() == "identifier")
                        .map(|c| self.text(&c).to_string())
                        .take(1)
                        .collect();
                    self.push_import(spec, Vec::new(), binding, ImportKind::Require, line);
                    return;
                }
                _ => {}
            }
        }

        let spec = node
            .child_by_field_name("source")
            .map(|s| unquote(self.text(&s)))
            .unwrap_or_default();
        self.push_import(spec, names, bindings, ImportKind::Static, line);
    }

    fn import_clause(&self, clause: Node, names: &mut Vec<String>, bindings: &mut Vec<String>) {
        let mut cursor = clause.walk();
        for part in clause.named_children(&mut cursor) {
            match part.kind() {
                "identifier" => {
                    names.push("default".to_string());
                    bindings.push(self.text(&part).to_string());
                }
                "namespace_import" => {
                    names.push("*".to_string());
                    let mut inner = part.walk();
                    if let Some(alias) = part
                        .named_children(&mut inner)
                        .find(|c| c.kind() == "identifier")
                    {
                        bindings.push(self.text(&alias).to_string());
                    }
                }
                "named_imports" => {
                    let mut inner = part.walk();
                    for spec in part.named_children(&mut inner) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let name = spec
                            .child_by_field_name("name")
                            .map(|n| self.text(&n))
                            .unwrap_or("");
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|n| self.text(&n))
                            .unwrap_or(name);
                        names.push(name.to_string());
                        bindings.push(local.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    fn re_export(&mut self, node: Node) {
        let spec = node
            .child_by_field_name("source")
            .map(|s| unquote(self.text(&s)))
            .unwrap_or_default();
        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "*" | "namespace_export" => names.push("*".to_string()),
                "export_clause" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if let Some(name) = spec.child_by_field_name("name") {
                            names.push(self.text(&name).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        self.push_import(spec, names, Vec::new(), ImportKind::ReExport, start_line(&node));
    }

    fn call_expression(&mut self, node: Node) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let kind = match (function.kind(), self.text(&function)) {
            ("identifier", "require") => ImportKind::Require,
            ("import", _) => ImportKind::Dynamic,
            _ => return,
        };
        let spec = node.child_by_field_name("arguments").and_then(|args| {
            let mut cursor = args.walk();
            args.named_children(&mut cursor)
                .next()
                .filter(|a| a.kind() == "string")
                .map(|a| unquote(self.text(&a)))
        });
        let Some(spec) = spec else {
            return;
        };

        let (names, bindings) = match node.parent() {
            Some(p) if kind == ImportKind::Require && p.kind() == "variable_declarator" => {
                self.declarator_bindings(p)
            }
            _ => (Vec::new(), Vec::new()),
        };
        self.push_import(spec, names, bindings, kind, start_line(&node));
    }

    /// Names bound by `const x = require(..)` / `const { a, b: c } = require(..)`.
    fn declarator_bindings(&self, declarator: Node) -> (Vec<String>, Vec<String>) {
        let Some(name) = declarator.child_by_field_name("name") else {
            return (Vec::new(), Vec::new());
        };
        match name.kind() {
            "identifier" => (Vec::new(), vec![self.text(&name).to_string()]),
            "object_pattern" => {
                let mut names = Vec::new();
                let mut bindings = Vec::new();
                let mut cursor = name.walk();
                for prop in name.named_children(&mut cursor) {
                    match prop.kind() {
                        "shorthand_property_identifier_pattern" => {
                            names.push(self.text(&prop).to_string());
                            bindings.push(self.text(&prop).to_string());
                        }
                        "pair_pattern" => {
                            if let Some(key) = prop.child_by_field_name("key") {
                                names.push(self.text(&key).to_string());
                            }
                            if let Some(value) = prop.child_by_field_name("value") {
                                bindings.push(self.text(&value).to_string());
                            }
                        }
                        _ => {}
                    }
                }
                (names, bindings)
            }
            _ => (Vec::new(), Vec::new()),
        }
    }

    fn declaration(&mut self, node: Node, scope: &Scope) {
        let mut cursor = node.walk();
        let keyword = node
            .children(&mut cursor)
            .next()
            .map(|c| self.text(&c))
            .unwrap_or("");
        let is_const = keyword == "const";

        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let name_node = declarator.child_by_field_name("name");
            let name = name_node.map(|n| self.text(&n)).unwrap_or("<anonymous>");

            if let Some(ty) = declarator.child_by_field_name("type") {
                self.visit(ty, &scope.plain());
            }
            let Some(value) = declarator.child_by_field_name("value") else {
                continue;
            };

            if matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
                let mut function = self.function_like(value, name);
                function.is_exported = scope.exported;
                if scope.function.is_none() {
                    self.result.functions.push(function);
                }
                continue;
            }

            let simple_name = name_node.is_some_and(|n| n.kind() == "identifier");
            if is_const && simple_name && is_constant_name(name) {
                self.visit(value, &scope.constant());
            } else {
                self.visit(value, &scope.plain());
            }
        }
    }

    /// Build a function record from a function-shaped node and walk its body.
    fn function_like(&mut self, node: Node, name: &str) -> FunctionDefinition {
        let mut function = FunctionDefinition::new(name, start_line(&node), end_line(&node));

        if let Some(params) = node.child_by_field_name("parameters") {
            let types = self.parameter_types(params);
            function.parameter_count = types.len();
            function.parameter_types = types;
        } else if node.child_by_field_name("parameter").is_some() {
            // x => ...
            function.parameter_count = 1;
            function.parameter_types = vec![None];
        }

        if let Some(body) = node.child_by_field_name("body") {
            function.complexity = 1 + count_branches(body);
            if body.kind() == "statement_block" {
                let (is_stub, raises) = self.inspect_body(body);
                function.is_stub = is_stub;
                function.raises_not_implemented = raises;
            }
            self.collect_this_fields(body, &mut function.instance_fields);
        }

        let inner = Scope::inside(name);
        let name_node = node.child_by_field_name("name");
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if Some(child) != name_node {
                self.visit(child, &inner);
            }
        }

        function
    }

    fn parameter_types(&self, params: Node) -> Vec<Option<String>> {
        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .filter(|p| {
                matches!(
                    p.kind(),
                    "required_parameter" | "optional_parameter" | "identifier" | "rest_pattern"
                        | "assignment_pattern" | "object_pattern" | "array_pattern"
                )
            })
            .filter(|p| {
                // TS `this` parameter is a type annotation, not an argument
                p.child_by_field_name("pattern")
                    .is_none_or(|pat| self.text(&pat) != "this")
            })
            .map(|p| {
                p.child_by_field_name("type")
                    .map(|t| compact(self.text(&t).trim_start_matches(':').trim()))
            })
            .collect()
    }

    /// Constructor parameter properties: `constructor(private repo: Repo)`.
    fn parameter_properties(&self, params: Node) -> Vec<String> {
        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .filter(|p| {
                let mut inner = p.walk();
                p.children(&mut inner)
                    .any(|c| matches!(c.kind(), "accessibility_modifier" | "readonly"))
            })
            .filter_map(|p| p.child_by_field_name("pattern"))
            .map(|pat| self.text(&pat).to_string())
            .collect()
    }

    fn inspect_body(&self, body: Node) -> (bool, bool) {
        let mut cursor = body.walk();
        let statements: Vec<Node> = body
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();

        let is_stub = statements.is_empty();
        let raises = statements.first().is_some_and(|s| {
            if s.kind() != "throw_statement" {
                return false;
            }
            let thrown = self.text(s).to_lowercase();
            thrown.contains("not implemented")
                || thrown.contains("notimplemented")
                || thrown.contains("not yet implemented")
        });
        (is_stub, raises)
    }

    fn collect_this_fields(&self, node: Node, fields: &mut BTreeSet<String>) {
        if node.kind() == "member_expression" {
            if let (Some(object), Some(property)) = (
                node.child_by_field_name("object"),
                node.child_by_field_name("property"),
            ) {
                if object.kind() == "this" {
                    fields.insert(self.text(&property).trim_start_matches('#').to_string());
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            // Nested classes have their own `this`
            if !matches!(child.kind(), "class" | "class_declaration" | "function_declaration") {
                self.collect_this_fields(child, fields);
            }
        }
    }

    fn class_declaration(&mut self, node: Node, scope: &Scope) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(&n))
            .unwrap_or("<anonymous>")
            .to_string();
        let mut class = ClassDefinition::new(name, start_line(&node), end_line(&node));
        class.is_exported = scope.exported;
        class.is_interface = node.kind() == "abstract_class_declaration";

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "class_heritage" => {
                    self.heritage(child, &mut class.bases);
                    self.visit_children(child, &scope.plain());
                }
                "decorator" => self.visit(child, &scope.plain()),
                _ => {}
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.class_body(body, &mut class, scope);
        }

        if class.methods.iter().any(|m| m.is_abstract) {
            class.is_interface = true;
        }
        self.result.classes.push(class);
    }

    fn heritage(&self, heritage: Node, bases: &mut Vec<String>) {
        let mut cursor = heritage.walk();
        for clause in heritage.named_children(&mut cursor) {
            match clause.kind() {
                "extends_clause" => {
                    let mut inner = clause.walk();
                    for value in clause.children_by_field_name("value", &mut inner) {
                        bases.push(compact(self.text(&value)));
                    }
                }
                "implements_clause" => {
                    let mut inner = clause.walk();
                    for ty in clause.named_children(&mut inner) {
                        bases.push(compact(self.text(&ty)));
                    }
                }
                // JS grammar: `class A extends B` has the expression directly
                _ => bases.push(compact(self.text(&clause))),
            }
        }
    }

    fn class_body(&mut self, body: Node, class: &mut ClassDefinition, scope: &Scope) {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_definition" => {
                    let name = member
                        .child_by_field_name("name")
                        .map(|n| self.text(&n).trim_start_matches('#'))
                        .unwrap_or("<anonymous>")
                        .to_string();
                    let mut method = self.function_like(member, &name);
                    method.is_static = has_token(member, "static");
                    method.is_abstract = has_token(member, "abstract");
                    method.is_exported = !is_private_member(member, self.source);
                    if method.is_constructor() {
                        if let Some(params) = member.child_by_field_name("parameters") {
                            method.instance_fields.extend(self.parameter_properties(params));
                        }
                    }
                    class.push_method(method);
                }
                "abstract_method_signature" | "method_signature" => {
                    let name = member
                        .child_by_field_name("name")
                        .map(|n| self.text(&n))
                        .unwrap_or("<anonymous>");
                    let mut method =
                        FunctionDefinition::new(name, start_line(&member), end_line(&member));
                    if let Some(params) = member.child_by_field_name("parameters") {
                        method.parameter_types = self.parameter_types(params);
                        method.parameter_count = method.parameter_types.len();
                    }
                    method.is_abstract = true;
                    method.is_exported = !is_private_member(member, self.source);
                    class.push_method(method);
                    self.visit_children(member, &scope.plain());
                }
                "public_field_definition" | "field_definition" => {
                    let name_node = member
                        .child_by_field_name("name")
                        .or_else(|| member.child_by_field_name("property"));
                    let name = name_node.map(|n| self.text(&n)).unwrap_or("<anonymous>");
                    let value = member.child_by_field_name("value");
                    match value {
                        Some(v) if matches!(v.kind(), "arrow_function" | "function_expression") => {
                            let mut method = self.function_like(v, name);
                            method.is_static = has_token(member, "static");
                            method.is_exported = !is_private_member(member, self.source);
                            class.push_method(method);
                        }
                        Some(v) => {
                            if let Some(ty) = member.child_by_field_name("type") {
                                self.visit(ty, &scope.plain());
                            }
                            let field_scope = if is_constant_name(name) {
                                scope.constant()
                            } else {
                                scope.plain()
                            };
                            self.visit(v, &field_scope);
                        }
                        None => {
                            if let Some(ty) = member.child_by_field_name("type") {
                                self.visit(ty, &scope.plain());
                            }
                        }
                    }
                }
                _ => self.visit(member, &scope.plain()),
            }
        }
    }

    fn interface_declaration(&mut self, node: Node, scope: &Scope) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(&n))
            .unwrap_or("<anonymous>");
        let mut interface = ClassDefinition::new(name, start_line(&node), end_line(&node));
        interface.is_exported = scope.exported;
        interface.is_interface = true;

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "extends_type_clause" {
                let mut inner = child.walk();
                for ty in child.named_children(&mut inner) {
                    interface.bases.push(compact(self.text(&ty)));
                }
                self.visit_children(child, &scope.plain());
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                let is_method = match member.kind() {
                    "method_signature" => true,
                    "property_signature" => member
                        .child_by_field_name("type")
                        .is_some_and(|t| self.text(&t).contains("=>")),
                    _ => false,
                };
                if is_method {
                    let member_name = member
                        .child_by_field_name("name")
                        .map(|n| self.text(&n))
                        .unwrap_or("<anonymous>");
                    let mut method = FunctionDefinition::new(
                        member_name,
                        start_line(&member),
                        end_line(&member),
                    );
                    if let Some(params) = member.child_by_field_name("parameters") {
                        method.parameter_types = self.parameter_types(params);
                        method.parameter_count = method.parameter_types.len();
                    }
                    method.is_abstract = true;
                    method.is_exported = true;
                    interface.push_method(method);
                }
            }
            self.visit_children(body, &scope.plain());
        }

        self.result.classes.push(interface);
    }

    fn numeric_literal(&mut self, node: Node, scope: &Scope) {
        let text = self.text(&node);
        let negative = node.parent().is_some_and(|p| {
            p.kind() == "unary_expression"
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

    fn new_expression(&mut self, node: Node) {
        let Some(constructor) = node.child_by_field_name("constructor") else {
            return;
        };
        let full = self.text(&constructor);
        let name = full.rsplit('.').next().unwrap_or(full);
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
        // else-if links are counted by the head of the chain
        if node.parent().is_some_and(|p| p.kind() == "else_clause") {
            return;
        }

        let mut tests = Vec::new();
        let mut current = Some(node);
        while let Some(if_node) = current {
            if let Some(cond) = if_node.child_by_field_name("condition") {
                tests.push(self.branch_test(cond));
            }
            current = if_node.child_by_field_name("alternative").and_then(|alt| {
                let mut cursor = alt.walk();
                alt.named_children(&mut cursor)
                    .find(|c| c.kind() == "if_statement")
            });
        }
        if tests.len() < 2 {
            return;
        }
        self.result
            .conditional_chains
            .push(summarize_chain(start_line(&node), &tests));
    }

    fn branch_test(&self, condition: Node) -> BranchTest {
        let condition = unwrap_parens(condition);
        if condition.kind() != "binary_expression" {
            return BranchTest::default();
        }
        let operator = condition
            .child_by_field_name("operator")
            .map(|o| self.text(&o))
            .unwrap_or("");
        let (Some(left), Some(right)) = (
            condition.child_by_field_name("left"),
            condition.child_by_field_name("right"),
        ) else {
            return BranchTest::default();
        };
        match operator {
            "===" | "==" => {
                let left_text = compact(self.text(&left));
                BranchTest {
                    uses_type_check: left_text.starts_with("typeof "),
                    compares_literal: right.kind() == "string",
                    discriminant: Some(left_text),
                }
            }
            "instanceof" => BranchTest {
                discriminant: Some(compact(self.text(&left))),
                uses_type_check: true,
                compares_literal: false,
            },
            _ => BranchTest::default(),
        }
    }

    fn switch_chain(&mut self, node: Node) {
        let discriminant = node
            .child_by_field_name("value")
            .map(|v| compact(self.text(&unwrap_parens(v))));
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        let cases: Vec<Node> = body
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "switch_case")
            .collect();
        if cases.len() < 2 {
            return;
        }
        let compares_literals = cases.iter().all(|c| {
            c.child_by_field_name("value")
                .is_some_and(|v| v.kind() == "string")
        });
        let uses_type_check = discriminant
            .as_deref()
            .is_some_and(|d| d.starts_with("typeof "));
        self.result.conditional_chains.push(ConditionalChain {
            line: start_line(&node),
            branch_count: cases.len(),
            discriminant,
            uses_type_check,
            compares_literals,
        });
    }

    fn global_write(&mut self, target: Option<Node>, node: Node, scope: &Scope) {
        let (Some(target), Some(function)) = (target, scope.function.as_ref()) else {
            return;
        };
        if target.kind() != "identifier" {
            return;
        }
        let name = self.text(&target);
        if self.module_mutables.contains(name) {
            self.result.global_writes.push(GlobalWrite {
                name: name.to_string(),
                function: function.clone(),
                line: start_line(&node),
            });
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

/// Top-level `let` / `var` bindings.
fn module_mutables(root: Node, source: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        let decl = if stmt.kind() == "export_statement" {
            stmt.child_by_field_name("declaration")
        } else {
            Some(stmt)
        };
        let Some(decl) = decl else { continue };
        if !matches!(decl.kind(), "lexical_declaration" | "variable_declaration") {
            continue;
        }
        let mut inner = decl.walk();
        let keyword = decl
            .children(&mut inner)
            .next()
            .map(|k| node_text(&k, source))
            .unwrap_or("");
        if keyword == "const" {
            continue;
        }
        let mut inner = decl.walk();
        for declarator in decl.named_children(&mut inner) {
            if let Some(name) = declarator.child_by_field_name("name") {
                if name.kind() == "identifier" {
                    names.insert(node_text(&name, source).to_string());
                }
            }
        }
    }
    names
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == token)
}

fn is_private_member(member: Node, source: &str) -> bool {
    let mut cursor = member.walk();
    let has_private_modifier = member.children(&mut cursor).any(|c| {
        c.kind() == "accessibility_modifier" && node_text(&c, source) != "public"
    });
    let private_name = member
        .child_by_field_name("name")
        .is_some_and(|n| n.kind() == "private_property_identifier");
    has_private_modifier || private_name
}

/// Branching constructs in a body, not descending into nested declarations.
fn count_branches(node: Node) -> usize {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .map(|c| match c.kind() {
            "function_declaration" | "class_declaration" | "class" => 0,
            "if_statement" | "for_statement" | "for_in_statement" | "while_statement"
            | "do_statement" | "switch_case" => 1 + count_branches(c),
            "binary_expression" => {
                let is_logical = c
                    .child_by_field_name("operator")
                    .is_some_and(|o| matches!(o.kind(), "&&" | "||"));
                usize::from(is_logical) + count_branches(c)
            }
            _ => count_branches(c),
        })
        .sum()
}

fn is_relative_specifier(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(path: &str, source: &str) -> ParseResult {
        TypeScriptParser::new()
            .parse_source(Path::new(path), source)
            .expect("valid source")
    }

    #[test]
    fn test_import_forms() {
        let source = r#"
import React, { useState as useLocal, useEffect } from "react";
import * as utils from "../lib/utils";
import "./styles.css";
import type { User } from './types';
export { helper } from "./helpers";
const fs = require("fs");
const { join, resolve: res } = require("path");
const lazy = () => import("./lazy");
"#;
        let result = parse("src/app/page.tsx", source);
        let specs: Vec<_> = result.imports.iter().map(|i| i.module_path.as_str()).collect();
        assert_eq!(
            specs,
            vec!["react", "../lib/utils", "./styles.css", "./types", "./helpers", "fs", "path", "./lazy"]
        );

        let react = &result.imports[0];
        assert_eq!(react.imported_names, vec!["default", "useState", "useEffect"]);
        assert_eq!(react.bindings, vec!["React", "useLocal", "useEffect"]);
        assert!(!react.is_relative);

        let utils = &result.imports[1];
        assert!(utils.is_relative);
        assert_eq!(utils.bindings, vec!["utils"]);
        assert_eq!(utils.resolved_base, Some(PathBuf::from("src/lib/utils")));

        assert_eq!(result.imports[4].kind, ImportKind::ReExport);
        assert_eq!(result.imports[5].kind, ImportKind::Require);
        assert_eq!(result.imports[6].bindings, vec!["join", "res"]);
        assert_eq!(result.imports[7].kind, ImportKind::Dynamic);
        assert_eq!(result.language, Language::TypeScript);
    }

    #[test]
    fn test_class_and_methods() {
        let source = r#"
export class OrderService extends BaseService implements Service {
  private total = 0;

  constructor(private readonly repo: OrderRepository, logger: Logger) {
    super();
    this.logger = logger;
  }

  place(order) {
    if (order.items.length > 0 && this.repo) {
      this.total += 1;
    }
    return this.repo.save(order);
  }

  static create() {
    return new OrderService(null, null);
  }
}
"#;
        let result = parse("src/services/order.ts", source);
        assert_eq!(result.classes.len(), 1);
        let class = &result.classes[0];
        assert_eq!(class.name, "OrderService");
        assert!(class.is_exported);
        assert_eq!(class.bases, vec!["BaseService", "Service"]);
        assert_eq!(class.method_count, 3);

        let ctor = &class.methods[0];
        assert!(ctor.is_constructor());
        assert_eq!(ctor.parameter_count, 2);
        assert_eq!(ctor.parameter_types[0].as_deref(), Some("OrderRepository"));
        assert!(ctor.instance_fields.contains("repo"));
        assert!(ctor.instance_fields.contains("logger"));

        let place = &class.methods[1];
        assert_eq!(place.complexity, 3);
        assert!(place.instance_fields.contains("total"));

        assert!(class.methods[2].is_static);
        assert_eq!(result.instantiations[0].class_name, "OrderService");
    }

    #[test]
    fn test_interface_methods() {
        let source = "export interface Repo {\n  find(id: string): User;\n  save(u: User): void;\n  name: string;\n  onChange: (u: User) => void;\n}\n";
        let result = parse("repo.ts", source);
        let iface = &result.classes[0];
        assert!(iface.is_interface);
        assert_eq!(iface.method_count, 3);
        assert!(result.identifiers.contains("User"));
    }

    #[test]
    fn test_stub_and_not_implemented() {
        let source = r#"
class Sparrow extends Bird {
  fly() {}
  sing() { /* todo */ }
  swim() { throw new Error("Not implemented"); }
}
"#;
        let result = parse("birds.js", source);
        assert_eq!(result.language, Language::JavaScript);
        let methods = &result.classes[0].methods;
        assert!(methods[0].is_stub);
        assert!(methods[1].is_stub);
        assert!(methods[2].raises_not_implemented);
    }

    #[test]
    fn test_else_if_chain_and_switch() {
        let source = r#"
function area(shape) {
  if (shape.type === "circle") { return 1; }
  else if (shape.type === "square") { return 2; }
  else if (shape.type === "tri") { return 3; }
  switch (shape.kind) {
    case "a": return 1;
    case "b": return 2;
    default: return 0;
  }
}
"#;
        let result = parse("area.js", source);
        assert_eq!(result.conditional_chains.len(), 2);
        let chain = &result.conditional_chains[0];
        assert_eq!(chain.branch_count, 3);
        assert_eq!(chain.discriminant.as_deref(), Some("shape.type"));
        assert!(chain.compares_literals);
        let switch = &result.conditional_chains[1];
        assert_eq!(switch.branch_count, 2);
        assert_eq!(switch.discriminant.as_deref(), Some("shape.kind"));
        // 3 ifs + 2 cases
        assert_eq!(result.functions[0].complexity, 6);
    }

    #[test]
    fn test_arrow_functions_and_constants() {
        let source = "const MAX_ITEMS = 50;\nexport const total = (items) => items.length * 50;\nlet cache = null;\nfunction reset() { cache = null; }\nfunction fill() { cache = {}; }\n";
        let result = parse("util.js", source);
        let names: Vec<_> = result.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["total", "reset", "fill"]);
        assert!(result.functions[0].is_exported);

        let literals: Vec<_> = result
            .numeric_literals
            .iter()
            .map(|n| (n.value.as_str(), n.in_constant))
            .collect();
        assert_eq!(literals, vec![("50", true), ("50", false)]);

        let writers: Vec<_> = result.global_writes.iter().map(|g| g.function.as_str()).collect();
        assert_eq!(writers, vec!["reset", "fill"]);
    }

    #[test]
    fn test_jsx_references_count() {
        let source = "import Button from './Button';\nimport Unused from './Unused';\nexport default function App() { return <Button label=\"x\" />; }\n";
        let result = parse("App.jsx", source);
        assert!(result.identifiers.contains("Button"));
        assert!(!result.identifiers.contains("Unused"));
    }

    #[test]
    fn test_syntax_error() {
        let err = TypeScriptParser::new()
            .parse_source(Path::new("bad.ts"), "function (\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }
}
