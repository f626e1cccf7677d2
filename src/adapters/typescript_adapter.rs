//! TypeScript/JavaScript Language Adapter
//!
//! One adapter type serves four grammars: TypeScript, TSX, JavaScript and JSX
//! (JSX files parse with the JavaScript grammar, which accepts JSX syntax).
//! Extracts functions, classes, interfaces, type aliases, enums, namespaces,
//! variables, ES imports/re-exports and top-level `require` calls.

use super::body::{walk_declaration, BodySyntax, CallShape, FlowShape, NodeRole};
use super::{
    c_style_comment, collect_nodes, count_arguments, find_child_by_kind, has_token, named_children,
    node_text, node_to_span, normalize_callee, signature_span, span_from_offsets, unquote, LanguageAdapter,
};
use crate::ir::{
    Block, Comment, ControlFlowKind, Declaration, DeclarationKind, ImportKind, ImportLike, LanguageId,
    Parameter, Visibility,
};
use crate::provider::ZoomOptions;
use tree_sitter::{Node, Tree};

/// TypeScript/JavaScript language adapter using Tree-sitter
pub struct TypeScriptAdapter {
    language: tree_sitter::Language,
    language_id: LanguageId,
}

impl TypeScriptAdapter {
    /// Create a new TypeScript adapter
    pub fn new() -> Self {
        Self::typescript()
    }

    pub fn typescript() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            language_id: LanguageId::TypeScript,
        }
    }

    /// Create a new TSX adapter
    pub fn tsx() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TSX.into(),
            language_id: LanguageId::Tsx,
        }
    }

    /// Create a new JavaScript adapter
    pub fn javascript() -> Self {
        Self {
            language: tree_sitter_javascript::LANGUAGE.into(),
            language_id: LanguageId::JavaScript,
        }
    }

    /// Create a new JSX adapter
    pub fn jsx() -> Self {
        Self {
            language: tree_sitter_javascript::LANGUAGE.into(),
            language_id: LanguageId::Jsx,
        }
    }
}

impl Default for TypeScriptAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for TypeScriptAdapter {
    fn language(&self) -> LanguageId {
        self.language_id
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn extract_declarations(&self, tree: &Tree, source: &str) -> Vec<Declaration> {
        let root = tree.root_node();
        let mut declarations: Vec<Declaration> = named_children(&root)
            .iter()
            .flat_map(|child| self.statement_declarations(child, source))
            .collect();
        self.apply_export_lists(&root, source, &mut declarations);
        declarations
    }

    fn extract_imports(&self, tree: &Tree, source: &str) -> Vec<ImportLike> {
        let mut imports = Vec::new();
        for child in named_children(&tree.root_node()) {
            match child.kind() {
                "import_statement" => imports.extend(self.import_statement(&child, source)),
                "export_statement" => imports.extend(self.reexport(&child, source)),
                "lexical_declaration" | "variable_declaration" => {
                    imports.extend(self.require_declarators(&child, source))
                }
                "expression_statement" => imports.extend(self.bare_require(&child, source)),
                _ => {}
            }
        }
        imports
    }

    fn extract_comments(&self, tree: &Tree, source: &str) -> Vec<Comment> {
        collect_nodes(tree, |node| node.kind() == "comment")
            .iter()
            .map(|node| c_style_comment(node_text(node, source), node_to_span(node)))
            .collect()
    }

    fn extract_body(
        &self,
        tree: &Tree,
        source: &str,
        declaration: &Declaration,
        options: &ZoomOptions,
    ) -> Option<Block> {
        walk_declaration(self, tree, source, declaration, options)
    }

    fn extract_visibility(&self, node: &Node, source: &str) -> Visibility {
        if let Some(modifier) = find_child_by_kind(node, "accessibility_modifier") {
            return match node_text(&modifier, source) {
                "private" => Visibility::Private,
                "protected" => Visibility::Protected,
                _ => Visibility::Public,
            };
        }

        if is_member(node.kind()) {
            let hash_private = node
                .child_by_field_name("name")
                .or_else(|| node.child_by_field_name("property"))
                .is_some_and(|name| name.kind() == "private_property_identifier");
            return if hash_private {
                Visibility::Private
            } else {
                Visibility::Public
            };
        }

        let mut current = *node;
        while let Some(parent) = current.parent() {
            match parent.kind() {
                "lexical_declaration" | "variable_declaration" | "variable_declarator" | "expression_statement"
                | "ambient_declaration" => current = parent,
                "export_statement" => return Visibility::Public,
                // A script without imports or exports shares one global scope
                "program" if is_module(&parent) => return Visibility::Private,
                "program" => return Visibility::Unknown,
                _ => return Visibility::Private,
            }
        }
        Visibility::Unknown
    }

    fn is_trivia(&self, kind: &str) -> bool {
        matches!(kind, "empty_statement" | "hash_bang_line")
    }
}

// ============================================================================
// Declarations
// ============================================================================

impl TypeScriptAdapter {
    /// Declarations introduced by one statement
    fn statement_declarations(&self, node: &Node, source: &str) -> Vec<Declaration> {
        match node.kind() {
            "export_statement" => self.export_declarations(node, source),
            "lexical_declaration" | "variable_declaration" => self.variable_declarations(node, source),
            "ambient_declaration" => self.ambient_declarations(node, source),
            "expression_statement" => named_children(node)
                .iter()
                .filter(|child| matches!(child.kind(), "internal_module" | "module"))
                .filter_map(|child| self.declaration(child, source))
                .collect(),
            _ => self.declaration(node, source).into_iter().collect(),
        }
    }

    /// A single named declaration node
    fn declaration(&self, node: &Node, source: &str) -> Option<Declaration> {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                let name = name_of(node, source)?;
                Some(self.callable(name, DeclarationKind::Function, node, node, source))
            }
            "class_declaration" | "abstract_class_declaration" => {
                let name = name_of(node, source)?;
                Some(self.class(name, node, node, source))
            }
            "interface_declaration" => self.interface(node, source),
            "type_alias_declaration" => {
                let name = name_of(node, source)?;
                let mut decl = Declaration::new(name, DeclarationKind::Type, node_to_span(node));
                decl.visibility = self.extract_visibility(node, source);
                Some(decl)
            }
            "enum_declaration" => self.enumeration(node, source),
            "internal_module" => self.namespace(node, DeclarationKind::Namespace, source),
            "module" => self.namespace(node, DeclarationKind::Module, source),
            _ => None,
        }
    }

    /// Function-like declaration; `outer` is the node the declaration's span covers
    fn callable(&self, name: String, kind: DeclarationKind, function: &Node, outer: &Node, source: &str) -> Declaration {
        let mut decl = Declaration::new(name, kind, node_to_span(outer));
        decl.visibility = self.extract_visibility(outer, source);
        decl.parameters = self.parameters(function, source);
        decl.return_type = function
            .child_by_field_name("return_type")
            .map(|t| type_text(&t, source));

        if has_token(function, "async") {
            decl.metadata.insert("async".to_string(), "true".to_string());
        }
        if has_token(function, "*") {
            decl.metadata.insert("generator".to_string(), "true".to_string());
        }

        match function.child_by_field_name("body") {
            Some(body) => {
                decl.body_span = Some(node_to_span(&body));
                decl.signature_span = Some(signature_span(outer, &body, source));
            }
            None => decl.signature_span = Some(node_to_span(outer)),
        }
        decl
    }

    fn class(&self, name: String, node: &Node, outer: &Node, source: &str) -> Declaration {
        let mut decl = Declaration::new(name, DeclarationKind::Class, node_to_span(outer));
        decl.visibility = self.extract_visibility(outer, source);

        if node.kind() == "abstract_class_declaration" {
            decl.metadata.insert("abstract".to_string(), "true".to_string());
        }
        if let Some(heritage) = find_child_by_kind(node, "class_heritage") {
            decl.metadata
                .insert("heritage".to_string(), collapse(node_text(&heritage, source)));
        }
        if let Some(body) = node.child_by_field_name("body") {
            decl.body_span = Some(node_to_span(&body));
            decl.signature_span = Some(signature_span(outer, &body, source));
            decl.children = named_children(&body)
                .iter()
                .filter_map(|member| self.member(member, source))
                .collect();
        }
        decl
    }

    /// Class member or interface member
    fn member(&self, node: &Node, source: &str) -> Option<Declaration> {
        match node.kind() {
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                let name = node_text(&node.child_by_field_name("name")?, source).to_string();
                let mut decl = self.callable(name, DeclarationKind::Method, node, node, source);
                if has_token(node, "static") {
                    decl.metadata.insert("static".to_string(), "true".to_string());
                }
                if has_token(node, "abstract") {
                    decl.metadata.insert("abstract".to_string(), "true".to_string());
                }
                for accessor in ["get", "set"] {
                    if has_token(node, accessor) {
                        decl.metadata.insert("accessor".to_string(), accessor.to_string());
                    }
                }
                Some(decl)
            }
            "public_field_definition" | "field_definition" | "property_signature" => {
                let name_node = node
                    .child_by_field_name("name")
                    .or_else(|| node.child_by_field_name("property"))?;
                let mut decl = Declaration::new(
                    node_text(&name_node, source).to_string(),
                    DeclarationKind::Variable,
                    node_to_span(node),
                );
                decl.visibility = self.extract_visibility(node, source);
                if let Some(t) = node.child_by_field_name("type") {
                    decl.metadata.insert("type".to_string(), type_text(&t, source));
                }
                if has_token(node, "static") {
                    decl.metadata.insert("static".to_string(), "true".to_string());
                }
                Some(decl)
            }
            _ => None,
        }
    }

    fn interface(&self, node: &Node, source: &str) -> Option<Declaration> {
        let name = name_of(node, source)?;
        let mut decl = Declaration::new(name, DeclarationKind::Interface, node_to_span(node));
        decl.visibility = self.extract_visibility(node, source);
        if let Some(body) = node.child_by_field_name("body") {
            decl.body_span = Some(node_to_span(&body));
            decl.signature_span = Some(signature_span(node, &body, source));
            decl.children = named_children(&body)
                .iter()
                .filter_map(|member| self.member(member, source))
                .collect();
        }
        Some(decl)
    }

    fn enumeration(&self, node: &Node, source: &str) -> Option<Declaration> {
        let name = name_of(node, source)?;
        let mut decl = Declaration::new(name, DeclarationKind::Enum, node_to_span(node));
        decl.visibility = self.extract_visibility(node, source);
        if let Some(body) = node.child_by_field_name("body") {
            decl.body_span = Some(node_to_span(&body));
            decl.signature_span = Some(signature_span(node, &body, source));
            decl.children = named_children(&body)
                .iter()
                .filter_map(|member| {
                    let name_node = match member.kind() {
                        "property_identifier" | "string" => *member,
                        "enum_assignment" => member.child_by_field_name("name")?,
                        _ => return None,
                    };
                    let mut variant = Declaration::new(
                        unquote(node_text(&name_node, source)),
                        DeclarationKind::Constant,
                        node_to_span(member),
                    );
                    variant.visibility = Visibility::Public;
                    Some(variant)
                })
                .collect();
        }
        Some(decl)
    }

    /// `namespace X {}` or `module "x" {}`
    fn namespace(&self, node: &Node, kind: DeclarationKind, source: &str) -> Option<Declaration> {
        let name = name_of(node, source)?;
        let mut decl = Declaration::new(name, kind, node_to_span(node));
        decl.visibility = self.extract_visibility(node, source);
        if let Some(body) = node.child_by_field_name("body") {
            decl.body_span = Some(node_to_span(&body));
            decl.signature_span = Some(signature_span(node, &body, source));
            decl.children = named_children(&body)
                .iter()
                .flat_map(|statement| self.statement_declarations(statement, source))
                .collect();
        }
        Some(decl)
    }

    /// `declare ...` forms, including `declare global { ... }`
    fn ambient_declarations(&self, node: &Node, source: &str) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        for child in named_children(node) {
            if child.kind() == "statement_block" {
                let mut global = Declaration::new("global".to_string(), DeclarationKind::Namespace, node_to_span(node));
                global.visibility = Visibility::Public;
                global.body_span = Some(node_to_span(&child));
                global.signature_span = Some(signature_span(node, &child, source));
                global.children = named_children(&child)
                    .iter()
                    .flat_map(|statement| self.statement_declarations(statement, source))
                    .collect();
                declarations.push(global);
            } else {
                declarations.extend(self.statement_declarations(&child, source));
            }
        }
        for decl in &mut declarations {
            decl.metadata.insert("ambient".to_string(), "true".to_string());
        }
        declarations
    }

    /// `const`/`let`/`var` statements; `require` declarators are imports, not declarations
    fn variable_declarations(&self, node: &Node, source: &str) -> Vec<Declaration> {
        let is_const = node.child(0).is_some_and(|keyword| keyword.kind() == "const");
        let declarators: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "variable_declarator")
            .collect();
        let single = declarators.len() == 1;

        declarators
            .iter()
            .filter(|declarator| require_call(declarator, source).is_none())
            .filter_map(|declarator| {
                let name = collapse(node_text(&declarator.child_by_field_name("name")?, source));
                let outer = if single { *node } else { *declarator };
                let value = declarator.child_by_field_name("value");

                let decl = match value.as_ref().map(|v| v.kind()) {
                    Some("arrow_function" | "function_expression" | "function" | "generator_function") => {
                        let function = value?;
                        let mut decl = self.callable(name, DeclarationKind::Function, &function, &outer, source);
                        if function.kind() == "arrow_function" {
                            decl.metadata.insert("arrow".to_string(), "true".to_string());
                        }
                        decl
                    }
                    Some("class") => self.class(name, &value?, &outer, source),
                    _ => {
                        let kind = if is_const {
                            DeclarationKind::Constant
                        } else {
                            DeclarationKind::Variable
                        };
                        let mut decl = Declaration::new(name, kind, node_to_span(&outer));
                        decl.visibility = self.extract_visibility(&outer, source);
                        if let Some(t) = declarator.child_by_field_name("type") {
                            decl.metadata.insert("type".to_string(), type_text(&t, source));
                        }
                        decl
                    }
                };
                Some(decl)
            })
            .collect()
    }

    /// `export <declaration>` and `export default <expression>`
    fn export_declarations(&self, node: &Node, source: &str) -> Vec<Declaration> {
        let span = node_to_span(node);
        let is_default = has_token(node, "default");

        let mut declarations = if let Some(inner) = node.child_by_field_name("declaration") {
            self.statement_declarations(&inner, source)
        } else if let Some(value) = node.child_by_field_name("value") {
            let name = name_of(&value, source).unwrap_or_else(|| "default".to_string());
            match value.kind() {
                "function_expression" | "function" | "arrow_function" | "generator_function" => {
                    vec![self.callable(name, DeclarationKind::Function, &value, &value, source)]
                }
                "class" => vec![self.class(name, &value, &value, source)],
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };

        // A lone declaration is anchored at the `export` keyword
        if let [decl] = declarations.as_mut_slice() {
            if let Some(sig) = decl.signature_span {
                decl.signature_span = Some(span_from_offsets(
                    source,
                    span.start,
                    sig.end,
                    span.start_line,
                    span.start_column,
                ));
            }
            decl.span = span;
        }
        for decl in &mut declarations {
            decl.visibility = Visibility::Public;
            if is_default {
                decl.metadata.insert("default_export".to_string(), "true".to_string());
            }
        }
        declarations
    }

    /// `export { a, b }` and `export default a` make earlier declarations public
    fn apply_export_lists(&self, root: &Node, source: &str, declarations: &mut [Declaration]) {
        for statement in named_children(root) {
            if statement.kind() != "export_statement"
                || statement.child_by_field_name("source").is_some()
                || statement.child_by_field_name("declaration").is_some()
            {
                continue;
            }

            let mut exported: Vec<(String, bool)> = Vec::new();
            if let Some(clause) = find_child_by_kind(&statement, "export_clause") {
                for specifier in named_children(&clause) {
                    if let Some(name) = specifier.child_by_field_name("name") {
                        exported.push((node_text(&name, source).to_string(), false));
                    }
                }
            }
            if let Some(value) = statement.child_by_field_name("value") {
                if value.kind() == "identifier" {
                    exported.push((node_text(&value, source).to_string(), true));
                }
            }

            for (name, is_default) in exported {
                for decl in declarations.iter_mut().filter(|d| d.name == name) {
                    decl.visibility = Visibility::Public;
                    if is_default {
                        decl.metadata.insert("default_export".to_string(), "true".to_string());
                    }
                }
            }
        }
    }

    fn parameters(&self, function: &Node, source: &str) -> Vec<Parameter> {
        if let Some(single) = function.child_by_field_name("parameter") {
            return vec![Parameter {
                name: node_text(&single, source).to_string(),
                type_annotation: None,
                default_value: None,
                span: node_to_span(&single),
            }];
        }
        let Some(list) = function.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(&list)
            .iter()
            .filter(|param| !param.is_extra())
            .filter_map(|param| self.parameter(param, source))
            .collect()
    }

    fn parameter(&self, node: &Node, source: &str) -> Option<Parameter> {
        let text = |n: Node| node_text(&n, source).to_string();
        let (name, type_annotation, default_value) = match node.kind() {
            "required_parameter" | "optional_parameter" => (
                text(node.child_by_field_name("pattern")?),
                node.child_by_field_name("type").map(|t| type_text(&t, source)),
                node.child_by_field_name("value").map(text),
            ),
            "assignment_pattern" => (
                text(node.child_by_field_name("left")?),
                None,
                node.child_by_field_name("right").map(text),
            ),
            "identifier" | "rest_pattern" | "object_pattern" | "array_pattern" => (text(*node), None, None),
            _ => return None,
        };
        Some(Parameter {
            name: collapse(&name),
            type_annotation,
            default_value,
            span: node_to_span(node),
        })
    }
}

// ============================================================================
// Imports
// ============================================================================

impl TypeScriptAdapter {
    fn import_statement(&self, node: &Node, source: &str) -> Option<ImportLike> {
        let span = node_to_span(node);

        // import fs = require("fs")
        if let Some(clause) = find_child_by_kind(node, "import_require_clause") {
            let module = clause.child_by_field_name("source")?;
            let mut import = ImportLike::new(unquote(node_text(&module, source)), ImportKind::Require, span);
            import.alias = find_child_by_kind(&clause, "identifier").map(|id| node_text(&id, source).to_string());
            return Some(import);
        }

        let module = node.child_by_field_name("source")?;
        let mut import = ImportLike::new(unquote(node_text(&module, source)), ImportKind::Import, span);
        import.type_only = has_token(node, "type");

        if let Some(clause) = find_child_by_kind(node, "import_clause") {
            for part in named_children(&clause) {
                match part.kind() {
                    "identifier" => import.alias = Some(node_text(&part, source).to_string()),
                    "namespace_import" => {
                        import.items.push("*".to_string());
                        import.alias =
                            find_child_by_kind(&part, "identifier").map(|id| node_text(&id, source).to_string());
                    }
                    "named_imports" => {
                        for specifier in named_children(&part) {
                            if let Some(name) = specifier.child_by_field_name("name") {
                                import.items.push(node_text(&name, source).to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Some(import)
    }

    /// `export { a } from "x"`, `export * from "x"`, `export * as ns from "x"`
    fn reexport(&self, node: &Node, source: &str) -> Option<ImportLike> {
        let module = node.child_by_field_name("source")?;
        let mut import = ImportLike::new(unquote(node_text(&module, source)), ImportKind::From, node_to_span(node));
        import.type_only = has_token(node, "type");

        if let Some(clause) = find_child_by_kind(node, "export_clause") {
            for specifier in named_children(&clause) {
                if let Some(name) = specifier.child_by_field_name("name") {
                    import.items.push(node_text(&name, source).to_string());
                }
            }
        } else if has_token(node, "*") || find_child_by_kind(node, "namespace_export").is_some() {
            import.items.push("*".to_string());
            import.alias = find_child_by_kind(node, "namespace_export")
                .and_then(|ns| named_children(&ns).into_iter().next())
                .map(|id| unquote(node_text(&id, source)));
        }
        Some(import)
    }

    /// `const x = require("x")` and `const { a, b } = require("x")`
    fn require_declarators(&self, node: &Node, source: &str) -> Vec<ImportLike> {
        let declarators: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "variable_declarator")
            .collect();
        let single = declarators.len() == 1;

        declarators
            .iter()
            .filter_map(|declarator| {
                let module = require_call(declarator, source)?;
                let span = node_to_span(if single { node } else { declarator });
                let mut import = ImportLike::new(module, ImportKind::Require, span);

                let pattern = declarator.child_by_field_name("name")?;
                match pattern.kind() {
                    "identifier" => import.alias = Some(node_text(&pattern, source).to_string()),
                    "object_pattern" => {
                        for property in named_children(&pattern) {
                            let key = match property.kind() {
                                "shorthand_property_identifier_pattern" => Some(property),
                                "pair_pattern" => property.child_by_field_name("key"),
                                _ => None,
                            };
                            if let Some(key) = key {
                                import.items.push(node_text(&key, source).to_string());
                            }
                        }
                    }
                    _ => {}
                }
                Some(import)
            })
            .collect()
    }

    /// `require("x");` as a statement
    fn bare_require(&self, node: &Node, source: &str) -> Option<ImportLike> {
        let call = named_children(node).into_iter().find(|c| c.kind() == "call_expression")?;
        let module = require_source(&call, source)?;
        Some(ImportLike::new(module, ImportKind::Require, node_to_span(node)))
    }
}

// ============================================================================
// Body syntax
// ============================================================================

impl BodySyntax for TypeScriptAdapter {
    fn classify<'t>(&self, node: Node<'t>, source: &str) -> NodeRole<'t> {
        let field = |name: &str| node.child_by_field_name(name);
        match node.kind() {
            "comment" => NodeRole::Comment(c_style_comment(node_text(&node, source), node_to_span(&node))),

            "if_statement" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::If)
                    .condition(field("condition"))
                    .branch(field("consequence"))
                    .continuation(field("alternative")),
            ),
            "else_clause" => {
                let inner = named_children(&node).into_iter().find(|c| !c.is_extra());
                match inner {
                    Some(chained) if chained.kind() == "if_statement" => NodeRole::Flow(
                        FlowShape::new(ControlFlowKind::ElseIf)
                            .condition(chained.child_by_field_name("condition"))
                            .branch(chained.child_by_field_name("consequence"))
                            .continuation(chained.child_by_field_name("alternative")),
                    ),
                    other => NodeRole::Flow(FlowShape::new(ControlFlowKind::Else).branch(other)),
                }
            }
            "for_statement" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::For)
                    .condition(field("condition"))
                    .branch(field("body")),
            ),
            "for_in_statement" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::For)
                    .condition(field("right"))
                    .branch(field("body")),
            ),
            "while_statement" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::While)
                    .condition(field("condition"))
                    .branch(field("body")),
            ),
            "do_statement" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::Loop)
                    .condition(field("condition"))
                    .branch(field("body")),
            ),
            "switch_statement" => {
                let cases = field("body")
                    .map(|body| {
                        named_children(&body)
                            .into_iter()
                            .filter(|c| matches!(c.kind(), "switch_case" | "switch_default"))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                NodeRole::Flow(
                    FlowShape::new(ControlFlowKind::Switch)
                        .condition(field("value"))
                        .branches(cases),
                )
            }
            "try_statement" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::Try)
                    .branch(field("body"))
                    .continuation(field("handler"))
                    .continuation(field("finalizer")),
            ),
            "catch_clause" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::Catch)
                    .condition(field("parameter"))
                    .branch(field("body")),
            ),
            "finally_clause" => NodeRole::Flow(FlowShape::new(ControlFlowKind::Finally).branch(field("body"))),

            "call_expression" => match field("function") {
                Some(function) => NodeRole::Call(CallShape {
                    callee: normalize_callee(node_text(&function, source)),
                    argument_count: field("arguments").map_or(0, |args| {
                        if args.kind() == "arguments" {
                            count_arguments(&args)
                        } else {
                            // tagged template
                            1
                        }
                    }),
                    is_method: function.kind() == "member_expression",
                }),
                None => NodeRole::Opaque,
            },
            "new_expression" => match field("constructor") {
                Some(constructor) => NodeRole::Call(CallShape {
                    callee: normalize_callee(node_text(&constructor, source)),
                    argument_count: field("arguments").map_or(0, |args| count_arguments(&args)),
                    is_method: false,
                }),
                None => NodeRole::Opaque,
            },

            "function_declaration" | "generator_function_declaration" | "class_declaration"
            | "abstract_class_declaration" | "interface_declaration" | "enum_declaration"
            | "type_alias_declaration" => match self.declaration(&node, source) {
                Some(decl) => NodeRole::Declaration(decl),
                None => NodeRole::Opaque,
            },
            "method_definition" | "public_field_definition" | "field_definition" => match self.member(&node, source) {
                Some(decl) => NodeRole::Declaration(decl),
                None => NodeRole::Opaque,
            },

            _ => NodeRole::Opaque,
        }
    }

    fn is_block(&self, kind: &str) -> bool {
        matches!(
            kind,
            "statement_block" | "program" | "class_body" | "switch_case" | "switch_default"
        )
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn is_member(kind: &str) -> bool {
    matches!(
        kind,
        "method_definition"
            | "method_signature"
            | "abstract_method_signature"
            | "public_field_definition"
            | "field_definition"
            | "property_signature"
    )
}

/// A file with any import or export is an ES module
fn is_module(program: &Node) -> bool {
    named_children(program)
        .iter()
        .any(|child| matches!(child.kind(), "import_statement" | "export_statement"))
}

fn name_of(node: &Node, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|name| unquote(node_text(&name, source)))
}

fn type_text(node: &Node, source: &str) -> String {
    collapse(node_text(node, source).trim_start_matches(':'))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Module name of a `require("...")` call expression
fn require_source(call: &Node, source: &str) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "identifier" || node_text(&function, source) != "require" {
        return None;
    }
    let arguments = call.child_by_field_name("arguments")?;
    let first = named_children(&arguments).into_iter().find(|a| !a.is_extra())?;
    (first.kind() == "string").then(|| unquote(node_text(&first, source)))
}

/// Module name when a declarator's value is a `require` call
fn require_call(declarator: &Node, source: &str) -> Option<String> {
    let value = declarator.child_by_field_name("value")?;
    (value.kind() == "call_expression")
        .then(|| require_source(&value, source))
        .flatten()
}
