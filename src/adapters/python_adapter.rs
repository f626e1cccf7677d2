//! Python Language Adapter
//!
//! Extracts functions, classes, methods, decorated definitions and
//! module-level assignments, plus `import` / `from ... import` statements.
//! Docstrings become the `doc_comment` of their definition; the module
//! docstring is reported as an inner doc comment.

use super::body::{walk_declaration, BodySyntax, CallShape, FlowShape, NodeRole};
use super::{
    clean_docstring, collect_nodes, count_arguments, hash_comment, named_children, node_text, node_to_span,
    normalize_callee, signature_span, LanguageAdapter,
};
use crate::ir::{
    Block, Comment, CommentKind, ControlFlowKind, Declaration, DeclarationKind, ImportKind, ImportLike, LanguageId,
    Parameter, Visibility,
};
use crate::provider::ZoomOptions;
use tree_sitter::{Node, Tree};

/// Python language adapter using Tree-sitter
pub struct PythonAdapter {
    language: tree_sitter::Language,
}

impl PythonAdapter {
    /// Create a new Python adapter
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }
}

impl Default for PythonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> LanguageId {
        LanguageId::Python
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn extract_declarations(&self, tree: &Tree, source: &str) -> Vec<Declaration> {
        named_children(&tree.root_node())
            .iter()
            .filter_map(|child| self.statement(child, source, false))
            .collect()
    }

    fn extract_imports(&self, tree: &Tree, source: &str) -> Vec<ImportLike> {
        let mut imports = Vec::new();
        for child in named_children(&tree.root_node()) {
            match child.kind() {
                "import_statement" => imports.extend(self.import_statement(&child, source)),
                "import_from_statement" | "future_import_statement" => {
                    imports.extend(self.from_import(&child, source))
                }
                _ => {}
            }
        }
        imports
    }

    fn extract_comments(&self, tree: &Tree, source: &str) -> Vec<Comment> {
        let mut comments: Vec<Comment> = collect_nodes(tree, |node| node.kind() == "comment")
            .iter()
            .map(|node| hash_comment(node_text(node, source), node_to_span(node)))
            .collect();

        if let Some(mut docstring) = docstring(&tree.root_node(), source) {
            docstring.inner = true;
            comments.push(docstring);
            comments.sort_by_key(|c| (c.span.start, c.span.end));
        }
        comments
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

    /// Python has no modifiers: `__dunder__` is public, a leading underscore private
    fn extract_visibility(&self, node: &Node, source: &str) -> Visibility {
        let Some(name) = node.child_by_field_name("name") else {
            return Visibility::Unknown;
        };
        name_visibility(node_text(&name, source))
    }
}

// ============================================================================
// Declarations
// ============================================================================

impl PythonAdapter {
    /// Declaration for one statement; `in_class` turns functions into methods
    fn statement(&self, node: &Node, source: &str, in_class: bool) -> Option<Declaration> {
        match node.kind() {
            "function_definition" => Some(self.function(node, node, source, in_class)),
            "class_definition" => Some(self.class(node, node, source)),
            "decorated_definition" => self.decorated(node, source, in_class),
            "expression_statement" => self.assignment(node, source),
            _ => None,
        }
    }

    fn function(&self, node: &Node, outer: &Node, source: &str, in_class: bool) -> Declaration {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string())
            .unwrap_or_default();
        let kind = if in_class {
            DeclarationKind::Method
        } else {
            DeclarationKind::Function
        };

        let mut decl = Declaration::new(name, kind, node_to_span(outer));
        decl.visibility = self.extract_visibility(node, source);
        decl.parameters = self.parameters(node, source);
        decl.return_type = node
            .child_by_field_name("return_type")
            .map(|t| collapse(node_text(&t, source)));

        if node.child(0).is_some_and(|first| first.kind() == "async") {
            decl.metadata.insert("async".to_string(), "true".to_string());
        }
        if let Some(body) = node.child_by_field_name("body") {
            decl.body_span = Some(node_to_span(&body));
            decl.signature_span = Some(signature_span(node, &body, source));
            decl.doc_comment = docstring(&body, source);
        }
        decl
    }

    fn class(&self, node: &Node, outer: &Node, source: &str) -> Declaration {
        let name = node
            .child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string())
            .unwrap_or_default();

        let mut decl = Declaration::new(name, DeclarationKind::Class, node_to_span(outer));
        decl.visibility = self.extract_visibility(node, source);
        if let Some(bases) = node.child_by_field_name("superclasses") {
            decl.metadata
                .insert("bases".to_string(), collapse(node_text(&bases, source)));
        }
        if let Some(body) = node.child_by_field_name("body") {
            decl.body_span = Some(node_to_span(&body));
            decl.signature_span = Some(signature_span(node, &body, source));
            decl.doc_comment = docstring(&body, source);
            decl.children = named_children(&body)
                .iter()
                .filter_map(|member| self.statement(member, source, true))
                .collect();
        }
        decl
    }

    /// `@decorator` stacks; the span covers the decorators
    fn decorated(&self, node: &Node, source: &str, in_class: bool) -> Option<Declaration> {
        let definition = node.child_by_field_name("definition")?;
        let mut decl = match definition.kind() {
            "function_definition" => self.function(&definition, node, source, in_class),
            "class_definition" => self.class(&definition, node, source),
            _ => return None,
        };

        let decorators: Vec<String> = named_children(node)
            .iter()
            .filter(|child| child.kind() == "decorator")
            .map(|d| collapse(node_text(d, source).trim_start_matches('@')))
            .collect();
        if decorators.iter().any(|d| d == "staticmethod") {
            decl.metadata.insert("static".to_string(), "true".to_string());
        }
        decl.metadata.insert("decorators".to_string(), decorators.join(" "));
        Some(decl)
    }

    /// `NAME = value` at module or class level
    fn assignment(&self, node: &Node, source: &str) -> Option<Declaration> {
        let assignment = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "assignment")?;
        let target = assignment.child_by_field_name("left")?;
        if target.kind() != "identifier" {
            return None;
        }

        let name = node_text(&target, source).to_string();
        let kind = if is_constant_name(&name) {
            DeclarationKind::Constant
        } else {
            DeclarationKind::Variable
        };
        let mut decl = Declaration::new(name.clone(), kind, node_to_span(node));
        decl.visibility = name_visibility(&name);
        if let Some(t) = assignment.child_by_field_name("type") {
            decl.metadata.insert("type".to_string(), collapse(node_text(&t, source)));
        }
        Some(decl)
    }

    fn parameters(&self, node: &Node, source: &str) -> Vec<Parameter> {
        let Some(list) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(&list)
            .iter()
            .filter_map(|param| {
                let text = |n: Node| collapse(node_text(&n, source));
                let (name, type_annotation, default_value) = match param.kind() {
                    "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => (text(*param), None, None),
                    "typed_parameter" => (
                        named_children(param).into_iter().next().map(text)?,
                        param.child_by_field_name("type").map(text),
                        None,
                    ),
                    "default_parameter" => (
                        text(param.child_by_field_name("name")?),
                        None,
                        param.child_by_field_name("value").map(text),
                    ),
                    "typed_default_parameter" => (
                        text(param.child_by_field_name("name")?),
                        param.child_by_field_name("type").map(text),
                        param.child_by_field_name("value").map(text),
                    ),
                    _ => return None,
                };
                Some(Parameter {
                    name,
                    type_annotation,
                    default_value,
                    span: node_to_span(param),
                })
            })
            .collect()
    }
}

// ============================================================================
// Imports
// ============================================================================

impl PythonAdapter {
    /// `import a, b.c as d` yields one import per module
    fn import_statement(&self, node: &Node, source: &str) -> Vec<ImportLike> {
        let span = node_to_span(node);
        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        names
            .iter()
            .filter_map(|name| match name.kind() {
                "aliased_import" => {
                    let module = name.child_by_field_name("name")?;
                    let mut import = ImportLike::new(node_text(&module, source).to_string(), ImportKind::Import, span);
                    import.alias = name
                        .child_by_field_name("alias")
                        .map(|alias| node_text(&alias, source).to_string());
                    Some(import)
                }
                _ => Some(ImportLike::new(node_text(name, source).to_string(), ImportKind::Import, span)),
            })
            .collect()
    }

    /// `from x import a, b as c` and `from __future__ import ...`
    fn from_import(&self, node: &Node, source: &str) -> Option<ImportLike> {
        let module = match node.kind() {
            "future_import_statement" => "__future__".to_string(),
            _ => collapse(node_text(&node.child_by_field_name("module_name")?, source)),
        };
        let mut import = ImportLike::new(module, ImportKind::From, node_to_span(node));

        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        let mut aliases = Vec::new();
        for name in &names {
            match name.kind() {
                "aliased_import" => {
                    if let Some(item) = name.child_by_field_name("name") {
                        import.items.push(node_text(&item, source).to_string());
                    }
                    aliases.extend(
                        name.child_by_field_name("alias")
                            .map(|alias| node_text(&alias, source).to_string()),
                    );
                }
                _ => import.items.push(node_text(name, source).to_string()),
            }
        }
        if names.len() == 1 && aliases.len() == 1 {
            import.alias = aliases.pop();
        }
        if named_children(node).iter().any(|c| c.kind() == "wildcard_import") {
            import.items.push("*".to_string());
        }
        Some(import)
    }
}

// ============================================================================
// Body syntax
// ============================================================================

impl BodySyntax for PythonAdapter {
    fn classify<'t>(&self, node: Node<'t>, source: &str) -> NodeRole<'t> {
        let field = |name: &str| node.child_by_field_name(name);
        let alternatives = || {
            let mut cursor = node.walk();
            let found: Vec<Node<'t>> = node.children_by_field_name("alternative", &mut cursor).collect();
            found
        };

        match node.kind() {
            "comment" => NodeRole::Comment(hash_comment(node_text(&node, source), node_to_span(&node))),

            "if_statement" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::If)
                    .condition(field("condition"))
                    .branch(field("consequence"))
                    .continuations(alternatives()),
            ),
            "elif_clause" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::ElseIf)
                    .condition(field("condition"))
                    .branch(field("consequence")),
            ),
            "else_clause" => NodeRole::Flow(FlowShape::new(ControlFlowKind::Else).branch(field("body"))),
            "for_statement" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::For)
                    .condition(field("right"))
                    .branch(field("body"))
                    .continuations(alternatives()),
            ),
            "while_statement" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::While)
                    .condition(field("condition"))
                    .branch(field("body"))
                    .continuations(alternatives()),
            ),
            "try_statement" => {
                let handlers = named_children(&node).into_iter().filter(|c| {
                    matches!(
                        c.kind(),
                        "except_clause" | "except_group_clause" | "else_clause" | "finally_clause"
                    )
                });
                NodeRole::Flow(
                    FlowShape::new(ControlFlowKind::Try)
                        .branch(field("body"))
                        .continuations(handlers),
                )
            }
            "except_clause" | "except_group_clause" => {
                let parts = named_children(&node);
                let condition = parts.iter().find(|c| c.kind() != "block" && !c.is_extra()).copied();
                let body = parts.iter().rev().find(|c| c.kind() == "block").copied();
                NodeRole::Flow(FlowShape::new(ControlFlowKind::Catch).condition(condition).branch(body))
            }
            "finally_clause" => {
                let body = named_children(&node).into_iter().find(|c| c.kind() == "block");
                NodeRole::Flow(FlowShape::new(ControlFlowKind::Finally).branch(body))
            }
            "with_statement" => {
                let clause = named_children(&node).into_iter().find(|c| c.kind() == "with_clause");
                NodeRole::Flow(
                    FlowShape::new(ControlFlowKind::With)
                        .condition(clause)
                        .branch(field("body")),
                )
            }
            "match_statement" => {
                let cases = field("body")
                    .map(|body| {
                        named_children(&body)
                            .into_iter()
                            .filter(|c| c.kind() == "case_clause")
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                NodeRole::Flow(
                    FlowShape::new(ControlFlowKind::Match)
                        .condition(field("subject"))
                        .branches(cases),
                )
            }

            "call" => match field("function") {
                Some(function) => NodeRole::Call(CallShape {
                    callee: normalize_callee(node_text(&function, source)),
                    argument_count: field("arguments").map_or(0, |args| {
                        if args.kind() == "argument_list" {
                            count_arguments(&args)
                        } else {
                            // bare generator argument
                            1
                        }
                    }),
                    is_method: function.kind() == "attribute",
                }),
                None => NodeRole::Opaque,
            },

            "function_definition" | "class_definition" | "decorated_definition" => {
                match self.statement(&node, source, false) {
                    Some(decl) => NodeRole::Declaration(decl),
                    None => NodeRole::Opaque,
                }
            }

            _ => NodeRole::Opaque,
        }
    }

    fn is_block(&self, kind: &str) -> bool {
        matches!(kind, "block" | "module")
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Docstring of a module or body block: a string as its first statement
fn docstring(container: &Node, source: &str) -> Option<Comment> {
    let first = named_children(container)
        .into_iter()
        .find(|child| !child.is_extra())?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let parts = named_children(&first);
    match parts.as_slice() {
        [string] if string.kind() == "string" => Some(Comment::new(
            clean_docstring(node_text(string, source)),
            CommentKind::Doc,
            node_to_span(string),
        )),
        _ => None,
    }
}

fn name_visibility(name: &str) -> Visibility {
    if name.starts_with("__") && name.ends_with("__") && name.len() > 4 {
        Visibility::Public
    } else if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

/// `MAX_SIZE`, `API_V2` style names
fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
