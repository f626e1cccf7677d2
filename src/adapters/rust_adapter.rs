//! Rust Language Adapter
//!
//! Extracts items (functions, structs, enums, unions, traits, impls, type
//! aliases, consts, statics, inline modules, `macro_rules!`), `use` trees,
//! `mod x;` and `extern crate` from Rust source using Tree-sitter.

use super::body::{walk_declaration, BodySyntax, CallShape, FlowShape, NodeRole};
use super::{
    c_style_comment, children, collect_nodes, count_arguments, find_child_by_kind, named_children, node_text,
    node_to_span, normalize_callee, signature_span, span_between, LanguageAdapter,
};
use crate::ir::{
    Block, Comment, ControlFlowKind, Declaration, DeclarationKind, ImportKind, ImportLike, LanguageId, Parameter,
    Visibility,
};
use crate::provider::ZoomOptions;
use tree_sitter::{Node, Tree};

/// Where an item sits; decides method-vs-function and inherited visibility
#[derive(Debug, Clone, Copy)]
enum Scope {
    Module,
    Impl { trait_impl: bool },
    Trait(Visibility),
}

/// Rust language adapter using Tree-sitter
pub struct RustAdapter {
    language: tree_sitter::Language,
}

impl RustAdapter {
    /// Create a new Rust adapter
    pub fn new() -> Self {
        Self {
            language: tree_sitter_rust::LANGUAGE.into(),
        }
    }
}

impl Default for RustAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for RustAdapter {
    fn language(&self) -> LanguageId {
        LanguageId::Rust
    }

    fn grammar(&self) -> tree_sitter::Language {
        self.language.clone()
    }

    fn extract_declarations(&self, tree: &Tree, source: &str) -> Vec<Declaration> {
        self.items(&tree.root_node(), source, Scope::Module)
    }

    fn extract_imports(&self, tree: &Tree, source: &str) -> Vec<ImportLike> {
        let mut imports = Vec::new();
        for child in named_children(&tree.root_node()) {
            match child.kind() {
                "use_declaration" => imports.extend(self.use_declaration(&child, source)),
                "mod_item" if child.child_by_field_name("body").is_none() => {
                    if let Some(name) = child.child_by_field_name("name") {
                        imports.push(ImportLike::new(
                            node_text(&name, source).to_string(),
                            ImportKind::Module,
                            node_to_span(&child),
                        ));
                    }
                }
                "extern_crate_declaration" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        let mut import =
                            ImportLike::new(node_text(&name, source).to_string(), ImportKind::Other, node_to_span(&child));
                        import.alias = child
                            .child_by_field_name("alias")
                            .map(|alias| node_text(&alias, source).to_string());
                        imports.push(import);
                    }
                }
                _ => {}
            }
        }
        imports
    }

    fn extract_comments(&self, tree: &Tree, source: &str) -> Vec<Comment> {
        collect_nodes(tree, |node| matches!(node.kind(), "line_comment" | "block_comment"))
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
        let Some(modifier) = find_child_by_kind(node, "visibility_modifier") else {
            return Visibility::Private;
        };
        let text: String = node_text(&modifier, source).split_whitespace().collect();
        match text.as_str() {
            "pub" => Visibility::Public,
            "pub(self)" => Visibility::Private,
            t if t.contains("crate") && !t.starts_with("pub(in") => Visibility::Internal,
            t if t.starts_with("pub(super") || t.starts_with("pub(in") => Visibility::Protected,
            _ => Visibility::Public,
        }
    }

    fn is_trivia(&self, kind: &str) -> bool {
        matches!(kind, "attribute_item" | "inner_attribute_item" | "empty_statement")
    }
}

// ============================================================================
// Items
// ============================================================================

impl RustAdapter {
    fn items(&self, container: &Node, source: &str, scope: Scope) -> Vec<Declaration> {
        named_children(container)
            .iter()
            .filter_map(|child| self.item(child, source, scope))
            .collect()
    }

    fn item(&self, node: &Node, source: &str, scope: Scope) -> Option<Declaration> {
        let in_module = matches!(scope, Scope::Module);
        let kind = match node.kind() {
            "function_item" | "function_signature_item" if in_module => DeclarationKind::Function,
            "function_item" | "function_signature_item" => DeclarationKind::Method,
            "struct_item" | "union_item" => DeclarationKind::Struct,
            "enum_item" => DeclarationKind::Enum,
            "trait_item" => DeclarationKind::Trait,
            "impl_item" => DeclarationKind::Impl,
            "type_item" | "associated_type" => DeclarationKind::Type,
            "const_item" => DeclarationKind::Constant,
            "static_item" => DeclarationKind::Variable,
            // `mod x;` is an import
            "mod_item" if node.child_by_field_name("body").is_some() => DeclarationKind::Module,
            "macro_definition" => DeclarationKind::Macro,
            _ => return None,
        };

        let name = if kind == DeclarationKind::Impl {
            collapse(node_text(&node.child_by_field_name("type")?, source))
        } else {
            node_text(&node.child_by_field_name("name")?, source).to_string()
        };

        let mut decl = Declaration::new(name, kind, self.item_span(node));
        decl.visibility = match scope {
            _ if kind == DeclarationKind::Impl => Visibility::Unknown,
            Scope::Impl { trait_impl: true } => Visibility::Unknown,
            Scope::Trait(visibility) => visibility,
            _ => self.extract_visibility(node, source),
        };

        let attributes = self.attributes(node, source);
        if !attributes.is_empty() {
            decl.metadata.insert("attributes".to_string(), attributes.join(" "));
        }
        if let Some(trait_name) = node.child_by_field_name("trait").filter(|_| kind == DeclarationKind::Impl) {
            decl.metadata
                .insert("trait".to_string(), collapse(node_text(&trait_name, source)));
        }
        if node.kind() == "union_item" {
            decl.metadata.insert("union".to_string(), "true".to_string());
        }

        if decl.is_callable() {
            decl.parameters = self.parameters(node, source);
            decl.return_type = node
                .child_by_field_name("return_type")
                .map(|t| collapse(node_text(&t, source)));
            if let Some(modifiers) = find_child_by_kind(node, "function_modifiers") {
                for modifier in children(&modifiers) {
                    if matches!(modifier.kind(), "async" | "const" | "unsafe" | "extern_modifier") {
                        let key = modifier.kind().trim_end_matches("_modifier");
                        decl.metadata.insert(key.to_string(), "true".to_string());
                    }
                }
            }
        }

        match node.child_by_field_name("body") {
            Some(body) => {
                decl.body_span = Some(node_to_span(&body));
                decl.signature_span = Some(signature_span(node, &body, source));
                decl.children = self.members(node, &body, &decl, source);
            }
            None if decl.is_callable() => decl.signature_span = Some(node_to_span(node)),
            None => {}
        }

        Some(decl)
    }

    /// Nested declarations inside an item's body
    fn members(&self, item: &Node, body: &Node, decl: &Declaration, source: &str) -> Vec<Declaration> {
        match item.kind() {
            "impl_item" => {
                let trait_impl = item.child_by_field_name("trait").is_some();
                self.items(body, source, Scope::Impl { trait_impl })
            }
            "trait_item" => self.items(body, source, Scope::Trait(decl.visibility)),
            "mod_item" => self.items(body, source, Scope::Module),
            "struct_item" | "union_item" => named_children(body)
                .iter()
                .filter(|field| field.kind() == "field_declaration")
                .filter_map(|field| {
                    let name = field.child_by_field_name("name")?;
                    let mut member =
                        Declaration::new(node_text(&name, source).to_string(), DeclarationKind::Variable, node_to_span(field));
                    member.visibility = self.extract_visibility(field, source);
                    if let Some(t) = field.child_by_field_name("type") {
                        member.metadata.insert("type".to_string(), collapse(node_text(&t, source)));
                    }
                    Some(member)
                })
                .collect(),
            "enum_item" => named_children(body)
                .iter()
                .filter(|variant| variant.kind() == "enum_variant")
                .filter_map(|variant| {
                    let name = variant.child_by_field_name("name")?;
                    let mut member = Declaration::new(
                        node_text(&name, source).to_string(),
                        DeclarationKind::Constant,
                        node_to_span(variant),
                    );
                    member.visibility = decl.visibility;
                    Some(member)
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Item span, widened to cover the attributes in front of it
    fn item_span(&self, node: &Node) -> crate::ir::Span {
        let mut first = *node;
        let mut cursor = node.prev_sibling();
        while let Some(prev) = cursor {
            match prev.kind() {
                "attribute_item" => first = prev,
                "line_comment" | "block_comment" => {}
                _ => break,
            }
            cursor = prev.prev_sibling();
        }
        span_between(&first, node)
    }

    fn attributes(&self, node: &Node, source: &str) -> Vec<String> {
        let mut attributes = Vec::new();
        let mut cursor = node.prev_sibling();
        while let Some(prev) = cursor {
            match prev.kind() {
                "attribute_item" => attributes.push(collapse(node_text(&prev, source))),
                "line_comment" | "block_comment" => {}
                _ => break,
            }
            cursor = prev.prev_sibling();
        }
        attributes.reverse();
        attributes
    }

    fn parameters(&self, node: &Node, source: &str) -> Vec<Parameter> {
        let Some(list) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(&list)
            .iter()
            .filter_map(|param| match param.kind() {
                "self_parameter" => Some(Parameter {
                    name: collapse(node_text(param, source)),
                    type_annotation: None,
                    default_value: None,
                    span: node_to_span(param),
                }),
                "parameter" => Some(Parameter {
                    name: collapse(node_text(&param.child_by_field_name("pattern")?, source)),
                    type_annotation: param
                        .child_by_field_name("type")
                        .map(|t| collapse(node_text(&t, source))),
                    default_value: None,
                    span: node_to_span(param),
                }),
                _ => None,
            })
            .collect()
    }

    fn use_declaration(&self, node: &Node, source: &str) -> Option<ImportLike> {
        let argument = node.child_by_field_name("argument")?;
        let mut import = ImportLike::new(String::new(), ImportKind::Use, node_to_span(node));
        let text = |n: Node| collapse(node_text(&n, source));

        match argument.kind() {
            "use_as_clause" => {
                import.source = text(argument.child_by_field_name("path")?);
                import.alias = argument.child_by_field_name("alias").map(text);
            }
            "scoped_use_list" | "use_list" => {
                import.source = argument.child_by_field_name("path").map(text).unwrap_or_default();
                let list = argument.child_by_field_name("list").unwrap_or(argument);
                import.items = named_children(&list)
                    .into_iter()
                    .filter(|item| !item.is_extra())
                    .map(text)
                    .collect();
            }
            "use_wildcard" => {
                import.source = text(argument).trim_end_matches('*').trim_end_matches("::").to_string();
                import.items.push("*".to_string());
            }
            _ => import.source = text(argument),
        }
        Some(import)
    }
}

// ============================================================================
// Body syntax
// ============================================================================

impl BodySyntax for RustAdapter {
    fn classify<'t>(&self, node: Node<'t>, source: &str) -> NodeRole<'t> {
        let field = |name: &str| node.child_by_field_name(name);
        match node.kind() {
            "line_comment" | "block_comment" => {
                NodeRole::Comment(c_style_comment(node_text(&node, source), node_to_span(&node)))
            }

            "if_expression" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::If)
                    .condition(field("condition"))
                    .branch(field("consequence"))
                    .continuation(field("alternative")),
            ),
            "else_clause" => {
                let inner = named_children(&node).into_iter().find(|c| !c.is_extra());
                match inner {
                    Some(chained) if chained.kind() == "if_expression" => NodeRole::Flow(
                        FlowShape::new(ControlFlowKind::ElseIf)
                            .condition(chained.child_by_field_name("condition"))
                            .branch(chained.child_by_field_name("consequence"))
                            .continuation(chained.child_by_field_name("alternative")),
                    ),
                    other => NodeRole::Flow(FlowShape::new(ControlFlowKind::Else).branch(other)),
                }
            }
            "match_expression" => {
                let arms = field("body")
                    .map(|body| {
                        named_children(&body)
                            .into_iter()
                            .filter(|arm| arm.kind() == "match_arm")
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                NodeRole::Flow(
                    FlowShape::new(ControlFlowKind::Match)
                        .condition(field("value"))
                        .branches(arms),
                )
            }
            "for_expression" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::For)
                    .condition(field("value"))
                    .branch(field("body")),
            ),
            "while_expression" => NodeRole::Flow(
                FlowShape::new(ControlFlowKind::While)
                    .condition(field("condition"))
                    .branch(field("body")),
            ),
            "loop_expression" => NodeRole::Flow(FlowShape::new(ControlFlowKind::Loop).branch(field("body"))),

            "call_expression" => match field("function") {
                Some(function) => NodeRole::Call(CallShape {
                    callee: normalize_callee(node_text(&function, source)),
                    argument_count: field("arguments").map_or(0, |args| count_arguments(&args)),
                    is_method: function.kind() == "field_expression",
                }),
                None => NodeRole::Opaque,
            },
            "macro_invocation" => match field("macro") {
                Some(name) => NodeRole::Call(CallShape {
                    callee: format!("{}!", normalize_callee(node_text(&name, source))),
                    argument_count: find_child_by_kind(&node, "token_tree").map_or(0, |tokens| macro_arguments(&tokens)),
                    is_method: false,
                }),
                None => NodeRole::Opaque,
            },

            "function_item" | "struct_item" | "enum_item" | "union_item" | "trait_item" | "impl_item" | "mod_item"
            | "macro_definition" | "const_item" | "static_item" | "type_item" => {
                match self.item(&node, source, Scope::Module) {
                    Some(decl) => NodeRole::Declaration(decl),
                    None => NodeRole::Opaque,
                }
            }

            _ => NodeRole::Opaque,
        }
    }

    fn is_block(&self, kind: &str) -> bool {
        matches!(kind, "block" | "source_file" | "declaration_list")
    }
}

/// Top-level comma-separated arguments inside a macro's token tree
fn macro_arguments(tokens: &Node) -> usize {
    let inner = children(tokens);
    if inner.len() <= 2 {
        return 0;
    }
    1 + inner[1..inner.len() - 1].iter().filter(|t| t.kind() == ",").count()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
