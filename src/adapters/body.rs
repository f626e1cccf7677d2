//! Zoom-mode body walker
//!
//! Adapters describe their grammar by classifying nodes ([`BodySyntax`]);
//! [`BodyWalker`] turns a body subtree into a [`Block`] tree with the same
//! depth rules for every language:
//!
//! - the body block is depth 0, a control-flow node directly inside is depth 1
//! - `else`, `elif`, `catch`, `finally` continue the construct they belong to
//!   and are emitted as siblings at its depth
//! - a control-flow node deeper than `max_depth` becomes one `Truncated`
//!   unknown spanning the whole node
//! - named inner declarations are recorded, not descended; closures are
//!   transparent

use super::{children, node_for_span, node_to_span};
use crate::ir::{Block, Call, Comment, ControlFlow, ControlFlowKind, Declaration, UnknownKind, UnknownNode};
use crate::provider::ZoomOptions;
use tree_sitter::{Node, Tree};

/// Recursion guard for pathological trees (deeply nested expressions)
pub const MAX_TREE_DEPTH: usize = 512;

/// What a node means inside a body
pub enum NodeRole<'t> {
    /// A control-flow construct
    Flow(FlowShape<'t>),
    /// A call expression; its children are still walked for nested calls
    Call(CallShape),
    /// A comment
    Comment(Comment),
    /// A named inner declaration
    Declaration(Declaration),
    /// Anything else: walk the children
    Opaque,
}

/// The parts of a control-flow node
pub struct FlowShape<'t> {
    pub kind: ControlFlowKind,
    pub condition: Option<Node<'t>>,
    /// Nodes whose contents become the child blocks
    pub branches: Vec<Node<'t>>,
    /// `else` / `catch` / `finally` nodes that continue this construct
    pub continuations: Vec<Node<'t>>,
}

impl<'t> FlowShape<'t> {
    pub fn new(kind: ControlFlowKind) -> Self {
        Self {
            kind,
            condition: None,
            branches: Vec::new(),
            continuations: Vec::new(),
        }
    }

    pub fn condition(mut self, node: Option<Node<'t>>) -> Self {
        self.condition = node;
        self
    }

    pub fn branch(mut self, node: Option<Node<'t>>) -> Self {
        self.branches.extend(node);
        self
    }

    pub fn branches(mut self, nodes: impl IntoIterator<Item = Node<'t>>) -> Self {
        self.branches.extend(nodes);
        self
    }

    pub fn continuation(mut self, node: Option<Node<'t>>) -> Self {
        self.continuations.extend(node);
        self
    }

    pub fn continuations(mut self, nodes: impl IntoIterator<Item = Node<'t>>) -> Self {
        self.continuations.extend(nodes);
        self
    }
}

/// The parts of a call expression
pub struct CallShape {
    pub callee: String,
    pub argument_count: usize,
    pub is_method: bool,
}

/// Grammar description used by the walker
pub trait BodySyntax {
    /// Classify one node
    fn classify<'t>(&self, node: Node<'t>, source: &str) -> NodeRole<'t>;

    /// Whether a node is a statement container whose children form a block
    fn is_block(&self, kind: &str) -> bool;
}

/// Walk the subtree at `declaration.body_span`
///
/// `None` when the declaration has no body or the span no longer matches a
/// node of `tree`.
pub fn walk_declaration<S: BodySyntax + ?Sized>(
    syntax: &S,
    tree: &Tree,
    source: &str,
    declaration: &Declaration,
    options: &ZoomOptions,
) -> Option<Block> {
    let span = declaration.body_span?;
    let body = node_for_span(tree, &span)?;
    Some(BodyWalker::new(syntax, source, options).walk(body))
}

/// Depth-bounded walk of one body subtree
pub struct BodyWalker<'a, S: BodySyntax + ?Sized> {
    syntax: &'a S,
    source: &'a str,
    options: &'a ZoomOptions,
}

impl<'a, S: BodySyntax + ?Sized> BodyWalker<'a, S> {
    pub fn new(syntax: &'a S, source: &'a str, options: &'a ZoomOptions) -> Self {
        Self {
            syntax,
            source,
            options,
        }
    }

    /// Block for the body node of a declaration
    pub fn walk(&self, body: Node) -> Block {
        self.block(body, 0, 0)
    }

    fn block(&self, node: Node, depth: usize, guard: usize) -> Block {
        let mut block = Block::new(node_to_span(&node));
        if self.syntax.is_block(node.kind()) {
            for child in children(&node) {
                self.visit(child, depth, &mut block, guard + 1);
            }
        } else {
            self.visit(node, depth, &mut block, guard + 1);
        }
        block
    }

    fn visit(&self, node: Node, depth: usize, block: &mut Block, guard: usize) {
        if guard > MAX_TREE_DEPTH {
            block.unknown_regions.push(
                UnknownNode::new(node_to_span(&node), UnknownKind::Truncated, "syntax tree too deep")
                    .with_excerpt(self.source),
            );
            return;
        }
        if node.is_missing() {
            block.unknown_regions.push(UnknownNode::new(
                node_to_span(&node),
                UnknownKind::Missing,
                format!("missing {}", node.kind()),
            ));
            return;
        }
        if node.is_error() {
            block.unknown_regions.push(
                UnknownNode::new(node_to_span(&node), UnknownKind::SyntaxError, "syntax error")
                    .with_excerpt(self.source),
            );
            self.visit_children(node, depth, block, guard);
            return;
        }

        match self.syntax.classify(node, self.source) {
            NodeRole::Comment(comment) => block.comments.push(comment),
            NodeRole::Declaration(decl) => {
                if self.options.extract_nested {
                    block.nested_declarations.push(decl);
                }
            }
            NodeRole::Call(shape) => {
                if self.options.extract_calls {
                    block.calls.push(Call {
                        callee: shape.callee,
                        span: node_to_span(&node),
                        argument_count: shape.argument_count,
                        is_method: shape.is_method,
                    });
                }
                self.visit_children(node, depth, block, guard);
            }
            NodeRole::Flow(shape) if self.options.extract_control_flow => {
                self.flow(node, shape, depth, block, guard);
            }
            NodeRole::Flow(_) | NodeRole::Opaque => self.visit_children(node, depth, block, guard),
        }
    }

    fn visit_children(&self, node: Node, depth: usize, block: &mut Block, guard: usize) {
        for child in children(&node) {
            self.visit(child, depth, block, guard + 1);
        }
    }

    /// Emit a control-flow node found in a block at `depth`
    fn flow(&self, node: Node, shape: FlowShape, depth: usize, block: &mut Block, guard: usize) {
        let level = depth + 1;
        if level > self.options.max_depth {
            block.unknown_regions.push(
                UnknownNode::new(
                    node_to_span(&node),
                    UnknownKind::Truncated,
                    format!("nesting exceeds max depth {}", self.options.max_depth),
                )
                .with_excerpt(self.source),
            );
            return;
        }

        let mut parts: Vec<Node> = shape.branches.clone();
        parts.extend(shape.continuations.iter().copied());
        // Conditions, loop headers and the like belong to the enclosing block.
        self.visit_header(node, &parts, depth, block, guard);

        let branches = shape
            .branches
            .iter()
            .map(|branch| self.block(*branch, level, guard + 1))
            .collect();

        block.control_flow.push(ControlFlow {
            kind: shape.kind,
            span: node_to_span(&node),
            condition_span: shape.condition.map(|c| node_to_span(&c)),
            branches,
        });

        for next in shape.continuations {
            match self.syntax.classify(next, self.source) {
                NodeRole::Flow(next_shape) => self.flow(next, next_shape, depth, block, guard + 1),
                _ => self.visit(next, depth, block, guard + 1),
            }
        }
    }

    /// Walk everything under `node` except the branch and continuation subtrees
    fn visit_header(&self, node: Node, parts: &[Node], depth: usize, block: &mut Block, guard: usize) {
        for child in children(&node) {
            if parts.iter().any(|p| p.id() == child.id()) {
                continue;
            }
            let holds_part = parts
                .iter()
                .any(|p| child.start_byte() <= p.start_byte() && p.end_byte() <= child.end_byte());
            if holds_part {
                self.visit_header(child, parts, depth, block, guard + 1);
            } else {
                self.visit(child, depth, block, guard + 1);
            }
        }
    }
}
