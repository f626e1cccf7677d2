//! Determinism Layer
//!
//! Every list in the IR is put in source order, ties keeping the order the
//! adapter produced, and serialized output goes through `serde_json::Value`
//! so object keys come out sorted.

use crate::ir::{Block, Declaration, File, Span};
use serde::Serialize;

fn by_span<T>(items: &mut [T], span: impl Fn(&T) -> Span) {
    items.sort_by_key(|item| {
        let s = span(item);
        (s.start, s.end)
    });
}

/// Put every list of a file in source order and drop duplicate unknowns
pub fn canonicalize_file(file: &mut File) {
    canonicalize_declarations(&mut file.declarations);
    by_span(&mut file.imports, |i| i.span);
    by_span(&mut file.comments, |c| c.span);
    by_span(&mut file.unknown_regions, |u| u.span);
    file.unknown_regions.dedup();
    by_span(&mut file.unparsed_blocks, |u| u.span);
    file.unparsed_blocks.dedup();
}

fn canonicalize_declarations(declarations: &mut [Declaration]) {
    by_span(declarations, |d| d.span);
    for declaration in declarations.iter_mut() {
        by_span(&mut declaration.parameters, |p| p.span);
        canonicalize_declarations(&mut declaration.children);
        if let Some(body) = declaration.body.as_mut() {
            canonicalize_block(body);
        }
    }
}

/// Put every list of a block, and of its branches, in source order
pub fn canonicalize_block(block: &mut Block) {
    by_span(&mut block.control_flow, |c| c.span);
    by_span(&mut block.calls, |c| c.span);
    by_span(&mut block.comments, |c| c.span);
    by_span(&mut block.unknown_regions, |u| u.span);
    block.unknown_regions.dedup();
    canonicalize_declarations(&mut block.nested_declarations);
    for flow in &mut block.control_flow {
        for branch in &mut flow.branches {
            canonicalize_block(branch);
        }
    }
}

/// Pretty JSON with object keys in sorted order
pub fn to_canonical_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string_pretty(&value)
}

/// MD5 of the canonical JSON of `value`
pub fn fingerprint<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let json = to_canonical_json(value)?;
    Ok(format!("{:x}", md5::compute(json.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Call, ControlFlow, ControlFlowKind, DeclarationKind, LanguageId, UnknownKind, UnknownNode};

    fn decl(name: &str, start: usize, end: usize) -> Declaration {
        Declaration::new(name.to_string(), DeclarationKind::Function, Span::new(start, end, 1, 1))
    }

    fn call(name: &str, start: usize) -> Call {
        Call {
            callee: name.to_string(),
            span: Span::new(start, start + 1, 1, 1),
            argument_count: 0,
            is_method: false,
        }
    }

    #[test]
    fn test_canonicalize_file_orders_recursively() {
        let mut class = decl("C", 0, 50);
        class.children = vec![decl("second", 30, 40), decl("first", 10, 20)];

        let mut file = File::new("a.ts".to_string(), LanguageId::TypeScript);
        file.declarations = vec![decl("late", 60, 70), class];
        let unknown = UnknownNode::new(Span::new(80, 90, 9, 9), UnknownKind::SyntaxError, "syntax error");
        file.unknown_regions = vec![unknown.clone(), unknown];

        canonicalize_file(&mut file);
        let names: Vec<_> = file.walk_declarations().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["C", "first", "second", "late"]);
        assert_eq!(file.unknown_regions.len(), 1);
    }

    #[test]
    fn test_ties_keep_adapter_order() {
        let mut block = Block::default();
        block.calls = vec![call("outer", 5), call("b", 1), call("a", 1)];
        canonicalize_block(&mut block);
        let callees: Vec<_> = block.calls.iter().map(|c| c.callee.as_str()).collect();
        assert_eq!(callees, vec!["b", "a", "outer"]);
    }

    #[test]
    fn test_canonicalize_block_branches() {
        let mut branch = Block::default();
        branch.calls = vec![call("y", 9), call("x", 8)];
        let mut block = Block::default();
        block.control_flow.push(ControlFlow {
            kind: ControlFlowKind::If,
            span: Span::new(7, 10, 1, 1),
            condition_span: None,
            branches: vec![branch],
        });
        canonicalize_block(&mut block);
        assert_eq!(block.control_flow[0].branches[0].calls[0].callee, "x");
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let json = to_canonical_json(&call("f", 0)).unwrap();
        let argument = json.find("\"argument_count\"").unwrap();
        let callee = json.find("\"callee\"").unwrap();
        let is_method = json.find("\"is_method\"").unwrap();
        let span = json.find("\"span\"").unwrap();
        assert!(argument < callee && callee < is_method && is_method < span);

        let end = json.find("\"end\"").unwrap();
        let start = json.find("\"start\"").unwrap();
        assert!(end < start);
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = fingerprint(&decl("f", 0, 1)).unwrap();
        assert_eq!(a, fingerprint(&decl("f", 0, 1)).unwrap());
        assert_ne!(a, fingerprint(&decl("g", 0, 1)).unwrap());
    }
}
