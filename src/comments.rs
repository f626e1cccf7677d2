//! Comment Attacher
//!
//! Associates comments with declarations by position alone:
//!
//! - a comment directly above a declaration (or before it on the same line)
//!   attaches to it; a run of adjacent comments attaches as a whole
//! - a fully blank line in between breaks the link, except for doc comments
//! - a comment trailing code on its line attaches to the innermost
//!   declaration containing that line, or else to a declaration starting
//!   later on the same line
//! - an inner doc comment (`//!`, module docstring) attaches to the
//!   declaration that encloses it
//!
//! The attacher is a pure function of its inputs. Running it again over its
//! own output yields the same result.

use crate::ir::{Block, Comment, CommentKind, Declaration, DeclarationWalk, Span};

/// Where a comment sits relative to the code around it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Inner,
    Trailing,
    Leading,
}

/// A declaration a comment can attach to
struct Target<'a> {
    span: Span,
    name: &'a str,
}

/// Attach file-level comments to declarations
///
/// Sets `attached_to` on every comment (`None` when nothing qualifies) and
/// `doc_comment` on declarations that do not already carry one.
pub fn attach(
    mut comments: Vec<Comment>,
    mut declarations: Vec<Declaration>,
    source: &str,
) -> (Vec<Comment>, Vec<Declaration>) {
    let docs = {
        let targets: Vec<Target> = DeclarationWalk::new(&declarations)
            .map(|d| Target {
                span: d.span,
                name: &d.name,
            })
            .collect();
        let occupied: Vec<Span> = comments.iter().map(|c| c.span).collect();

        let links: Vec<Option<usize>> = comments
            .iter()
            .map(|c| link(c, placement(c, source), &targets, &occupied, source))
            .collect();
        for (comment, target) in comments.iter_mut().zip(&links) {
            comment.attached_to = target.map(|i| targets[i].name.to_string());
        }

        (0..targets.len())
            .map(|i| doc_for(i, &targets[i], &comments, &links))
            .collect::<Vec<_>>()
    };

    let mut index = 0;
    for declaration in &mut declarations {
        apply_docs(declaration, &docs, &mut index);
    }
    (comments, declarations)
}

/// Attach comments found in a zoomed body
///
/// Nested declarations recorded in the block are the candidate targets;
/// inner and trailing comments with no closer candidate attach to `owner`,
/// the zoomed declaration.
pub fn attach_in_block(block: &mut Block, owner: &str, source: &str) {
    let mut comments = Vec::new();
    let mut nested = Vec::new();
    collect_block(block, &mut comments, &mut nested);

    let targets: Vec<Target> = nested
        .iter()
        .map(|d| Target {
            span: d.span,
            name: &d.name,
        })
        .collect();
    let occupied: Vec<Span> = comments.iter().map(|c| c.span).collect();

    let links: Vec<Option<usize>> = comments
        .iter()
        .map(|c| link(c, placement(c, source), &targets, &occupied, source))
        .collect();

    let mut owned: Vec<Comment> = comments.iter().map(|c| (*c).clone()).collect();
    let names: Vec<(Span, Option<String>)> = owned
        .iter()
        .zip(&links)
        .map(|(c, target)| {
            let name = match target {
                Some(i) => Some(targets[*i].name.to_string()),
                None if placement(c, source) != Placement::Leading => Some(owner.to_string()),
                None => None,
            };
            (c.span, name)
        })
        .collect();
    for (comment, (_, name)) in owned.iter_mut().zip(&names) {
        comment.attached_to = name.clone();
    }

    let docs: Vec<(Span, Option<Comment>)> = targets
        .iter()
        .enumerate()
        .map(|(i, t)| (t.span, doc_for(i, t, &owned, &links)))
        .collect();

    apply_block(block, &names, &docs);
}

fn collect_block<'b>(block: &'b Block, comments: &mut Vec<&'b Comment>, nested: &mut Vec<&'b Declaration>) {
    comments.extend(block.comments.iter());
    nested.extend(block.nested_declarations.iter());
    for flow in &block.control_flow {
        for branch in &flow.branches {
            collect_block(branch, comments, nested);
        }
    }
}

fn apply_block(block: &mut Block, names: &[(Span, Option<String>)], docs: &[(Span, Option<Comment>)]) {
    for comment in &mut block.comments {
        if let Some((_, name)) = names.iter().find(|(span, _)| *span == comment.span) {
            comment.attached_to = name.clone();
        }
    }
    for declaration in &mut block.nested_declarations {
        if declaration.doc_comment.is_some() {
            continue;
        }
        if let Some((_, doc)) = docs.iter().find(|(span, _)| *span == declaration.span) {
            declaration.doc_comment = doc.clone();
        }
    }
    for flow in &mut block.control_flow {
        for branch in &mut flow.branches {
            apply_block(branch, names, docs);
        }
    }
}

fn apply_docs(declaration: &mut Declaration, docs: &[Option<Comment>], index: &mut usize) {
    if declaration.doc_comment.is_none() {
        declaration.doc_comment = docs.get(*index).cloned().flatten();
    }
    *index += 1;
    for child in &mut declaration.children {
        apply_docs(child, docs, index);
    }
}

fn placement(comment: &Comment, source: &str) -> Placement {
    if comment.inner {
        return Placement::Inner;
    }
    let line_start = source
        .get(..comment.span.start)
        .and_then(|before| before.rfind('\n'))
        .map_or(0, |i| i + 1);
    let before = source.get(line_start..comment.span.start).unwrap_or("");
    if before.trim().is_empty() {
        Placement::Leading
    } else {
        Placement::Trailing
    }
}

fn link(
    comment: &Comment,
    placement: Placement,
    targets: &[Target],
    occupied: &[Span],
    source: &str,
) -> Option<usize> {
    match placement {
        Placement::Inner => targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.span.encloses(&comment.span) && t.span != comment.span)
            .min_by_key(|(_, t)| t.span.len())
            .map(|(i, _)| i),
        Placement::Trailing => targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.span.start < comment.span.start && t.span.contains_line(comment.span.start_line))
            .min_by_key(|(_, t)| t.span.len())
            .map(|(i, _)| i)
            .or_else(|| {
                // Code before the comment, a declaration starting after it
                let (index, _) = next_target(comment, targets)
                    .filter(|(_, t)| t.span.start_line == comment.span.end_line)?;
                following(comment, targets, index, occupied, source, false)
            }),
        Placement::Leading => {
            let (index, _) = next_target(comment, targets)?;
            following(comment, targets, index, occupied, source, comment.kind == CommentKind::Doc)
        }
    }
}

/// First target starting after the comment
fn next_target<'t, 'a>(comment: &Comment, targets: &'t [Target<'a>]) -> Option<(usize, &'t Target<'a>)> {
    targets
        .iter()
        .enumerate()
        .filter(|(_, t)| t.span.start >= comment.span.end)
        .min_by_key(|(_, t)| t.span.start)
}

/// `index` when only whitespace and comments separate it from the comment
fn following(
    comment: &Comment,
    targets: &[Target],
    index: usize,
    occupied: &[Span],
    source: &str,
    blank_ok: bool,
) -> Option<usize> {
    let gap = Span::new(comment.span.end, targets[index].span.start, 0, 0);
    gap_allows(source, gap, occupied, blank_ok).then_some(index)
}

/// Only whitespace and other comments between a comment and its target,
/// and no fully blank line unless `blank_ok`
fn gap_allows(source: &str, gap: Span, occupied: &[Span], blank_ok: bool) -> bool {
    let Some(text) = source.get(gap.start..gap.end) else {
        return false;
    };
    let masked: String = text
        .char_indices()
        .map(|(i, ch)| {
            let offset = gap.start + i;
            if occupied.iter().any(|span| span.contains(offset)) {
                'x'
            } else {
                ch
            }
        })
        .collect();

    if masked.chars().any(|ch| ch != 'x' && !ch.is_whitespace()) {
        return false;
    }
    if blank_ok {
        return true;
    }
    let lines: Vec<&str> = masked.split('\n').collect();
    lines.len() < 3 || lines[1..lines.len() - 1].iter().all(|line| !line.trim().is_empty())
}

/// Nearest leading comment attached to a target, merged with the adjacent
/// single-line comments of the same kind above it
fn doc_for(index: usize, target: &Target, comments: &[Comment], links: &[Option<usize>]) -> Option<Comment> {
    let leading: Vec<&Comment> = comments
        .iter()
        .zip(links)
        .filter(|(c, link)| **link == Some(index) && !c.inner && c.span.end <= target.span.start)
        .map(|(c, _)| c)
        .collect();
    let nearest = *leading.iter().max_by_key(|c| c.span.start)?;
    if nearest.span.start_line != nearest.span.end_line {
        return Some(nearest.clone());
    }

    let mut run = vec![nearest];
    loop {
        let Some(first) = run.last().copied() else { break };
        let previous = leading.iter().copied().find(|c| {
            c.kind == nearest.kind
                && c.span.start_line == c.span.end_line
                && c.span.end_line + 1 == first.span.start_line
        });
        match previous {
            Some(previous) => run.push(previous),
            None => break,
        }
    }
    if run.len() == 1 {
        return Some(nearest.clone());
    }

    run.reverse();
    let head = run[0];
    let text = run.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n");
    let mut merged = Comment::new(
        text,
        nearest.kind,
        Span {
            start: head.span.start,
            start_line: head.span.start_line,
            start_column: head.span.start_column,
            ..nearest.span
        },
    );
    merged.attached_to = nearest.attached_to.clone();
    Some(merged)
}
