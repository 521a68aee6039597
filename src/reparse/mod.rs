//! Incremental reparsing.
//!
//! Given a previous [`SyntaxTree`] and the edits applied since it was
//! built, [`reparse`] produces the tree of the new text while reusing
//! every old subtree the edits provably did not touch. The result is
//! structurally identical to a from-scratch parse of the new text; only
//! the work differs.
//!
//! The pipeline: clone the old tree, shift every node range through each
//! edit, and mark as *edited* every node whose examined span — from its
//! start to the furthest byte the lexer looked at while building it —
//! touches a replaced span. A cursor then walks the topmost surviving
//! clean subtrees in source order and offers them to the parser, which
//! splices one in whenever it starts at the current position and was
//! originally parsed from the current state. A rejected subtree is
//! broken into its children, so reuse degrades gracefully toward a full
//! reparse instead of failing.

use std::collections::VecDeque;

use text_size::TextSize;

use crate::base::{apply_edits, Edit};
use crate::compile::CompiledGrammar;
use crate::parser::{parse_with, parse_with_reuse, ParseOptions, ReuseCandidate, ReuseSource};
use crate::tree::{NodeId, NodeKind, SyntaxTree, TreeBuilder};

/// Reparse after `edits` with default options.
///
/// Each edit's coordinates are interpreted in the text produced by the
/// previous one, oldest first. `new_text` is the edited source; it must
/// equal the old text with the edits applied.
pub fn reparse(
    grammar: &CompiledGrammar,
    old: &SyntaxTree,
    edits: &[Edit],
    new_text: &str,
) -> SyntaxTree {
    reparse_with(grammar, old, edits, new_text, ParseOptions::default())
}

/// Reparse after `edits` with explicit options.
pub fn reparse_with(
    grammar: &CompiledGrammar,
    old: &SyntaxTree,
    edits: &[Edit],
    new_text: &str,
    options: ParseOptions<'_>,
) -> SyntaxTree {
    debug_assert_eq!(
        new_text,
        apply_edits(edits, old.text()),
        "new_text must be the old text with the edits applied"
    );

    // a cancelled tree stops mid-input; nothing in it is trustworthy
    if old.was_cancelled() {
        return parse_with(grammar, new_text, options);
    }

    let mut adjusted = old.clone();
    for edit in edits {
        adjust(&mut adjusted, edit);
    }

    let mut cursor = ReuseCursor::new(&adjusted);
    let tree = parse_with_reuse(grammar, new_text, options, &mut cursor);
    tracing::debug!(
        grammar = %grammar.name(),
        edits = edits.len(),
        bytes = new_text.len(),
        "incremental reparse finished"
    );
    tree
}

/// Shift every node range through `edit` and mark the nodes whose
/// examined span touches the replaced span. The examined span runs from
/// the node's start to one past the furthest byte the lexer read for it,
/// so a pure insertion still invalidates the token whose lexing probed
/// the insertion point.
fn adjust(tree: &mut SyntaxTree, edit: &Edit) {
    for node in &mut tree.nodes {
        if node.range.start() <= edit.old_end && node.lookahead_end > edit.start {
            node.edited = true;
        }
        node.range = text_size::TextRange::new(
            edit.map(node.range.start()),
            edit.map(node.range.end()),
        );
        node.lookahead_end = edit.map(node.lookahead_end);
    }
}

// =============================================================================
// Reuse cursor
// =============================================================================

/// Walks the adjusted old tree in source order, always holding the
/// topmost candidates that have not yet been passed or broken down.
pub(crate) struct ReuseCursor<'t> {
    tree: &'t SyntaxTree,
    queue: VecDeque<NodeId>,
    current: Option<NodeId>,
}

impl<'t> ReuseCursor<'t> {
    pub fn new(tree: &'t SyntaxTree) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(tree.root().id());
        Self {
            tree,
            queue,
            current: None,
        }
    }

    /// Replace the front node with its children, preserving order.
    fn descend(&mut self) {
        if let Some(front) = self.queue.pop_front() {
            let children = &self.tree.node(front).children;
            for &child in children.iter().rev() {
                self.queue.push_front(child);
            }
        }
    }
}

impl ReuseSource for ReuseCursor<'_> {
    fn candidate(&mut self, pos: TextSize) -> Option<ReuseCandidate> {
        self.current = None;
        loop {
            let &front = self.queue.front()?;
            let node = self.tree.node(front);
            if node.range.end() <= pos {
                // wholly behind the parse position
                self.queue.pop_front();
                continue;
            }
            if node.range.start() == pos {
                self.current = Some(front);
                return Some(ReuseCandidate {
                    symbol: node.symbol,
                    range: node.range,
                    enter_state: node.enter_state,
                    lookahead_end: node.lookahead_end,
                    has_error: node.has_error,
                    edited: node.edited,
                    is_token: node.kind != NodeKind::Node,
                });
            }
            if node.range.start() < pos {
                // straddles the position; a child may still line up
                self.descend();
                continue;
            }
            // next candidate starts further right
            return None;
        }
    }

    fn accept(&mut self) {
        self.queue.pop_front();
    }

    fn reject(&mut self) {
        self.current = None;
        self.descend();
    }

    fn graft(&self, builder: &mut TreeBuilder) -> NodeId {
        let current = self.current.expect("graft follows an accepted candidate");
        builder.graft(self.tree, current)
    }
}
