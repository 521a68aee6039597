//! Concrete syntax trees.
//!
//! A [`SyntaxTree`] is an arena of nodes indexed by [`NodeId`]; nodes
//! never move, and a tree is immutable to callers once parsing returns
//! it. Every parse produces a tree, even for garbage input: errors show
//! up as `Error` nodes in the structure and as [`ParseRecoveryError`]
//! values on the tree, never as a failed `Result`.
//!
//! Visible rules and named tokens produce nodes; hidden rules (names
//! starting with `_`) and anonymous tokens contribute their spans to the
//! enclosing node without appearing themselves. The root always covers
//! the whole source, trailing trivia included.
//!
//! Each node also records two pieces of bookkeeping for incremental
//! reparsing: the parse state the node was entered in, and the furthest
//! byte the lexer examined while producing it. A node is safe to reuse
//! only at the same state, and only if no edit touched its examined span.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};
use thiserror::Error;

use crate::compile::StateId;
use crate::grammar::Symbol;

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A visible rule.
    Node,
    /// A named token leaf.
    Token,
    /// A span the parser could not fit into the grammar.
    Error,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub symbol: Symbol,
    pub name: SmolStr,
    pub range: TextRange,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Parse state the parser was in when this node's span began.
    pub enter_state: StateId,
    /// End of the furthest byte the lexer examined for this subtree.
    pub lookahead_end: TextSize,
    /// True if this node or any descendant is an error node.
    pub has_error: bool,
    /// Set during reparse adjustment when an edit touched the node.
    pub edited: bool,
}

/// A parse error recovered into the tree.
///
/// These never abort a parse; they describe the `Error` nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRecoveryError {
    #[error("unexpected token `{token}` at {}..{}", u32::from(range.start()), u32::from(range.end()))]
    UnexpectedToken { token: SmolStr, range: TextRange },

    #[error("unrecognized text at {}..{}", u32::from(range.start()), u32::from(range.end()))]
    UnrecognizedText { range: TextRange },

    #[error("unexpected end of input at offset {}", u32::from(*offset))]
    UnexpectedEof { offset: TextSize },
}

impl ParseRecoveryError {
    /// The source range the error covers.
    pub fn range(&self) -> TextRange {
        match self {
            ParseRecoveryError::UnexpectedToken { range, .. } => *range,
            ParseRecoveryError::UnrecognizedText { range } => *range,
            ParseRecoveryError::UnexpectedEof { offset } => TextRange::empty(*offset),
        }
    }
}

/// An immutable concrete syntax tree plus the source text it parsed.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub(crate) text: String,
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) root: NodeId,
    pub(crate) errors: Vec<ParseRecoveryError>,
    pub(crate) cancelled: bool,
}

impl SyntaxTree {
    /// The root node. Always spans the entire source.
    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode {
            tree: self,
            id: self.root,
        }
    }

    /// The source text this tree was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Recovery errors, in source order.
    pub fn errors(&self) -> &[ParseRecoveryError] {
        &self.errors
    }

    /// True if any error node exists anywhere in the tree.
    pub fn has_error(&self) -> bool {
        self.nodes[self.root.index()].has_error
    }

    /// True if parsing stopped early because its token budget ran out.
    /// A cancelled tree is structurally valid but must not be reused as
    /// the base of an incremental reparse.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Render the tree as an s-expression over visible nodes, e.g.
    /// `(source_file (binding (identifier) (number)))`.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.root().write_sexp(&mut out);
        out
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// A cursor over one node of a [`SyntaxTree`].
#[derive(Debug, Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    fn data(&self) -> &'t NodeData {
        self.tree.node(self.id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    /// The node's rule or token name; `"ERROR"` for error nodes.
    pub fn name(&self) -> &'t str {
        &self.data().name
    }

    pub fn is_error(&self) -> bool {
        self.data().kind == NodeKind::Error
    }

    /// True if this node or any descendant is an error node.
    pub fn has_error(&self) -> bool {
        self.data().has_error
    }

    pub fn range(&self) -> TextRange {
        self.data().range
    }

    pub fn start(&self) -> TextSize {
        self.data().range.start()
    }

    pub fn end(&self) -> TextSize {
        self.data().range.end()
    }

    /// The source text the node covers.
    pub fn text(&self) -> &'t str {
        &self.tree.text[self.data().range]
    }

    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        self.data().parent.map(|id| SyntaxNode {
            tree: self.tree,
            id,
        })
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<SyntaxNode<'t>> {
        self.data().children.get(index).map(|&id| SyntaxNode {
            tree: self.tree,
            id,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&id| SyntaxNode { tree, id })
    }

    /// The smallest node whose range contains `offset`.
    pub fn node_at(&self, offset: TextSize) -> SyntaxNode<'t> {
        let mut current = *self;
        'descend: loop {
            for child in current.children() {
                if child.range().contains_inclusive(offset) && !child.range().is_empty() {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    fn write_sexp(&self, out: &mut String) {
        out.push('(');
        out.push_str(self.name());
        for child in self.children() {
            out.push(' ');
            child.write_sexp(out);
        }
        out.push(')');
    }
}

/// Structural equality: same shape, names, and ranges, ignoring the
/// incremental bookkeeping. A from-scratch parse and an incremental
/// reparse of the same text must compare equal.
pub fn structurally_equal(a: &SyntaxTree, b: &SyntaxTree) -> bool {
    fn eq(a: SyntaxNode<'_>, b: SyntaxNode<'_>) -> bool {
        a.kind() == b.kind()
            && a.name() == b.name()
            && a.range() == b.range()
            && a.child_count() == b.child_count()
            && a.children().zip(b.children()).all(|(a, b)| eq(a, b))
    }
    eq(a.root(), b.root())
}

// =============================================================================
// Construction (parser-internal)
// =============================================================================

pub(crate) struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    /// Graft a subtree from a previous tree into this arena, returning
    /// the new id of its root. Ids are remapped; bookkeeping is kept.
    pub fn graft(&mut self, from: &SyntaxTree, root: NodeId) -> NodeId {
        let old = from.node(root);
        let children: Vec<NodeId> = old
            .children
            .iter()
            .map(|&child| self.graft(from, child))
            .collect();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            children: children.clone(),
            parent: None,
            ..old.clone()
        });
        for child in children {
            self.nodes[child.index()].parent = Some(id);
        }
        id
    }

    pub fn finish(
        self,
        text: String,
        root: NodeId,
        errors: Vec<ParseRecoveryError>,
        cancelled: bool,
    ) -> SyntaxTree {
        SyntaxTree {
            text,
            nodes: self.nodes,
            root,
            errors,
            cancelled,
        }
    }
}
