//! Parser engine.
//!
//! A table-driven LR driver over a [`CompiledGrammar`]. The engine keeps
//! two parallel stacks: parse states, and *fragments* holding the tree
//! nodes built so far for each shifted or reduced symbol. Hidden rules
//! and anonymous tokens produce no nodes, so a fragment can carry zero,
//! one, or several subtree roots; a reduce concatenates the popped
//! fragments' roots under the new node (or splices them through when the
//! rule is hidden).
//!
//! Lexing is parse-state directed, so the token stream is re-derived
//! whenever a reduce changes the state before the next shift.
//!
//! Parsing never fails. Unexpected and unrecognizable input becomes
//! `Error` nodes woven into the tree, with matching
//! [`ParseRecoveryError`] values recorded on it, and the parse resumes
//! at the next token.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::compile::{Action, CompiledGrammar, StateId};
use crate::grammar::Symbol;
use crate::lexer::{ExternalScanner, Lexed, Lexer, Token};
use crate::tree::{NodeData, NodeId, NodeKind, ParseRecoveryError, SyntaxTree, TreeBuilder};

/// Per-parse options.
#[derive(Default)]
pub struct ParseOptions<'s> {
    /// Stop after consuming this many tokens. The returned tree is marked
    /// cancelled and covers whatever was parsed; it must not seed an
    /// incremental reparse.
    pub token_budget: Option<usize>,
    /// Scanner for tokens the grammar declares external.
    pub scanner: Option<&'s mut dyn ExternalScanner>,
}

/// Parse `text` with default options.
pub fn parse(grammar: &CompiledGrammar, text: &str) -> SyntaxTree {
    parse_with(grammar, text, ParseOptions::default())
}

/// Parse `text` with explicit options.
pub fn parse_with(grammar: &CompiledGrammar, text: &str, options: ParseOptions<'_>) -> SyntaxTree {
    Parser::new(grammar, text, options, None).run()
}

pub(crate) fn parse_with_reuse(
    grammar: &CompiledGrammar,
    text: &str,
    options: ParseOptions<'_>,
    reuse: &mut dyn ReuseSource,
) -> SyntaxTree {
    Parser::new(grammar, text, options, Some(reuse)).run()
}

/// Supplier of reusable subtrees from a previous parse, consulted before
/// each freshly lexed token.
pub(crate) trait ReuseSource {
    /// The topmost not-yet-rejected candidate starting exactly at `pos`.
    fn candidate(&mut self, pos: TextSize) -> Option<ReuseCandidate>;
    /// The last candidate was spliced in; skip past it.
    fn accept(&mut self);
    /// The last candidate does not fit; break it into its children.
    fn reject(&mut self);
    /// Copy the last candidate's subtree into `builder`.
    fn graft(&self, builder: &mut TreeBuilder) -> NodeId;
}

/// The reuse-relevant facts about a candidate subtree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReuseCandidate {
    pub symbol: Symbol,
    pub range: TextRange,
    pub enter_state: StateId,
    pub lookahead_end: TextSize,
    pub has_error: bool,
    pub edited: bool,
    pub is_token: bool,
}

// =============================================================================
// Driver
// =============================================================================

/// Nodes produced for one stack symbol, plus the bookkeeping to reduce
/// them into a parent.
struct Fragment {
    /// Subtree roots, in source order. Empty for anonymous tokens and
    /// empty hidden rules.
    children: Vec<NodeId>,
    range: TextRange,
    lookahead_end: TextSize,
    /// The state this fragment's symbol was consumed from; a node built
    /// over it can only be reused at the same state.
    from_state: StateId,
}

struct Parser<'g, 's, 'r> {
    grammar: &'g CompiledGrammar,
    text: &'g str,
    lexer: Lexer<'g>,
    scanner: Option<&'s mut dyn ExternalScanner>,
    reuse: Option<&'r mut dyn ReuseSource>,
    builder: TreeBuilder,

    states: Vec<StateId>,
    fragments: Vec<Fragment>,
    /// Error nodes waiting to be attached before the next shifted symbol.
    pending: Vec<NodeId>,

    pos: TextSize,
    last_end: TextSize,
    errors: Vec<ParseRecoveryError>,
    tokens_consumed: usize,
    token_budget: Option<usize>,
}

impl<'g, 's, 'r> Parser<'g, 's, 'r> {
    fn new(
        grammar: &'g CompiledGrammar,
        text: &'g str,
        options: ParseOptions<'s>,
        reuse: Option<&'r mut dyn ReuseSource>,
    ) -> Self {
        Self {
            grammar,
            text,
            lexer: Lexer::new(grammar, text),
            scanner: options.scanner,
            reuse,
            builder: TreeBuilder::new(),
            states: vec![0],
            fragments: Vec::new(),
            pending: Vec::new(),
            pos: TextSize::new(0),
            last_end: TextSize::new(0),
            errors: Vec::new(),
            tokens_consumed: 0,
            token_budget: options.token_budget,
        }
    }

    fn state(&self) -> StateId {
        *self.states.last().expect("state stack never empties")
    }

    fn run(mut self) -> SyntaxTree {
        loop {
            if self
                .token_budget
                .is_some_and(|budget| self.tokens_consumed >= budget)
            {
                tracing::debug!(tokens = self.tokens_consumed, "parse cancelled");
                return self.finalize(true);
            }

            if self.try_reuse() {
                continue;
            }

            let state = self.state();
            match self.lexer.next(self.pos, self.grammar.state(state), &mut self.scanner) {
                Lexed::Token(token) => {
                    match self.grammar.state(state).actions.get(&token.symbol).copied() {
                        Some(Action::Shift(target)) => self.shift(token, target),
                        Some(Action::Reduce(production)) => {
                            self.reduce(production, token.probe_end)
                        }
                        Some(Action::Accept) => unreachable!("accept is keyed on end-of-input"),
                        None => self.skip_unexpected(token),
                    }
                }
                Lexed::Unrecognized { range } => {
                    self.errors
                        .push(ParseRecoveryError::UnrecognizedText { range });
                    self.push_error_node(range);
                    self.pos = range.end();
                    self.tokens_consumed += 1;
                }
                Lexed::End { offset } => {
                    match self.grammar.state(state).actions.get(&Symbol::END).copied() {
                        Some(Action::Accept) => return self.finalize(false),
                        Some(Action::Reduce(production)) => {
                            // end-of-input lookahead examines one past the text
                            let probe = TextSize::of(self.text) + TextSize::new(1);
                            self.reduce(production, probe)
                        }
                        Some(Action::Shift(_)) => {
                            unreachable!("end-of-input is never shifted")
                        }
                        None => {
                            self.unexpected_eof(offset);
                            return self.finalize(false);
                        }
                    }
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Shift / reduce
    // -------------------------------------------------------------------------

    fn shift(&mut self, token: Token, target: StateId) {
        let from_state = self.state();
        let mut children = std::mem::take(&mut self.pending);
        let mut range = token.range;
        for &error in &children {
            range = range.cover(self.builder.node(error).range);
        }
        if self.grammar.is_visible(token.symbol) {
            let id = self.builder.push(NodeData {
                kind: NodeKind::Token,
                symbol: token.symbol,
                name: SmolStr::new(self.grammar.symbol_name(token.symbol)),
                range: token.range,
                parent: None,
                children: Vec::new(),
                enter_state: from_state,
                lookahead_end: token.probe_end,
                has_error: false,
                edited: false,
            });
            children.push(id);
        }
        self.states.push(target);
        self.fragments.push(Fragment {
            children,
            range,
            lookahead_end: token.probe_end,
            from_state,
        });
        self.pos = token.range.end();
        self.last_end = token.range.end();
        self.tokens_consumed += 1;
    }

    /// Pop the production's fragments, build or splice the node, follow
    /// the goto. `lookahead` is the probe extent of the token that drove
    /// this reduce: the decision can hinge on that token when precedence
    /// resolved a conflict in the tables, so the node's examined extent
    /// has to cover it or reuse would replay a stale decision.
    fn reduce(&mut self, production: u32, lookahead: TextSize) {
        let production = self.grammar.production(production).clone();
        let count = production.rhs.len();

        let at = self.fragments.len() - count;
        let popped: Vec<Fragment> = self.fragments.drain(at..).collect();
        self.states.truncate(self.states.len() - count);
        let under = self.state();

        let mut children: Vec<NodeId> = Vec::new();
        let mut range: Option<TextRange> = None;
        let mut lookahead_end = TextSize::new(0);
        let mut from_state = under;
        for (i, fragment) in popped.into_iter().enumerate() {
            if i == 0 {
                from_state = fragment.from_state;
            }
            children.extend(fragment.children);
            lookahead_end = lookahead_end.max(fragment.lookahead_end);
            range = Some(match range {
                None => fragment.range,
                Some(range) => range.cover(fragment.range),
            });
        }
        let range = range.unwrap_or_else(|| TextRange::empty(self.last_end));
        let lookahead_end = lookahead_end.max(range.end()).max(lookahead);

        let target = match self.grammar.state(under).gotos.get(&production.lhs) {
            Some(&target) => target,
            // unreachable for tables built by this crate
            None => under,
        };

        if self.grammar.is_visible(production.lhs) && !range.is_empty() {
            let has_error = children
                .iter()
                .any(|&child| self.builder.node(child).has_error);
            let id = self.builder.push(NodeData {
                kind: NodeKind::Node,
                symbol: production.lhs,
                name: SmolStr::new(self.grammar.symbol_name(production.lhs)),
                range,
                parent: None,
                children: children.clone(),
                enter_state: from_state,
                lookahead_end,
                has_error,
                edited: false,
            });
            for &child in &children {
                self.builder.node_mut(child).parent = Some(id);
            }
            children = vec![id];
        }

        self.states.push(target);
        self.fragments.push(Fragment {
            children,
            range,
            lookahead_end,
            from_state,
        });
    }

    // -------------------------------------------------------------------------
    // Subtree reuse
    // -------------------------------------------------------------------------

    /// Splice a clean subtree from the previous parse if one starts here
    /// and was originally parsed from this exact state.
    fn try_reuse(&mut self) -> bool {
        let Some(reuse) = self.reuse.as_deref_mut() else {
            return false;
        };
        let state = *self.states.last().expect("state stack never empties");
        while let Some(candidate) = reuse.candidate(self.pos) {
            let fits = !candidate.edited
                && !candidate.has_error
                && !candidate.is_token
                && !candidate.range.is_empty()
                && candidate.enter_state == state
                && self.grammar.state(state).gotos.contains_key(&candidate.symbol);
            if !fits {
                reuse.reject();
                continue;
            }
            let target = self.grammar.state(state).gotos[&candidate.symbol];
            reuse.accept();
            let id = reuse.graft(&mut self.builder);

            let mut children = std::mem::take(&mut self.pending);
            let mut range = candidate.range;
            for &error in &children {
                range = range.cover(self.builder.node(error).range);
            }
            children.push(id);
            self.states.push(target);
            self.fragments.push(Fragment {
                children,
                range,
                lookahead_end: candidate.lookahead_end,
                from_state: state,
            });
            self.pos = candidate.range.end();
            self.last_end = candidate.range.end();
            self.tokens_consumed += 1;
            tracing::trace!(
                symbol = %self.grammar.symbol_name(candidate.symbol),
                start = u32::from(candidate.range.start()),
                end = u32::from(candidate.range.end()),
                "reused subtree"
            );
            return true;
        }
        false
    }

    // -------------------------------------------------------------------------
    // Recovery
    // -------------------------------------------------------------------------

    fn skip_unexpected(&mut self, token: Token) {
        self.errors.push(ParseRecoveryError::UnexpectedToken {
            token: SmolStr::new(&self.text[token.range]),
            range: token.range,
        });
        self.push_error_node(token.range);
        self.pos = token.range.end();
        self.tokens_consumed += 1;
    }

    fn unexpected_eof(&mut self, offset: TextSize) {
        // an unrecognized-text run reaching the end already covers this
        let already_reported = self
            .errors
            .last()
            .is_some_and(|error| error.range().end() == offset);
        if !already_reported {
            self.errors.push(ParseRecoveryError::UnexpectedEof { offset });
            // a zero-width error marker, so the tree reflects the failure
            let any_error = self
                .pending
                .iter()
                .chain(
                    self.fragments
                        .iter()
                        .flat_map(|fragment| fragment.children.iter()),
                )
                .any(|&id| self.builder.node(id).has_error);
            if !any_error {
                self.push_error_node(TextRange::empty(offset));
            }
        }
    }

    fn push_error_node(&mut self, range: TextRange) {
        let id = self.builder.push(NodeData {
            kind: NodeKind::Error,
            symbol: Symbol::ERROR,
            name: SmolStr::new_static("ERROR"),
            range,
            parent: None,
            children: Vec::new(),
            enter_state: self.state(),
            lookahead_end: range.end(),
            has_error: true,
            edited: false,
        });
        self.pending.push(id);
    }

    // -------------------------------------------------------------------------
    // Finalization
    // -------------------------------------------------------------------------

    /// Assemble the root. The root always spans the whole source; loose
    /// fragments left by recovery or cancellation become its children.
    fn finalize(mut self, cancelled: bool) -> SyntaxTree {
        let full = TextRange::new(TextSize::new(0), TextSize::of(self.text));

        // cancellation stops mid-input; the unconsumed suffix still gets
        // a node so error nodes cover every unparsed span
        if cancelled && self.pos < full.end() {
            self.push_error_node(TextRange::new(self.pos, full.end()));
        }

        let mut children: Vec<NodeId> = Vec::new();
        for fragment in std::mem::take(&mut self.fragments) {
            children.extend(fragment.children);
        }
        children.append(&mut self.pending);

        let single = match children.as_slice() {
            [only]
                if self.builder.node(*only).symbol == self.grammar.start_symbol()
                    || self.builder.node(*only).kind == NodeKind::Error =>
            {
                Some(*only)
            }
            _ => None,
        };
        let root = match single {
            Some(root) => {
                self.builder.node_mut(root).range = full;
                // the root depends on the whole text plus end-of-input;
                // it is never a reuse candidate
                self.builder.node_mut(root).lookahead_end = full.end() + TextSize::new(1);
                root
            }
            None => {
                let has_error = children
                    .iter()
                    .any(|&child| self.builder.node(child).has_error);
                let start = self.grammar.start_symbol();
                let id = self.builder.push(NodeData {
                    kind: NodeKind::Node,
                    symbol: start,
                    name: SmolStr::new(self.grammar.symbol_name(start)),
                    range: full,
                    parent: None,
                    children: children.clone(),
                    enter_state: 0,
                    lookahead_end: full.end() + TextSize::new(1),
                    has_error,
                    edited: false,
                });
                for child in children {
                    self.builder.node_mut(child).parent = Some(id);
                }
                id
            }
        };

        tracing::debug!(
            grammar = %self.grammar.name(),
            bytes = u32::from(full.end()),
            errors = self.errors.len(),
            cancelled,
            "parse finished"
        );
        self.builder
            .finish(self.text.to_owned(), root, self.errors, cancelled)
    }
}
