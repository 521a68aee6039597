//! Compiled grammar tables.
//!
//! Everything in this module is immutable after [`crate::compile`]
//! finishes; a [`CompiledGrammar`] can be shared read-only across threads
//! and reused for any number of parses.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::grammar::{Assoc, Symbol};
use crate::lexer::LexTable;

/// Index of a state in the parse automaton.
pub(crate) type StateId = u32;

/// What a symbol stands for in the compiled symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SymbolKind {
    /// Token matched by the built-in lexer.
    Terminal,
    /// Token produced by an external scanner.
    External,
    /// Composite rule symbol.
    NonTerminal,
}

/// Per-symbol metadata.
#[derive(Debug, Clone)]
pub(crate) struct SymbolInfo {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Visible symbols produce tree nodes; hidden ones splice through.
    pub visible: bool,
    /// Explicit token precedence, for lexer tie-breaking.
    pub token_prec: i32,
    /// Literal tokens beat patterns at equal match length.
    pub is_literal: bool,
}

/// One flattened production `lhs → rhs`.
#[derive(Debug, Clone)]
pub(crate) struct Production {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
    pub prec: i32,
    pub assoc: Assoc,
}

/// A parse action for one (state, terminal) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Shift(StateId),
    Reduce(u32),
    Accept,
}

/// One state of the parse automaton. Immutable after compile.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParseState {
    /// Terminal → action. The key set doubles as the lexer's valid-token
    /// set for this state.
    pub actions: FxHashMap<Symbol, Action>,
    /// Nonterminal → successor state.
    pub gotos: FxHashMap<Symbol, StateId>,
    /// External tokens with actions here, in symbol order.
    pub valid_externals: Vec<Symbol>,
}

/// A compiled grammar: parse table, lexer table, and symbol metadata.
///
/// `Send + Sync` by construction; share it freely. Parsing never mutates
/// it.
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    pub(crate) name: SmolStr,
    pub(crate) symbols: Vec<SymbolInfo>,
    pub(crate) productions: Vec<Production>,
    pub(crate) states: Vec<ParseState>,
    pub(crate) lex: LexTable,
    pub(crate) extras: Vec<Symbol>,
    pub(crate) start_symbol: Symbol,
}

impl CompiledGrammar {
    /// The grammar's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The display name of `symbol` (`"ERROR"` for the error sentinel).
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        if symbol == Symbol::ERROR {
            return "ERROR";
        }
        &self.symbols[symbol.index()].name
    }

    /// Look up a symbol by name. Anonymous tokens are named by their text.
    pub fn symbol_named(&self, name: &str) -> Option<Symbol> {
        self.symbols
            .iter()
            .position(|info| info.name == name)
            .map(|i| Symbol(i as u16))
    }

    /// The start rule's symbol.
    pub fn start_symbol(&self) -> Symbol {
        self.start_symbol
    }

    /// Number of states in the parse automaton.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn state(&self, id: StateId) -> &ParseState {
        &self.states[id as usize]
    }

    pub(crate) fn production(&self, id: u32) -> &Production {
        &self.productions[id as usize]
    }

    pub(crate) fn is_visible(&self, symbol: Symbol) -> bool {
        symbol != Symbol::ERROR && self.symbols[symbol.index()].visible
    }

    pub(crate) fn token_prec(&self, symbol: Symbol) -> i32 {
        self.symbols[symbol.index()].token_prec
    }

    pub(crate) fn token_is_literal(&self, symbol: Symbol) -> bool {
        self.symbols[symbol.index()].is_literal
    }

    /// Render a production for diagnostics: ``expr → expr '+' expr``.
    pub(crate) fn render_production(&self, production: &Production) -> String {
        render_production(&self.symbols, production)
    }
}

/// Render a production against a symbol table (also used while the tables
/// are still under construction, before a `CompiledGrammar` exists).
pub(crate) fn render_production(symbols: &[SymbolInfo], production: &Production) -> String {
    let mut out = String::new();
    out.push_str(&symbols[production.lhs.index()].name);
    out.push_str(" →");
    if production.rhs.is_empty() {
        out.push_str(" ε");
    }
    for &symbol in &production.rhs {
        out.push(' ');
        let info = &symbols[symbol.index()];
        if info.kind == SymbolKind::Terminal && info.is_literal {
            out.push('\'');
            out.push_str(&info.name);
            out.push('\'');
        } else {
            out.push_str(&info.name);
        }
    }
    out
}
