//! Grammar compiler.
//!
//! Turns a [`Grammar`] into an immutable [`CompiledGrammar`] holding the
//! SLR(1) parse table and the lexer DFA. Compilation is the only phase
//! that can fail for grammar reasons; every later phase degrades into
//! error nodes on the parse tree instead.
//!
//! The pipeline: validate the rule graph, flatten nested rule expressions
//! into numbered productions, build the lexer automaton from the interned
//! token alphabet, then build the parse states.

mod builder;
mod error;
pub(crate) mod flatten;
mod tables;

pub use error::{CompileError, ConflictKind, GrammarConflictError};
pub use tables::CompiledGrammar;

pub(crate) use tables::{Action, ParseState, StateId};

use crate::grammar::{validate, Grammar};
use crate::lexer::{dfa, nfa::Nfa};

/// Compile `grammar` into parse and lexer tables.
///
/// Fails on structural problems (duplicate or undefined rules, invalid
/// token patterns, non-token extras) and on parse-table conflicts that
/// precedence and associativity declarations leave unresolved.
pub fn compile(grammar: &Grammar) -> Result<CompiledGrammar, CompileError> {
    validate::validate(grammar)?;
    let flat = flatten::flatten(grammar)?;

    let mut nfa = Nfa::new();
    for (symbol, source) in &flat.token_sources {
        match source {
            flatten::TokenSource::Literal(text) => nfa.add_literal(text, *symbol),
            flatten::TokenSource::Pattern(pattern) => nfa.add_pattern(pattern, *symbol)?,
        }
    }
    let lex = dfa::determinize(&nfa);

    let states = builder::build_states(&flat.symbols, &flat.productions)?;

    tracing::debug!(
        grammar = %grammar.name(),
        symbols = flat.symbols.len(),
        productions = flat.productions.len(),
        states = states.len(),
        lex_states = lex.state_count(),
        "grammar compiled"
    );

    Ok(CompiledGrammar {
        name: grammar.name().into(),
        symbols: flat.symbols,
        productions: flat.productions,
        states,
        lex,
        extras: flat.extras,
        start_symbol: flat.start_symbol,
    })
}
