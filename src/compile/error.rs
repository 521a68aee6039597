//! Compile-time errors surfaced to the grammar author.
//!
//! Only these abort compilation; everything at parse time degrades into
//! error nodes on the tree instead.

use smol_str::SmolStr;
use thiserror::Error;

/// A grammar failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("grammar `{0}` declares no rules")]
    EmptyGrammar(SmolStr),

    #[error("rule `{name}` is declared more than once")]
    DuplicateRule { name: SmolStr },

    #[error("rule `{referenced}` is referenced from `{from}` but never declared")]
    UndefinedRule { referenced: SmolStr, from: SmolStr },

    #[error("start rule `{0}` is not declared")]
    UndefinedStartRule(SmolStr),

    #[error("invalid token pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: SmolStr, reason: String },

    #[error("extras must be single tokens, found {0}")]
    InvalidExtra(String),

    #[error("grammar needs more than {limit} symbols")]
    TooManySymbols { limit: u32 },

    #[error(transparent)]
    Conflict(#[from] GrammarConflictError),
}

/// Which table cell two actions collided in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::ShiftReduce => write!(f, "shift/reduce"),
            ConflictKind::ReduceReduce => write!(f, "reduce/reduce"),
        }
    }
}

/// Two rules contend for the same parse action with equal precedence and
/// no associativity hint to break the tie.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "unresolvable {kind} conflict on `{lookahead}` between\n    {first}\nand\n    {second}\n\
     declare precedence or associativity to disambiguate"
)]
pub struct GrammarConflictError {
    /// Conflict flavor.
    pub kind: ConflictKind,
    /// The lookahead token the actions collide on.
    pub lookahead: SmolStr,
    /// Rendered form of the first contending production.
    pub first: String,
    /// Rendered form of the second contending production.
    pub second: String,
}
