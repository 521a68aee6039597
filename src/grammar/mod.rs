//! Grammar model: the declarative rule graph consumed by the compiler.
//!
//! A [`Grammar`] is an ordered map of named rules over [`RuleExpr`] trees,
//! plus extras (tokens skipped between real tokens, e.g. whitespace) and
//! declared external-scanner tokens. The model is plain data: all analysis
//! happens in [`crate::compile`].
//!
//! Rule expressions are built with the free constructors in this module so
//! grammar definitions read declaratively:
//!
//! ```
//! use ranni::grammar::{Grammar, lit, pattern, prec_left, seq, sym, choice};
//!
//! let g = Grammar::builder("calc")
//!     .rule("expr", choice(vec![
//!         prec_left(1, seq(vec![sym("expr"), lit("+"), sym("expr")])),
//!         prec_left(2, seq(vec![sym("expr"), lit("*"), sym("expr")])),
//!         sym("number"),
//!     ]))
//!     .rule("number", pattern(r"[0-9]+"))
//!     .extra(pattern(r"[ \t\r\n]+"))
//!     .build();
//! ```

mod build;
pub(crate) mod validate;

pub use build::GrammarBuilder;

use indexmap::IndexMap;
use smol_str::SmolStr;

/// A symbol identifier, unique within one compiled grammar.
///
/// Terminals and nonterminals share a single id space; the compiled
/// grammar's symbol table records which is which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(pub(crate) u16);

impl Symbol {
    /// The end-of-input pseudo-terminal.
    pub const END: Symbol = Symbol(0);

    /// Sentinel for error nodes; never appears in grammar tables.
    pub const ERROR: Symbol = Symbol(u16::MAX);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Associativity hint attached to a precedence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assoc {
    /// No associativity declared; equal-precedence conflicts are fatal.
    #[default]
    None,
    /// Left-associative: equal-precedence shift/reduce resolves to reduce.
    Left,
    /// Right-associative: equal-precedence shift/reduce resolves to shift.
    Right,
}

/// A rule body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleExpr {
    /// An anonymous token matching exactly this text (keyword, operator).
    Literal(SmolStr),
    /// An anonymous token matching a regex-subset pattern.
    Pattern(SmolStr),
    /// A reference to a named rule or a declared external token.
    Rule(SmolStr),
    /// All parts in order.
    Seq(Vec<RuleExpr>),
    /// Exactly one of the branches.
    Choice(Vec<RuleExpr>),
    /// Zero or more repetitions.
    Repeat(Box<RuleExpr>),
    /// One or more repetitions.
    Repeat1(Box<RuleExpr>),
    /// Zero or one occurrence.
    Optional(Box<RuleExpr>),
    /// Precedence/associativity wrapper around one choice branch or token.
    Prec {
        value: i32,
        assoc: Assoc,
        expr: Box<RuleExpr>,
    },
}

impl RuleExpr {
    /// True if this expression is a bare terminal, possibly prec-wrapped.
    /// Rules with such bodies compile to named tokens (visible leaf nodes).
    pub(crate) fn as_terminal(&self) -> Option<(&RuleExpr, i32)> {
        match self {
            RuleExpr::Literal(_) | RuleExpr::Pattern(_) => Some((self, 0)),
            RuleExpr::Prec { value, expr, .. } => match expr.as_ref() {
                t @ (RuleExpr::Literal(_) | RuleExpr::Pattern(_)) => Some((t, *value)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// An in-memory grammar: the input to [`crate::compile`].
///
/// Immutable once built; compilation never mutates it.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) name: SmolStr,
    pub(crate) rules: IndexMap<SmolStr, RuleExpr>,
    pub(crate) extras: Vec<RuleExpr>,
    pub(crate) externals: Vec<SmolStr>,
    pub(crate) start: Option<SmolStr>,
    /// Rule names declared more than once; rejected at compile time.
    pub(crate) duplicates: Vec<SmolStr>,
}

impl Grammar {
    /// Start building a grammar named `name`.
    pub fn builder(name: impl Into<SmolStr>) -> GrammarBuilder {
        GrammarBuilder::new(name)
    }

    /// The grammar's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The start rule: explicitly set, or the first declared rule.
    pub fn start_rule(&self) -> Option<&str> {
        match &self.start {
            Some(name) => Some(name),
            None => self.rules.keys().next().map(|s| s.as_str()),
        }
    }

    /// Number of declared rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// True if `name` is a hidden rule (produces no tree node).
    pub(crate) fn is_hidden(name: &str) -> bool {
        name.starts_with('_')
    }
}

// =============================================================================
// Rule expression constructors
// =============================================================================

/// An anonymous token matching exactly `text`.
pub fn lit(text: impl Into<SmolStr>) -> RuleExpr {
    RuleExpr::Literal(text.into())
}

/// An anonymous token matching a regex-subset `pattern`.
pub fn pattern(pattern: impl Into<SmolStr>) -> RuleExpr {
    RuleExpr::Pattern(pattern.into())
}

/// A reference to the rule or external token named `name`.
pub fn sym(name: impl Into<SmolStr>) -> RuleExpr {
    RuleExpr::Rule(name.into())
}

/// All `parts` in order.
pub fn seq(parts: Vec<RuleExpr>) -> RuleExpr {
    RuleExpr::Seq(parts)
}

/// Exactly one of `branches`.
pub fn choice(branches: Vec<RuleExpr>) -> RuleExpr {
    RuleExpr::Choice(branches)
}

/// Zero or more repetitions of `expr`.
pub fn repeat(expr: RuleExpr) -> RuleExpr {
    RuleExpr::Repeat(Box::new(expr))
}

/// One or more repetitions of `expr`.
pub fn repeat1(expr: RuleExpr) -> RuleExpr {
    RuleExpr::Repeat1(Box::new(expr))
}

/// Zero or one occurrence of `expr`.
pub fn optional(expr: RuleExpr) -> RuleExpr {
    RuleExpr::Optional(Box::new(expr))
}

/// Precedence `value` with no associativity.
pub fn prec(value: i32, expr: RuleExpr) -> RuleExpr {
    RuleExpr::Prec {
        value,
        assoc: Assoc::None,
        expr: Box::new(expr),
    }
}

/// Left-associative precedence `value`.
pub fn prec_left(value: i32, expr: RuleExpr) -> RuleExpr {
    RuleExpr::Prec {
        value,
        assoc: Assoc::Left,
        expr: Box::new(expr),
    }
}

/// Right-associative precedence `value`.
pub fn prec_right(value: i32, expr: RuleExpr) -> RuleExpr {
    RuleExpr::Prec {
        value,
        assoc: Assoc::Right,
        expr: Box::new(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_declaration_order() {
        let g = Grammar::builder("t")
            .rule("b", lit("b"))
            .rule("a", lit("a"))
            .build();
        let names: Vec<_> = g.rules.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(g.start_rule(), Some("b"));
    }

    #[test]
    fn test_explicit_start_rule() {
        let g = Grammar::builder("t")
            .rule("helper", lit("x"))
            .rule("main", sym("helper"))
            .start("main")
            .build();
        assert_eq!(g.start_rule(), Some("main"));
    }

    #[test]
    fn test_terminal_rule_detection() {
        assert!(lit("if").as_terminal().is_some());
        assert!(pattern("[0-9]+").as_terminal().is_some());
        assert!(prec(3, lit("*")).as_terminal().is_some());
        assert!(seq(vec![lit("a"), lit("b")]).as_terminal().is_none());
        assert!(sym("other").as_terminal().is_none());
    }

    #[test]
    fn test_hidden_rule_names() {
        assert!(Grammar::is_hidden("_expr_list"));
        assert!(!Grammar::is_hidden("expr"));
    }
}
