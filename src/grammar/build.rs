//! Grammar builder
//!
//! Collects rules in declaration order. Declaration order matters twice:
//! the first rule is the default start rule, and earlier-declared rules win
//! equal-precedence reduce/reduce ties during table construction.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::{Grammar, RuleExpr};

/// Builder for [`Grammar`].
///
/// Building never fails; structural problems (duplicate names, dangling
/// references, missing start rule) surface as `CompileError`s from
/// [`crate::compile`], where the grammar author gets them all at once.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    name: SmolStr,
    rules: IndexMap<SmolStr, RuleExpr>,
    extras: Vec<RuleExpr>,
    externals: Vec<SmolStr>,
    start: Option<SmolStr>,
    duplicates: Vec<SmolStr>,
}

impl GrammarBuilder {
    pub(super) fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            rules: IndexMap::new(),
            extras: Vec::new(),
            externals: Vec::new(),
            start: None,
            duplicates: Vec::new(),
        }
    }

    /// Declare a named rule.
    pub fn rule(mut self, name: impl Into<SmolStr>, expr: RuleExpr) -> Self {
        let name = name.into();
        if self.rules.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.rules.insert(name, expr);
        }
        self
    }

    /// Declare an extra: a token silently skipped between real tokens.
    ///
    /// Must lower to a single terminal (literal or pattern).
    pub fn extra(mut self, expr: RuleExpr) -> Self {
        self.extras.push(expr);
        self
    }

    /// Declare a token produced by an external scanner.
    pub fn external(mut self, name: impl Into<SmolStr>) -> Self {
        self.externals.push(name.into());
        self
    }

    /// Override the start rule (defaults to the first declared rule).
    pub fn start(mut self, name: impl Into<SmolStr>) -> Self {
        self.start = Some(name.into());
        self
    }

    /// Finish building.
    pub fn build(self) -> Grammar {
        Grammar {
            name: self.name,
            rules: self.rules,
            extras: self.extras,
            externals: self.externals,
            start: self.start,
            duplicates: self.duplicates,
        }
    }
}
