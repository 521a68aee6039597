//! Structural grammar validation, run before any table construction.
//!
//! Catches the author errors that make compilation meaningless: no rules,
//! duplicate rule names, dangling references, a missing start rule. Pattern
//! syntax errors are caught later, when token automata are built.

use crate::compile::CompileError;

use super::{Grammar, RuleExpr};

/// Validate `grammar`, returning the first structural error found.
///
/// Reference checks walk every rule body; a name must resolve to either a
/// declared rule or a declared external token.
pub(crate) fn validate(grammar: &Grammar) -> Result<(), CompileError> {
    if grammar.rules.is_empty() {
        return Err(CompileError::EmptyGrammar(grammar.name.clone()));
    }
    if let Some(name) = grammar.duplicates.first() {
        return Err(CompileError::DuplicateRule { name: name.clone() });
    }
    if let Some(start) = &grammar.start {
        if !grammar.rules.contains_key(start) {
            return Err(CompileError::UndefinedStartRule(start.clone()));
        }
    }
    for (name, expr) in &grammar.rules {
        check_refs(grammar, name, expr)?;
    }
    for extra in &grammar.extras {
        if extra.as_terminal().is_none() {
            return Err(CompileError::InvalidExtra(format!("{extra:?}")));
        }
    }
    Ok(())
}

fn check_refs(grammar: &Grammar, rule: &str, expr: &RuleExpr) -> Result<(), CompileError> {
    match expr {
        RuleExpr::Literal(_) | RuleExpr::Pattern(_) => Ok(()),
        RuleExpr::Rule(name) => {
            if grammar.rules.contains_key(name) || grammar.externals.contains(name) {
                Ok(())
            } else {
                Err(CompileError::UndefinedRule {
                    referenced: name.clone(),
                    from: rule.into(),
                })
            }
        }
        RuleExpr::Seq(parts) | RuleExpr::Choice(parts) => {
            for part in parts {
                check_refs(grammar, rule, part)?;
            }
            Ok(())
        }
        RuleExpr::Repeat(inner)
        | RuleExpr::Repeat1(inner)
        | RuleExpr::Optional(inner)
        | RuleExpr::Prec { expr: inner, .. } => check_refs(grammar, rule, inner),
    }
}
