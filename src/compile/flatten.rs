//! Grammar lowering.
//!
//! Turns the nested [`RuleExpr`] trees into a flat production list over
//! numbered symbols, the form the LR construction works on:
//!
//! - literals and patterns intern into a deduplicated terminal alphabet;
//! - a named rule whose whole body is one terminal becomes a *named
//!   token* (a visible leaf node) rather than a nonterminal;
//! - `Repeat`/`Repeat1` lower to left-recursive hidden helper rules, so
//!   repetition parses in constant stack;
//! - `Optional` and nested `Choice`/`Seq` lower to hidden helper rules;
//! - production 0 is the augmented start `__start → start`.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::grammar::{Assoc, Grammar, RuleExpr, Symbol};

use super::error::CompileError;
use super::tables::{Production, SymbolInfo, SymbolKind};

/// How a terminal's automaton is built.
#[derive(Debug, Clone)]
pub(crate) enum TokenSource {
    Literal(SmolStr),
    Pattern(SmolStr),
}

/// The lowered grammar handed to the LR and lexer table builders.
#[derive(Debug)]
pub(crate) struct FlatGrammar {
    pub symbols: Vec<SymbolInfo>,
    pub productions: Vec<Production>,
    pub token_sources: Vec<(Symbol, TokenSource)>,
    pub extras: Vec<Symbol>,
    pub start_symbol: Symbol,
}

pub(crate) fn flatten(grammar: &Grammar) -> Result<FlatGrammar, CompileError> {
    Flattener::new(grammar).run()
}

struct Flattener<'g> {
    grammar: &'g Grammar,
    symbols: Vec<SymbolInfo>,
    productions: Vec<Production>,
    token_sources: Vec<(Symbol, TokenSource)>,
    literal_ids: FxHashMap<SmolStr, Symbol>,
    pattern_ids: FxHashMap<SmolStr, Symbol>,
    rule_ids: FxHashMap<SmolStr, Symbol>,
    helper_count: u32,
}

impl<'g> Flattener<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            symbols: vec![SymbolInfo {
                name: "end".into(),
                kind: SymbolKind::Terminal,
                visible: false,
                token_prec: 0,
                is_literal: false,
            }],
            productions: Vec::new(),
            token_sources: Vec::new(),
            literal_ids: FxHashMap::default(),
            pattern_ids: FxHashMap::default(),
            rule_ids: FxHashMap::default(),
            helper_count: 0,
        }
    }

    fn add_symbol(&mut self, info: SymbolInfo) -> Result<Symbol, CompileError> {
        // symbol ids are u16, with the top value reserved for Symbol::ERROR
        if self.symbols.len() >= usize::from(u16::MAX) {
            return Err(CompileError::TooManySymbols {
                limit: u32::from(u16::MAX),
            });
        }
        let symbol = Symbol(self.symbols.len() as u16);
        self.symbols.push(info);
        Ok(symbol)
    }

    fn run(mut self) -> Result<FlatGrammar, CompileError> {
        // validated by the caller, so the unwrap below cannot fire
        let start_name = SmolStr::new(self.grammar.start_rule().expect("validated grammar"));

        // external tokens
        for name in &self.grammar.externals {
            let symbol = self.add_symbol(SymbolInfo {
                name: name.clone(),
                kind: SymbolKind::External,
                visible: !Grammar::is_hidden(name),
                token_prec: 0,
                is_literal: false,
            })?;
            self.rule_ids.insert(name.clone(), symbol);
        }

        // named token rules: whole body is one terminal. The start rule is
        // always a nonterminal so the parse has at least one production.
        for (name, expr) in &self.grammar.rules {
            if *name == start_name {
                continue;
            }
            if let Some((terminal, token_prec)) = expr.as_terminal() {
                let (source, is_literal) = match terminal {
                    RuleExpr::Literal(text) => (TokenSource::Literal(text.clone()), true),
                    RuleExpr::Pattern(text) => (TokenSource::Pattern(text.clone()), false),
                    _ => unreachable!("as_terminal returns only tokens"),
                };
                let symbol = self.add_symbol(SymbolInfo {
                    name: name.clone(),
                    kind: SymbolKind::Terminal,
                    visible: !Grammar::is_hidden(name),
                    token_prec,
                    is_literal,
                })?;
                self.token_sources.push((symbol, source.clone()));
                self.rule_ids.insert(name.clone(), symbol);
                // inline uses of the same text resolve to the named token
                match source {
                    TokenSource::Literal(text) => {
                        self.literal_ids.insert(text, symbol);
                    }
                    TokenSource::Pattern(text) => {
                        self.pattern_ids.insert(text, symbol);
                    }
                }
            }
        }

        // nonterminal ids, in declaration order
        for (name, _) in &self.grammar.rules {
            if self.rule_ids.contains_key(name) && *name != start_name {
                continue; // token rule or shadowed external
            }
            let symbol = self.add_symbol(SymbolInfo {
                name: name.clone(),
                kind: SymbolKind::NonTerminal,
                visible: !Grammar::is_hidden(name),
                token_prec: 0,
                is_literal: false,
            })?;
            self.rule_ids.insert(name.clone(), symbol);
        }

        let start_symbol = self.rule_ids[&start_name];

        // extras
        let mut extras = Vec::with_capacity(self.grammar.extras.len());
        for extra in &self.grammar.extras {
            let (terminal, token_prec) = extra
                .as_terminal()
                .ok_or_else(|| CompileError::InvalidExtra(format!("{extra:?}")))?;
            let symbol = self.intern_terminal(terminal, token_prec)?;
            extras.push(symbol);
        }

        // augmented start: production 0
        let augmented = self.add_symbol(SymbolInfo {
            name: "__start".into(),
            kind: SymbolKind::NonTerminal,
            visible: false,
            token_prec: 0,
            is_literal: false,
        })?;
        self.productions.push(Production {
            lhs: augmented,
            rhs: vec![start_symbol],
            prec: 0,
            assoc: Assoc::None,
        });

        // expand every nonterminal rule
        for (name, expr) in &self.grammar.rules {
            let lhs = self.rule_ids[name];
            if self.symbols[lhs.index()].kind != SymbolKind::NonTerminal {
                continue; // token rule
            }
            self.expand_rule(lhs, expr)?;
        }

        Ok(FlatGrammar {
            symbols: self.symbols,
            productions: self.productions,
            token_sources: self.token_sources,
            extras,
            start_symbol,
        })
    }

    /// Expand a rule body into productions for `lhs`, one per top-level
    /// choice branch. A `Prec` wrapping the whole body applies to every
    /// branch; a branch-level `Prec` overrides it.
    fn expand_rule(&mut self, lhs: Symbol, expr: &RuleExpr) -> Result<(), CompileError> {
        let (default_prec, default_assoc, body) = strip_prec(expr, 0, Assoc::None);
        let branches: Vec<&RuleExpr> = match body {
            RuleExpr::Choice(branches) => branches.iter().collect(),
            other => vec![other],
        };
        for branch in branches {
            let (prec, assoc, body) = strip_prec(branch, default_prec, default_assoc);
            let rhs = self.sequence_atoms(body)?;
            self.productions.push(Production {
                lhs,
                rhs,
                prec,
                assoc,
            });
        }
        Ok(())
    }

    /// Lower a branch body to a symbol string.
    fn sequence_atoms(&mut self, body: &RuleExpr) -> Result<Vec<Symbol>, CompileError> {
        match body {
            RuleExpr::Seq(parts) => parts.iter().map(|part| self.atom(part)).collect(),
            other => Ok(vec![self.atom(other)?]),
        }
    }

    /// Lower one expression to a single symbol, creating hidden helper
    /// nonterminals where the expression is composite.
    fn atom(&mut self, expr: &RuleExpr) -> Result<Symbol, CompileError> {
        match expr {
            RuleExpr::Literal(_) | RuleExpr::Pattern(_) => self.intern_terminal(expr, 0),
            RuleExpr::Prec { value, expr, .. } => match expr.as_ref() {
                t @ (RuleExpr::Literal(_) | RuleExpr::Pattern(_)) => {
                    self.intern_terminal(t, *value)
                }
                // precedence is meaningful on branches and tokens only
                inner => self.atom(inner),
            },
            RuleExpr::Rule(name) => Ok(self.rule_ids[name]),
            RuleExpr::Seq(_) => {
                let helper = self.helper("seq")?;
                let rhs = self.sequence_atoms(expr)?;
                self.productions.push(Production {
                    lhs: helper,
                    rhs,
                    prec: 0,
                    assoc: Assoc::None,
                });
                Ok(helper)
            }
            RuleExpr::Choice(_) => {
                let helper = self.helper("choice")?;
                self.expand_rule(helper, expr)?;
                Ok(helper)
            }
            RuleExpr::Repeat(inner) => {
                let helper = self.helper("repeat")?;
                let element = self.atom(inner)?;
                self.productions.push(Production {
                    lhs: helper,
                    rhs: vec![],
                    prec: 0,
                    assoc: Assoc::None,
                });
                self.productions.push(Production {
                    lhs: helper,
                    rhs: vec![helper, element],
                    prec: 0,
                    assoc: Assoc::None,
                });
                Ok(helper)
            }
            RuleExpr::Repeat1(inner) => {
                let helper = self.helper("repeat1")?;
                let element = self.atom(inner)?;
                self.productions.push(Production {
                    lhs: helper,
                    rhs: vec![element],
                    prec: 0,
                    assoc: Assoc::None,
                });
                self.productions.push(Production {
                    lhs: helper,
                    rhs: vec![helper, element],
                    prec: 0,
                    assoc: Assoc::None,
                });
                Ok(helper)
            }
            RuleExpr::Optional(inner) => {
                let helper = self.helper("optional")?;
                let element = self.atom(inner)?;
                self.productions.push(Production {
                    lhs: helper,
                    rhs: vec![],
                    prec: 0,
                    assoc: Assoc::None,
                });
                self.productions.push(Production {
                    lhs: helper,
                    rhs: vec![element],
                    prec: 0,
                    assoc: Assoc::None,
                });
                Ok(helper)
            }
        }
    }

    fn helper(&mut self, kind: &str) -> Result<Symbol, CompileError> {
        self.helper_count += 1;
        let name = SmolStr::new(format!("_{kind}{}", self.helper_count));
        self.add_symbol(SymbolInfo {
            name,
            kind: SymbolKind::NonTerminal,
            visible: false,
            token_prec: 0,
            is_literal: false,
        })
    }

    /// Intern an inline terminal, deduplicating by text. Anonymous tokens
    /// are named by their text, like tree nodes for punctuation.
    fn intern_terminal(
        &mut self,
        terminal: &RuleExpr,
        token_prec: i32,
    ) -> Result<Symbol, CompileError> {
        match terminal {
            RuleExpr::Literal(text) => {
                if let Some(&symbol) = self.literal_ids.get(text) {
                    return Ok(symbol);
                }
                let symbol = self.add_symbol(SymbolInfo {
                    name: text.clone(),
                    kind: SymbolKind::Terminal,
                    visible: false,
                    token_prec,
                    is_literal: true,
                })?;
                self.token_sources
                    .push((symbol, TokenSource::Literal(text.clone())));
                self.literal_ids.insert(text.clone(), symbol);
                Ok(symbol)
            }
            RuleExpr::Pattern(text) => {
                if let Some(&symbol) = self.pattern_ids.get(text) {
                    return Ok(symbol);
                }
                let symbol = self.add_symbol(SymbolInfo {
                    name: text.clone(),
                    kind: SymbolKind::Terminal,
                    visible: false,
                    token_prec,
                    is_literal: false,
                })?;
                self.token_sources
                    .push((symbol, TokenSource::Pattern(text.clone())));
                self.pattern_ids.insert(text.clone(), symbol);
                Ok(symbol)
            }
            _ => unreachable!("intern_terminal is only called with tokens"),
        }
    }
}

/// Peel a `Prec` wrapper, falling back to the given defaults.
fn strip_prec<'e>(
    expr: &'e RuleExpr,
    default_prec: i32,
    default_assoc: Assoc,
) -> (i32, Assoc, &'e RuleExpr) {
    match expr {
        RuleExpr::Prec { value, assoc, expr } => (*value, *assoc, expr.as_ref()),
        other => (default_prec, default_assoc, other),
    }
}
