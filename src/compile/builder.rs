//! LR table construction.
//!
//! Builds the canonical LR(0) item-set automaton over the flattened
//! productions, then fills in SLR(1) actions: shifts from the transitions,
//! reduces on the FOLLOW set of each completed production's left-hand
//! side. Conflicting actions are resolved by declared precedence and
//! associativity; anything left unresolved aborts compilation with a
//! [`GrammarConflictError`] naming both contending productions.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::grammar::{Assoc, Symbol};

use super::error::{ConflictKind, GrammarConflictError};
use super::tables::{render_production, Action, ParseState, Production, StateId, SymbolInfo, SymbolKind};

/// An LR(0) item: a production with a dot position in its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Item {
    prod: u32,
    dot: u32,
}

impl Item {
    fn next_symbol(self, productions: &[Production]) -> Option<Symbol> {
        productions[self.prod as usize]
            .rhs
            .get(self.dot as usize)
            .copied()
    }

    fn advanced(self) -> Item {
        Item {
            prod: self.prod,
            dot: self.dot + 1,
        }
    }
}

pub(crate) fn build_states(
    symbols: &[SymbolInfo],
    productions: &[Production],
) -> Result<Vec<ParseState>, GrammarConflictError> {
    let builder = TableBuilder::new(symbols, productions);
    builder.run()
}

struct TableBuilder<'g> {
    symbols: &'g [SymbolInfo],
    productions: &'g [Production],
    prods_by_lhs: FxHashMap<Symbol, Vec<u32>>,
    follow: FxHashMap<Symbol, BTreeSet<Symbol>>,
}

impl<'g> TableBuilder<'g> {
    fn new(symbols: &'g [SymbolInfo], productions: &'g [Production]) -> Self {
        let mut prods_by_lhs: FxHashMap<Symbol, Vec<u32>> = FxHashMap::default();
        for (id, production) in productions.iter().enumerate() {
            prods_by_lhs
                .entry(production.lhs)
                .or_default()
                .push(id as u32);
        }
        let follow = follow_sets(symbols, productions);
        Self {
            symbols,
            productions,
            prods_by_lhs,
            follow,
        }
    }

    fn is_terminal(&self, symbol: Symbol) -> bool {
        self.symbols[symbol.index()].kind != SymbolKind::NonTerminal
    }

    fn run(self) -> Result<Vec<ParseState>, GrammarConflictError> {
        // item-set automaton, keyed by closed item sets
        let start = self.closure(vec![Item { prod: 0, dot: 0 }]);
        let mut state_ids: IndexMap<Vec<Item>, StateId> = IndexMap::new();
        state_ids.insert(start, 0);

        // (state, symbol) → successor, filled as states are discovered
        let mut transitions: Vec<IndexMap<Symbol, StateId>> = Vec::new();

        let mut next = 0usize;
        while next < state_ids.len() {
            let items = state_ids.get_index(next).map(|(k, _)| k.clone()).unwrap();
            let mut moves: IndexMap<Symbol, Vec<Item>> = IndexMap::new();
            for item in &items {
                if let Some(symbol) = item.next_symbol(self.productions) {
                    moves.entry(symbol).or_default().push(item.advanced());
                }
            }
            let mut outgoing = IndexMap::new();
            for (symbol, kernel) in moves {
                let closed = self.closure(kernel);
                let id = match state_ids.get(&closed) {
                    Some(&id) => id,
                    None => {
                        let id = state_ids.len() as StateId;
                        state_ids.insert(closed, id);
                        id
                    }
                };
                outgoing.insert(symbol, id);
            }
            transitions.push(outgoing);
            next += 1;
        }

        // actions and gotos
        let mut states = Vec::with_capacity(state_ids.len());
        for (id, (items, _)) in state_ids.iter().enumerate() {
            states.push(self.build_state(items, &transitions[id])?);
        }
        tracing::debug!(states = states.len(), "parse table built");
        Ok(states)
    }

    fn closure(&self, kernel: Vec<Item>) -> Vec<Item> {
        let mut set: BTreeSet<Item> = kernel.into_iter().collect();
        let mut queue: Vec<Item> = set.iter().copied().collect();
        while let Some(item) = queue.pop() {
            let Some(symbol) = item.next_symbol(self.productions) else {
                continue;
            };
            if self.is_terminal(symbol) {
                continue;
            }
            if let Some(prods) = self.prods_by_lhs.get(&symbol) {
                for &prod in prods {
                    let fresh = Item { prod, dot: 0 };
                    if set.insert(fresh) {
                        queue.push(fresh);
                    }
                }
            }
        }
        set.into_iter().collect()
    }

    fn build_state(
        &self,
        items: &[Item],
        outgoing: &IndexMap<Symbol, StateId>,
    ) -> Result<ParseState, GrammarConflictError> {
        let mut state = ParseState::default();

        // shift precedence: the strongest production still mid-parse on
        // each terminal, for shift/reduce resolution
        let mut shift_prec: FxHashMap<Symbol, (i32, u32)> = FxHashMap::default();
        for item in items {
            if let Some(symbol) = item.next_symbol(self.productions) {
                if self.is_terminal(symbol) {
                    let prec = self.productions[item.prod as usize].prec;
                    shift_prec
                        .entry(symbol)
                        .and_modify(|entry| {
                            if prec > entry.0 {
                                *entry = (prec, item.prod);
                            }
                        })
                        .or_insert((prec, item.prod));
                }
            }
        }

        for (&symbol, &target) in outgoing {
            if self.is_terminal(symbol) {
                state.actions.insert(symbol, Action::Shift(target));
            } else {
                state.gotos.insert(symbol, target);
            }
        }

        for item in items {
            if item.next_symbol(self.productions).is_some() {
                continue;
            }
            if item.prod == 0 {
                // completed augmented start
                state.actions.insert(Symbol::END, Action::Accept);
                continue;
            }
            let lhs = self.productions[item.prod as usize].lhs;
            if let Some(follow) = self.follow.get(&lhs) {
                for &lookahead in follow {
                    self.insert_reduce(&mut state, &shift_prec, lookahead, item.prod)?;
                }
            }
        }

        let mut valid_externals: Vec<Symbol> = state
            .actions
            .keys()
            .copied()
            .filter(|s| self.symbols[s.index()].kind == SymbolKind::External)
            .collect();
        valid_externals.sort_unstable();
        state.valid_externals = valid_externals;

        Ok(state)
    }

    fn insert_reduce(
        &self,
        state: &mut ParseState,
        shift_prec: &FxHashMap<Symbol, (i32, u32)>,
        lookahead: Symbol,
        prod: u32,
    ) -> Result<(), GrammarConflictError> {
        let reduce = &self.productions[prod as usize];
        match state.actions.get(&lookahead).copied() {
            None => {
                state.actions.insert(lookahead, Action::Reduce(prod));
            }
            Some(Action::Shift(_)) => {
                let (s_prec, s_prod) = shift_prec.get(&lookahead).copied().unwrap_or((0, prod));
                if reduce.prec > s_prec {
                    state.actions.insert(lookahead, Action::Reduce(prod));
                } else if reduce.prec == s_prec {
                    match reduce.assoc {
                        Assoc::Left => {
                            state.actions.insert(lookahead, Action::Reduce(prod));
                        }
                        Assoc::Right => {} // keep the shift
                        Assoc::None => {
                            return Err(self.conflict(
                                ConflictKind::ShiftReduce,
                                lookahead,
                                s_prod,
                                prod,
                            ));
                        }
                    }
                }
                // lower precedence: keep the shift
            }
            Some(Action::Reduce(existing)) => {
                let other = &self.productions[existing as usize];
                if reduce.prec > other.prec {
                    state.actions.insert(lookahead, Action::Reduce(prod));
                } else if reduce.prec == other.prec {
                    if reduce.prec == 0 && other.prec == 0 {
                        return Err(self.conflict(
                            ConflictKind::ReduceReduce,
                            lookahead,
                            existing,
                            prod,
                        ));
                    }
                    // equal declared precedence: the earlier declaration wins
                    let winner = existing.min(prod);
                    tracing::debug!(
                        lookahead = %self.symbols[lookahead.index()].name,
                        winner = %render_production(self.symbols, &self.productions[winner as usize]),
                        "reduce/reduce tie broken by declaration order"
                    );
                    state.actions.insert(lookahead, Action::Reduce(winner));
                }
            }
            Some(Action::Accept) => {
                // accepting end-of-input outranks any reduce on it
                tracing::debug!(
                    production = %render_production(self.symbols, reduce),
                    "reduce on end-of-input shadowed by accept"
                );
            }
        }
        Ok(())
    }

    fn conflict(
        &self,
        kind: ConflictKind,
        lookahead: Symbol,
        first: u32,
        second: u32,
    ) -> GrammarConflictError {
        GrammarConflictError {
            kind,
            lookahead: self.symbols[lookahead.index()].name.clone(),
            first: render_production(self.symbols, &self.productions[first as usize]),
            second: render_production(self.symbols, &self.productions[second as usize]),
        }
    }
}

// =============================================================================
// Nullable / FIRST / FOLLOW
// =============================================================================

fn follow_sets(
    symbols: &[SymbolInfo],
    productions: &[Production],
) -> FxHashMap<Symbol, BTreeSet<Symbol>> {
    let is_terminal = |s: Symbol| symbols[s.index()].kind != SymbolKind::NonTerminal;

    // nullable nonterminals
    let mut nullable: BTreeSet<Symbol> = BTreeSet::new();
    loop {
        let mut changed = false;
        for production in productions {
            if nullable.contains(&production.lhs) {
                continue;
            }
            if production
                .rhs
                .iter()
                .all(|&s| !is_terminal(s) && nullable.contains(&s))
            {
                nullable.insert(production.lhs);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // FIRST sets
    let mut first: FxHashMap<Symbol, BTreeSet<Symbol>> = FxHashMap::default();
    for (index, info) in symbols.iter().enumerate() {
        let symbol = Symbol(index as u16);
        if info.kind != SymbolKind::NonTerminal {
            first.insert(symbol, BTreeSet::from([symbol]));
        } else {
            first.insert(symbol, BTreeSet::new());
        }
    }
    loop {
        let mut changed = false;
        for production in productions {
            for &symbol in &production.rhs {
                let addition: Vec<Symbol> = first[&symbol].iter().copied().collect();
                let target = first.get_mut(&production.lhs).unwrap();
                for s in addition {
                    changed |= target.insert(s);
                }
                if is_terminal(symbol) || !nullable.contains(&symbol) {
                    break;
                }
            }
        }
        if !changed {
            break;
        }
    }

    // FOLLOW sets; the augmented start (production 0's lhs) seeds END
    let mut follow: FxHashMap<Symbol, BTreeSet<Symbol>> = FxHashMap::default();
    follow
        .entry(productions[0].lhs)
        .or_default()
        .insert(Symbol::END);
    loop {
        let mut changed = false;
        for production in productions {
            for (i, &symbol) in production.rhs.iter().enumerate() {
                if is_terminal(symbol) {
                    continue;
                }
                let mut tail_nullable = true;
                let mut addition: BTreeSet<Symbol> = BTreeSet::new();
                for &rest in &production.rhs[i + 1..] {
                    addition.extend(first[&rest].iter().copied());
                    if is_terminal(rest) || !nullable.contains(&rest) {
                        tail_nullable = false;
                        break;
                    }
                }
                if tail_nullable {
                    if let Some(lhs_follow) = follow.get(&production.lhs) {
                        addition.extend(lhs_follow.iter().copied());
                    }
                }
                let target = follow.entry(symbol).or_default();
                for s in addition {
                    changed |= target.insert(s);
                }
            }
        }
        if !changed {
            break;
        }
    }
    follow
}
