//! Subset construction: the grammar's combined token NFA becomes the
//! deterministic lexer table shipped inside a `CompiledGrammar`.
//!
//! Accepting DFA states keep the full set of token symbols they accept;
//! the runtime lexer filters that set against the tokens the current parse
//! state considers valid, so one table serves every lexing context.

use rustc_hash::FxHashMap;

use crate::grammar::Symbol;

use super::nfa::Nfa;

/// One deterministic lexer state.
#[derive(Debug, Clone, Default)]
pub(crate) struct DfaState {
    /// (lo, hi, target): inclusive codepoint ranges, sorted and disjoint.
    pub ranges: Vec<(u32, u32, u32)>,
    /// Token symbols accepted in this state, ascending.
    pub accepts: Vec<Symbol>,
}

impl DfaState {
    /// Follow the transition for `ch`, if any.
    pub fn step(&self, ch: char) -> Option<u32> {
        let code = ch as u32;
        let idx = self.ranges.partition_point(|&(lo, _, _)| lo <= code);
        if idx == 0 {
            return None;
        }
        let (lo, hi, target) = self.ranges[idx - 1];
        (lo <= code && code <= hi).then_some(target)
    }
}

/// The compiled lexer automaton. State 0 is the start state.
#[derive(Debug, Clone, Default)]
pub struct LexTable {
    pub(crate) states: Vec<DfaState>,
}

impl LexTable {
    pub(crate) fn state(&self, id: u32) -> &DfaState {
        &self.states[id as usize]
    }

    /// Number of deterministic states.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }
}

/// Epsilon-closure of `seed`, returned sorted and deduplicated.
fn closure(nfa: &Nfa, seed: &[u32]) -> Vec<u32> {
    let mut stack: Vec<u32> = seed.to_vec();
    let mut seen: Vec<u32> = seed.to_vec();
    seen.sort_unstable();
    while let Some(state) = stack.pop() {
        for &next in &nfa.states[state as usize].epsilon {
            if let Err(pos) = seen.binary_search(&next) {
                seen.insert(pos, next);
                stack.push(next);
            }
        }
    }
    seen
}

/// Determinize `nfa` into a lexer table.
pub(crate) fn determinize(nfa: &Nfa) -> LexTable {
    let mut table = LexTable::default();
    let mut ids: FxHashMap<Vec<u32>, u32> = FxHashMap::default();
    let mut worklist: Vec<Vec<u32>> = Vec::new();

    let start = closure(nfa, &[0]);
    ids.insert(start.clone(), 0);
    table.states.push(accepts_of(nfa, &start));
    worklist.push(start);

    while let Some(set) = worklist.pop() {
        let id = ids[&set];
        // elementary intervals over every outgoing range of the member states
        let mut bounds: Vec<u32> = Vec::new();
        for &state in &set {
            for &(lo, hi, _) in &nfa.states[state as usize].ranges {
                bounds.push(lo);
                if hi < u32::MAX {
                    bounds.push(hi + 1);
                }
            }
        }
        bounds.sort_unstable();
        bounds.dedup();

        let mut transitions: Vec<(u32, u32, u32)> = Vec::new();
        for window in bounds.windows(2) {
            let (lo, next_lo) = (window[0], window[1]);
            let hi = next_lo - 1;
            let targets = targets_for(nfa, &set, lo, hi);
            if targets.is_empty() {
                continue;
            }
            let target_set = closure(nfa, &targets);
            let target_id = *ids.entry(target_set.clone()).or_insert_with(|| {
                let new_id = table.states.len() as u32;
                table.states.push(accepts_of(nfa, &target_set));
                worklist.push(target_set);
                new_id
            });
            // merge with the previous interval when contiguous and same target
            match transitions.last_mut() {
                Some((_, prev_hi, prev_target))
                    if *prev_target == target_id && *prev_hi + 1 == lo =>
                {
                    *prev_hi = hi;
                }
                _ => transitions.push((lo, hi, target_id)),
            }
        }
        table.states[id as usize].ranges = transitions;
    }
    table
}

fn targets_for(nfa: &Nfa, set: &[u32], lo: u32, hi: u32) -> Vec<u32> {
    let mut targets = Vec::new();
    for &state in set {
        for &(range_lo, range_hi, target) in &nfa.states[state as usize].ranges {
            if range_lo <= lo && hi <= range_hi {
                targets.push(target);
            }
        }
    }
    targets.sort_unstable();
    targets.dedup();
    targets
}

fn accepts_of(nfa: &Nfa, set: &[u32]) -> DfaState {
    let mut accepts: Vec<Symbol> = set
        .iter()
        .filter_map(|&state| nfa.states[state as usize].accept)
        .collect();
    accepts.sort_unstable();
    accepts.dedup();
    DfaState {
        ranges: Vec::new(),
        accepts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run the DFA with maximal munch, returning (symbol set, length) of the
    /// longest accepting prefix.
    fn longest_match(table: &LexTable, input: &str) -> Option<(Vec<Symbol>, usize)> {
        let mut state = 0u32;
        let mut best: Option<(Vec<Symbol>, usize)> = None;
        let mut len = 0;
        if !table.state(state).accepts.is_empty() {
            best = Some((table.state(state).accepts.clone(), 0));
        }
        for ch in input.chars() {
            match table.state(state).step(ch) {
                Some(next) => {
                    state = next;
                    len += ch.len_utf8();
                    if !table.state(state).accepts.is_empty() {
                        best = Some((table.state(state).accepts.clone(), len));
                    }
                }
                None => break,
            }
        }
        best
    }

    #[test]
    fn test_keyword_and_ident_overlap() {
        let mut nfa = Nfa::new();
        nfa.add_literal("let", Symbol(1));
        nfa.add_pattern("[a-z]+", Symbol(2)).unwrap();
        let table = determinize(&nfa);

        // "let" matches both tokens at length 3
        let (accepts, len) = longest_match(&table, "let ").unwrap();
        assert_eq!(len, 3);
        assert_eq!(accepts, vec![Symbol(1), Symbol(2)]);

        // "letter" matches only the pattern at length 6
        let (accepts, len) = longest_match(&table, "letter").unwrap();
        assert_eq!(len, 6);
        assert_eq!(accepts, vec![Symbol(2)]);
    }

    #[test]
    fn test_longest_match_backtracks() {
        let mut nfa = Nfa::new();
        nfa.add_pattern("ab", Symbol(1)).unwrap();
        nfa.add_pattern("abcd", Symbol(2)).unwrap();
        let table = determinize(&nfa);

        // "abc!" probes up to 'c' but the longest accept is "ab"
        let (accepts, len) = longest_match(&table, "abc!").unwrap();
        assert_eq!(len, 2);
        assert_eq!(accepts, vec![Symbol(1)]);

        let (accepts, len) = longest_match(&table, "abcd").unwrap();
        assert_eq!(len, 4);
        assert_eq!(accepts, vec![Symbol(2)]);
    }

    #[test]
    fn test_no_match() {
        let mut nfa = Nfa::new();
        nfa.add_literal("x", Symbol(1));
        let table = determinize(&nfa);
        assert!(longest_match(&table, "y").is_none());
    }
}
