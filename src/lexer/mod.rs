//! Runtime lexer
//!
//! Drives the compiled DFA against the source text with maximal-munch
//! semantics. Tokenization is parse-state directed: only tokens the
//! current state can act on (plus extras) are eligible, which is what lets
//! one grammar use the same spelling for, say, a keyword and an
//! identifier in different contexts.
//!
//! Selection among simultaneous matches: longest match first, then
//! explicitly declared token precedence, then literals over patterns
//! (declared keywords beat the identifier pattern at equal length), then
//! declaration order.

pub(crate) mod dfa;
pub(crate) mod nfa;
mod scanner;

pub use dfa::LexTable;
pub use scanner::{ExternalScanner, ScanCursor};

use text_size::{TextRange, TextSize};

use crate::compile::{CompiledGrammar, ParseState};
use crate::grammar::Symbol;

/// A lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub symbol: Symbol,
    pub range: TextRange,
    /// Byte offset just past the furthest character the lexer examined
    /// while deciding this token. Reuse bookkeeping needs it: an edit
    /// inside the probed span can change the decision.
    pub probe_end: TextSize,
}

/// Outcome of one lexing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lexed {
    Token(Token),
    /// No token matched; `range` spans the merged run of unrecognized
    /// characters up to the next lexable position.
    Unrecognized { range: TextRange },
    /// End of input (after trailing extras), at `offset`.
    End { offset: TextSize },
}

pub(crate) struct Lexer<'a> {
    text: &'a str,
    grammar: &'a CompiledGrammar,
}

impl<'a> Lexer<'a> {
    pub fn new(grammar: &'a CompiledGrammar, text: &'a str) -> Self {
        Self { text, grammar }
    }

    fn len(&self) -> TextSize {
        TextSize::of(self.text)
    }

    /// Lex the next token at `pos` for `state`, skipping extras.
    pub fn next(
        &self,
        pos: TextSize,
        state: &ParseState,
        scanner: &mut Option<&mut dyn ExternalScanner>,
    ) -> Lexed {
        let mut pos = pos;
        loop {
            // external tokens outrank the built-in automaton
            if !state.valid_externals.is_empty() {
                if let Some(scanner) = scanner.as_deref_mut() {
                    let mut cursor = ScanCursor::new(self.text, pos);
                    if let Some(symbol) = scanner.scan(&mut cursor, &state.valid_externals) {
                        if cursor.consumed() > 0 {
                            let probe_end = if cursor.at_end() {
                                cursor.offset() + TextSize::new(1)
                            } else {
                                cursor.offset()
                            };
                            return Lexed::Token(Token {
                                symbol,
                                range: TextRange::new(pos, cursor.offset()),
                                probe_end,
                            });
                        }
                    }
                }
            }

            if pos >= self.len() {
                return Lexed::End { offset: pos };
            }

            let scan = self.scan_at(pos);
            if let Some((symbol, end)) = self.select(&scan.candidates, |s| {
                state.actions.contains_key(&s)
            }) {
                return Lexed::Token(Token {
                    symbol,
                    range: TextRange::new(pos, end),
                    probe_end: scan.probe_end.max(end),
                });
            }
            if let Some((_, end)) = self.select(&scan.candidates, |s| {
                self.grammar.extras.contains(&s)
            }) {
                if end > pos {
                    pos = end;
                    continue;
                }
            }
            return self.unrecognized(pos, state);
        }
    }

    /// Merge a run of unrecognized characters into one error span,
    /// resynchronizing at the first position where any valid token or
    /// extra matches again.
    fn unrecognized(&self, start: TextSize, state: &ParseState) -> Lexed {
        let mut end = self.next_char_boundary(start);
        while end < self.len() {
            let scan = self.scan_at(end);
            let resync = scan.candidates.iter().any(|&(s, token_end)| {
                token_end > end
                    && (state.actions.contains_key(&s) || self.grammar.extras.contains(&s))
            });
            if resync {
                break;
            }
            end = self.next_char_boundary(end);
        }
        Lexed::Unrecognized {
            range: TextRange::new(start, end),
        }
    }

    fn next_char_boundary(&self, pos: TextSize) -> TextSize {
        match self.text[usize::from(pos)..].chars().next() {
            Some(ch) => pos + TextSize::of(ch),
            None => pos,
        }
    }

    /// Run the DFA from `pos`, recording the longest accepting end per
    /// token symbol and the furthest probed offset.
    fn scan_at(&self, pos: TextSize) -> Scan {
        let table = &self.grammar.lex;
        let mut state = 0u32;
        let mut offset = usize::from(pos);
        let mut candidates: Vec<(Symbol, TextSize)> = Vec::new();
        let mut probe_end = pos;

        loop {
            for &symbol in &table.state(state).accepts {
                let end = TextSize::new(offset as u32);
                if end > pos {
                    match candidates.iter_mut().find(|(s, _)| *s == symbol) {
                        Some((_, e)) => *e = end,
                        None => candidates.push((symbol, end)),
                    }
                }
            }
            let ch = match self.text[offset..].chars().next() {
                Some(ch) => ch,
                None => {
                    // probing end-of-input counts as one byte past it, so
                    // appending text invalidates tokens lexed up to the end
                    probe_end = self.len() + TextSize::new(1);
                    break;
                }
            };
            match table.state(state).step(ch) {
                Some(next) => {
                    state = next;
                    offset += ch.len_utf8();
                    probe_end = TextSize::new(offset as u32);
                }
                None => {
                    probe_end = TextSize::new((offset + ch.len_utf8()) as u32);
                    break;
                }
            }
        }
        Scan {
            candidates,
            probe_end,
        }
    }

    /// Pick the best candidate among those passing `eligible`.
    fn select(
        &self,
        candidates: &[(Symbol, TextSize)],
        eligible: impl Fn(Symbol) -> bool,
    ) -> Option<(Symbol, TextSize)> {
        let mut best: Option<(Symbol, TextSize)> = None;
        for &(symbol, end) in candidates {
            if !eligible(symbol) {
                continue;
            }
            best = Some(match best {
                None => (symbol, end),
                Some(current) => {
                    if self.beats((symbol, end), current) {
                        (symbol, end)
                    } else {
                        current
                    }
                }
            });
        }
        best
    }

    fn beats(&self, a: (Symbol, TextSize), b: (Symbol, TextSize)) -> bool {
        let g = self.grammar;
        let key = |(s, end): (Symbol, TextSize)| {
            (
                end,
                g.token_prec(s),
                g.token_is_literal(s),
                std::cmp::Reverse(s),
            )
        };
        key(a) > key(b)
    }
}

struct Scan {
    candidates: Vec<(Symbol, TextSize)>,
    probe_end: TextSize,
}
