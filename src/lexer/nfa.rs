//! Thompson construction of token automata.
//!
//! Every literal and pattern terminal in the grammar compiles into one
//! shared NFA; [`super::dfa`] then determinizes it into the lexer table.
//! Patterns use a regex subset: literal characters, `.`, escapes
//! (`\d \w \s` and their negations, `\n \t \r \0`, escaped punctuation),
//! character classes with ranges and negation, grouping, alternation, and
//! the `*` `+` `?` quantifiers.

use smol_str::SmolStr;

use crate::compile::CompileError;
use crate::grammar::Symbol;

pub(crate) const MAX_CHAR: u32 = 0x10FFFF;

/// One NFA state: epsilon moves plus codepoint-range transitions.
#[derive(Debug, Default, Clone)]
pub(crate) struct NfaState {
    pub epsilon: Vec<u32>,
    /// (lo, hi, target) with inclusive codepoint bounds.
    pub ranges: Vec<(u32, u32, u32)>,
    pub accept: Option<Symbol>,
}

/// The combined NFA over all of a grammar's tokens. State 0 is the start.
#[derive(Debug, Default)]
pub(crate) struct Nfa {
    pub states: Vec<NfaState>,
}

/// A sub-automaton under construction: entry state and exit state.
/// The exit state has no outgoing edges until the fragment is linked.
#[derive(Debug, Clone, Copy)]
struct Fragment {
    start: u32,
    end: u32,
}

impl Nfa {
    pub fn new() -> Self {
        Self {
            states: vec![NfaState::default()],
        }
    }

    fn add_state(&mut self) -> u32 {
        self.states.push(NfaState::default());
        (self.states.len() - 1) as u32
    }

    fn eps(&mut self, from: u32, to: u32) {
        self.states[from as usize].epsilon.push(to);
    }

    fn range(&mut self, from: u32, lo: u32, hi: u32, to: u32) {
        self.states[from as usize].ranges.push((lo, hi, to));
    }

    /// Add a token matching exactly `text`, accepting as `symbol`.
    pub fn add_literal(&mut self, text: &str, symbol: Symbol) {
        let start = self.add_state();
        let mut current = start;
        for ch in text.chars() {
            let next = self.add_state();
            self.range(current, ch as u32, ch as u32, next);
            current = next;
        }
        self.states[current as usize].accept = Some(symbol);
        self.eps(0, start);
    }

    /// Add a token matching `pattern`, accepting as `symbol`.
    pub fn add_pattern(&mut self, pattern: &str, symbol: Symbol) -> Result<(), CompileError> {
        let fragment = PatternParser::new(self, pattern).parse()?;
        self.states[fragment.end as usize].accept = Some(symbol);
        let start = fragment.start;
        self.eps(0, start);
        Ok(())
    }
}

/// Recursive-descent parser over the pattern syntax, emitting NFA fragments.
struct PatternParser<'a> {
    nfa: &'a mut Nfa,
    pattern: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> PatternParser<'a> {
    fn new(nfa: &'a mut Nfa, pattern: &'a str) -> Self {
        Self {
            nfa,
            pattern,
            chars: pattern.chars().peekable(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> CompileError {
        CompileError::InvalidPattern {
            pattern: SmolStr::new(self.pattern),
            reason: reason.into(),
        }
    }

    fn parse(mut self) -> Result<Fragment, CompileError> {
        let fragment = self.alternation()?;
        if self.chars.peek().is_some() {
            return Err(self.error("unbalanced ')'"));
        }
        Ok(fragment)
    }

    /// alternation := concat ('|' concat)*
    fn alternation(&mut self) -> Result<Fragment, CompileError> {
        let mut branches = vec![self.concat()?];
        while self.chars.peek() == Some(&'|') {
            self.chars.next();
            branches.push(self.concat()?);
        }
        if branches.len() == 1 {
            return Ok(branches[0]);
        }
        let start = self.nfa.add_state();
        let end = self.nfa.add_state();
        for branch in branches {
            self.nfa.eps(start, branch.start);
            self.nfa.eps(branch.end, end);
        }
        Ok(Fragment { start, end })
    }

    /// concat := quantified*
    fn concat(&mut self) -> Result<Fragment, CompileError> {
        let start = self.nfa.add_state();
        let mut current = start;
        while let Some(&ch) = self.chars.peek() {
            if ch == '|' || ch == ')' {
                break;
            }
            let piece = self.quantified()?;
            self.nfa.eps(current, piece.start);
            current = piece.end;
        }
        Ok(Fragment {
            start,
            end: current,
        })
    }

    /// quantified := atom ('*' | '+' | '?')?
    fn quantified(&mut self) -> Result<Fragment, CompileError> {
        let atom = self.atom()?;
        match self.chars.peek() {
            Some('*') => {
                self.chars.next();
                let start = self.nfa.add_state();
                let end = self.nfa.add_state();
                self.nfa.eps(start, atom.start);
                self.nfa.eps(start, end);
                self.nfa.eps(atom.end, atom.start);
                self.nfa.eps(atom.end, end);
                Ok(Fragment { start, end })
            }
            Some('+') => {
                self.chars.next();
                let end = self.nfa.add_state();
                self.nfa.eps(atom.end, atom.start);
                self.nfa.eps(atom.end, end);
                Ok(Fragment {
                    start: atom.start,
                    end,
                })
            }
            Some('?') => {
                self.chars.next();
                let start = self.nfa.add_state();
                let end = self.nfa.add_state();
                self.nfa.eps(start, atom.start);
                self.nfa.eps(start, end);
                self.nfa.eps(atom.end, end);
                Ok(Fragment { start, end })
            }
            _ => Ok(atom),
        }
    }

    /// atom := '(' alternation ')' | '[' class ']' | '.' | escape | char
    fn atom(&mut self) -> Result<Fragment, CompileError> {
        let ch = match self.chars.next() {
            Some(ch) => ch,
            None => return Err(self.error("unexpected end of pattern")),
        };
        match ch {
            '(' => {
                let inner = self.alternation()?;
                if self.chars.next() != Some(')') {
                    return Err(self.error("unbalanced '('"));
                }
                Ok(inner)
            }
            '[' => {
                let ranges = self.char_class()?;
                Ok(self.ranges_fragment(&ranges))
            }
            '.' => {
                // any char except newline
                let ranges = complement(&[(b'\n' as u32, b'\n' as u32)]);
                Ok(self.ranges_fragment(&ranges))
            }
            '\\' => {
                let ranges = self.escape()?;
                Ok(self.ranges_fragment(&ranges))
            }
            '*' | '+' | '?' => Err(self.error(format!("dangling quantifier '{ch}'"))),
            _ => Ok(self.ranges_fragment(&[(ch as u32, ch as u32)])),
        }
    }

    fn ranges_fragment(&mut self, ranges: &[(u32, u32)]) -> Fragment {
        let start = self.nfa.add_state();
        let end = self.nfa.add_state();
        for &(lo, hi) in ranges {
            self.nfa.range(start, lo, hi, end);
        }
        Fragment { start, end }
    }

    /// Parse an escape, returning the codepoint ranges it denotes.
    fn escape(&mut self) -> Result<Vec<(u32, u32)>, CompileError> {
        let ch = match self.chars.next() {
            Some(ch) => ch,
            None => return Err(self.error("trailing backslash")),
        };
        Ok(match ch {
            'd' => vec![(b'0' as u32, b'9' as u32)],
            'D' => complement(&[(b'0' as u32, b'9' as u32)]),
            'w' => word_ranges(),
            'W' => complement(&word_ranges()),
            's' => space_ranges(),
            'S' => complement(&space_ranges()),
            'n' => vec![(b'\n' as u32, b'\n' as u32)],
            't' => vec![(b'\t' as u32, b'\t' as u32)],
            'r' => vec![(b'\r' as u32, b'\r' as u32)],
            '0' => vec![(0, 0)],
            // any other escaped char stands for itself
            _ => vec![(ch as u32, ch as u32)],
        })
    }

    /// class := '^'? item+ where item := char | char '-' char | escape
    fn char_class(&mut self) -> Result<Vec<(u32, u32)>, CompileError> {
        let negated = if self.chars.peek() == Some(&'^') {
            self.chars.next();
            true
        } else {
            false
        };
        let mut ranges: Vec<(u32, u32)> = Vec::new();
        loop {
            let ch = match self.chars.next() {
                Some(']') => break,
                Some(ch) => ch,
                None => return Err(self.error("unbalanced '['")),
            };
            if ch == '\\' {
                ranges.extend(self.escape()?);
                continue;
            }
            // range like a-z, unless '-' is the last class member
            if self.chars.peek() == Some(&'-') {
                let mut lookahead = self.chars.clone();
                lookahead.next();
                match lookahead.peek() {
                    Some(&']') | None => {}
                    Some(&hi) => {
                        self.chars.next();
                        self.chars.next();
                        if (hi as u32) < (ch as u32) {
                            return Err(self.error(format!("invalid range '{ch}-{hi}'")));
                        }
                        ranges.push((ch as u32, hi as u32));
                        continue;
                    }
                }
            }
            ranges.push((ch as u32, ch as u32));
        }
        if ranges.is_empty() {
            return Err(self.error("empty character class"));
        }
        let ranges = normalize(ranges);
        Ok(if negated { complement(&ranges) } else { ranges })
    }
}

fn word_ranges() -> Vec<(u32, u32)> {
    vec![
        (b'0' as u32, b'9' as u32),
        (b'A' as u32, b'Z' as u32),
        (b'_' as u32, b'_' as u32),
        (b'a' as u32, b'z' as u32),
    ]
}

fn space_ranges() -> Vec<(u32, u32)> {
    vec![
        (b'\t' as u32, b'\r' as u32), // \t \n \x0B \x0C \r
        (b' ' as u32, b' ' as u32),
    ]
}

/// Sort and merge overlapping or adjacent ranges.
fn normalize(mut ranges: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    ranges.sort_unstable();
    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match merged.last_mut() {
            Some((_, prev_hi)) if lo <= prev_hi.saturating_add(1) => {
                *prev_hi = (*prev_hi).max(hi);
            }
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Complement of `ranges` over the full codepoint space.
fn complement(ranges: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let ranges = normalize(ranges.to_vec());
    let mut out = Vec::with_capacity(ranges.len() + 1);
    let mut next = 0u32;
    for &(lo, hi) in &ranges {
        if lo > next {
            out.push((next, lo - 1));
        }
        next = hi.saturating_add(1);
    }
    if next <= MAX_CHAR {
        out.push((next, MAX_CHAR));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_nfa(pattern: &str) -> Result<Nfa, CompileError> {
        let mut nfa = Nfa::new();
        nfa.add_pattern(pattern, Symbol(1))?;
        Ok(nfa)
    }

    #[test]
    fn test_literal_chain() {
        let mut nfa = Nfa::new();
        nfa.add_literal("if", Symbol(1));
        // start + 3 chain states
        assert_eq!(nfa.states.len(), 4);
        assert_eq!(nfa.states[3].accept, Some(Symbol(1)));
    }

    #[test]
    fn test_pattern_accepts() {
        assert!(pattern_nfa(r"[a-z_][a-z0-9_]*").is_ok());
        assert!(pattern_nfa(r"-?\d[_\d]*").is_ok());
        assert!(pattern_nfa(r"(ab|cd)+ef?").is_ok());
        assert!(pattern_nfa(r"[^\n]").is_ok());
    }

    #[test]
    fn test_pattern_errors() {
        assert!(matches!(
            pattern_nfa("(ab"),
            Err(CompileError::InvalidPattern { .. })
        ));
        assert!(matches!(
            pattern_nfa("[abc"),
            Err(CompileError::InvalidPattern { .. })
        ));
        assert!(matches!(
            pattern_nfa("*a"),
            Err(CompileError::InvalidPattern { .. })
        ));
        assert!(matches!(
            pattern_nfa("[z-a]"),
            Err(CompileError::InvalidPattern { .. })
        ));
        assert!(matches!(
            pattern_nfa("ab\\"),
            Err(CompileError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_normalize_and_complement() {
        assert_eq!(normalize(vec![(5, 9), (1, 3), (4, 6)]), vec![(1, 9)]);
        let comp = complement(&[(10, 20)]);
        assert_eq!(comp, vec![(0, 9), (21, MAX_CHAR)]);
    }
}
