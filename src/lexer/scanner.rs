//! External scanners: pluggable context-sensitive lexing.
//!
//! Some tokens cannot be described by a regular pattern (heredocs,
//! indentation, nested comments). A grammar declares them with
//! `GrammarBuilder::external`, and the caller supplies an
//! [`ExternalScanner`] at parse time. The engine consults the scanner
//! before its own DFA whenever one of the declared tokens is valid in the
//! current parse state.

use text_size::TextSize;

use crate::grammar::Symbol;

/// Read-only cursor over the unscanned remainder of the source text.
///
/// The scanner advances the cursor over the characters it consumes; the
/// consumed span becomes the token's range.
pub struct ScanCursor<'a> {
    text: &'a str,
    start: usize,
    pos: usize,
}

impl<'a> ScanCursor<'a> {
    pub(crate) fn new(text: &'a str, offset: TextSize) -> Self {
        let start = usize::from(offset);
        Self {
            text,
            start,
            pos: start,
        }
    }

    /// The next unconsumed character, if any.
    pub fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    /// Consume and return the next character.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Absolute byte offset of the cursor.
    pub fn offset(&self) -> TextSize {
        TextSize::new(self.pos as u32)
    }

    /// Bytes consumed since the scan started.
    pub fn consumed(&self) -> usize {
        self.pos - self.start
    }

    /// The text consumed so far.
    pub fn consumed_text(&self) -> &'a str {
        &self.text[self.start..self.pos]
    }

    /// True if no input remains.
    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }
}

/// A pluggable scanner for tokens the grammar declares as external.
///
/// `valid` lists the external token symbols the parser can accept at the
/// cursor position. Return the matched symbol after advancing the cursor
/// over its text; return `None` (leaving the cursor anywhere) to fall back
/// to the built-in lexer. Zero-length matches are ignored.
pub trait ExternalScanner {
    fn scan(&mut self, cursor: &mut ScanCursor<'_>, valid: &[Symbol]) -> Option<Symbol>;
}
