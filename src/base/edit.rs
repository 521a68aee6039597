//! Text edits
//!
//! An [`Edit`] describes a single replacement of a byte range with new text.
//! Edits are transient values: the incremental reparse manager consumes them
//! to adjust node ranges and decide which subtrees are still trustworthy.

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

/// A single text replacement: bytes `start..old_end` are replaced by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Byte offset where the replacement begins.
    pub start: TextSize,
    /// Byte offset just past the replaced span in the old text.
    pub old_end: TextSize,
    /// Replacement text.
    pub text: SmolStr,
}

impl Edit {
    /// Replace `range` in the old text with `text`.
    pub fn replace(range: TextRange, text: impl Into<SmolStr>) -> Self {
        Self {
            start: range.start(),
            old_end: range.end(),
            text: text.into(),
        }
    }

    /// Insert `text` at `offset` without removing anything.
    pub fn insert(offset: TextSize, text: impl Into<SmolStr>) -> Self {
        Self {
            start: offset,
            old_end: offset,
            text: text.into(),
        }
    }

    /// Delete the bytes in `range`.
    pub fn delete(range: TextRange) -> Self {
        Self::replace(range, "")
    }

    /// The replaced span in the old text.
    pub fn old_range(&self) -> TextRange {
        TextRange::new(self.start, self.old_end)
    }

    /// Byte offset just past the replacement in the new text.
    pub fn new_end(&self) -> TextSize {
        self.start + TextSize::of(self.text.as_str())
    }

    /// Signed length change introduced by this edit.
    pub fn delta(&self) -> i64 {
        self.text.len() as i64 - i64::from(u32::from(self.old_end - self.start))
    }

    /// Map a position in the old text to the new text.
    ///
    /// Positions inside the replaced span clamp to the end of the
    /// replacement; they belong to nodes the reparse manager will rebuild
    /// anyway, so only monotonicity matters.
    pub fn map(&self, pos: TextSize) -> TextSize {
        if pos <= self.start {
            pos
        } else if pos >= self.old_end {
            TextSize::new((u32::from(pos) as i64 + self.delta()) as u32)
        } else {
            self.new_end()
        }
    }

    /// Apply this edit to a source string, producing the new text.
    pub fn apply(&self, old: &str) -> String {
        let start = usize::from(self.start);
        let old_end = usize::from(self.old_end);
        let mut out = String::with_capacity(old.len() + self.text.len());
        out.push_str(&old[..start]);
        out.push_str(&self.text);
        out.push_str(&old[old_end..]);
        out
    }
}

/// Apply a sequence of edits in order, threading the text through each one.
///
/// Each edit's coordinates are interpreted in the text produced by the
/// previous edit, matching how the reparse manager consumes them.
pub fn apply_edits(edits: &[Edit], old: &str) -> String {
    let mut text = old.to_string();
    for edit in edits {
        text = edit.apply(&text);
    }
    text
}
