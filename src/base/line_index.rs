//! Byte offset to line/column conversion
//!
//! Recovered-span diagnostics are reported as byte ranges; editors want
//! line/column pairs. [`LineIndex`] is built once per source text and
//! answers conversions in O(log lines).

use text_size::TextSize;

/// A 0-indexed line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Maps byte offsets to line/column positions for one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset of the start of each line. Always starts with 0.
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    /// Build an index for `text`.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::new(0)];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(TextSize::new(i as u32 + 1));
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset into a line/column pair.
    ///
    /// Offsets past the end of a line clamp to that line; columns are byte
    /// columns, not display columns.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let start = self.line_starts[line];
        LineCol {
            line: line as u32,
            col: u32::from(offset - start),
        }
    }

    /// Byte offset of the start of `line`, if it exists.
    pub fn line_start(&self, line: u32) -> Option<TextSize> {
        self.line_starts.get(line as usize).copied()
    }

    /// Number of lines in the indexed text.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let index = LineIndex::new("hello");
        assert_eq!(index.line_count(), 1);
        assert_eq!(
            index.line_col(TextSize::new(3)),
            LineCol { line: 0, col: 3 }
        );
    }

    #[test]
    fn test_multi_line() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_count(), 4);
        assert_eq!(
            index.line_col(TextSize::new(0)),
            LineCol { line: 0, col: 0 }
        );
        assert_eq!(
            index.line_col(TextSize::new(3)),
            LineCol { line: 1, col: 0 }
        );
        assert_eq!(
            index.line_col(TextSize::new(6)),
            LineCol { line: 2, col: 0 }
        );
        assert_eq!(
            index.line_col(TextSize::new(8)),
            LineCol { line: 3, col: 1 }
        );
        assert_eq!(index.line_start(1), Some(TextSize::new(3)));
        assert_eq!(index.line_start(9), None);
    }
}
