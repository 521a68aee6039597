//! Foundation types for the ranni engine.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`Edit`] - A single text replacement, consumed by incremental reparse
//! - [`LineCol`], [`LineIndex`] - Byte offset to line/column conversion
//!
//! This module has NO dependencies on other ranni modules.

mod edit;
mod line_index;

pub use edit::{Edit, apply_edits};
pub use line_index::{LineCol, LineIndex};

pub use text_size::{TextRange, TextSize};

// Re-export the text-size crate for callers that need its traits
pub use text_size;
