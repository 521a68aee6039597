//! ranni: a grammar-driven incremental parsing library.
//!
//! A grammar is declared as data ([`grammar`]), compiled once into LR
//! parse tables and a lexer DFA ([`compile`]), and then used for any
//! number of parses ([`parse`]) and incremental reparses ([`reparse`])
//! sharing the same compiled tables.
//!
//! Parsing is lossless and total: every parse returns a concrete syntax
//! tree covering the whole input, with malformed regions represented as
//! error nodes rather than failures. After an edit, [`reparse`] rebuilds
//! only the subtrees the edit could have affected and splices the rest
//! from the previous tree.
//!
//! ```
//! use ranni::grammar::{lit, Grammar};
//!
//! let grammar = Grammar::builder("greeting")
//!     .rule("source_file", lit("hello"))
//!     .build();
//! let compiled = ranni::compile(&grammar).unwrap();
//!
//! let tree = ranni::parse(&compiled, "hello");
//! assert_eq!(tree.root().name(), "source_file");
//! assert!(!tree.has_error());
//! ```

pub mod base;
pub mod grammar;
pub mod lexer;
pub mod compile;
pub mod tree;
pub mod parser;
pub mod reparse;

pub use base::{apply_edits, Edit, LineCol, LineIndex, TextRange, TextSize};
pub use compile::{compile, CompileError, CompiledGrammar, ConflictKind, GrammarConflictError};
pub use grammar::{Grammar, GrammarBuilder, Symbol};
pub use lexer::{ExternalScanner, ScanCursor};
pub use parser::{parse, parse_with, ParseOptions};
pub use reparse::{reparse, reparse_with};
pub use tree::{
    structurally_equal, NodeKind, ParseRecoveryError, SyntaxNode, SyntaxTree,
};
