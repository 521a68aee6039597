//! Lexing behavior observed through parse trees: token selection,
//! keyword/identifier overlap, and external scanners.

mod helpers;

use ranni::grammar::{lit, pattern, seq, sym, Grammar, Symbol};
use ranni::{parse, parse_with, ExternalScanner, ParseOptions, ScanCursor};

#[test]
fn test_keyword_beats_identifier_at_equal_length() {
    let grammar = helpers::decls();
    let tree = parse(&grammar, "let mut ab = 7;");
    assert!(!tree.has_error(), "{:?}", tree.errors());
    assert_eq!(tree.to_sexp(), "(file (decl (ident) (number)))");
}

#[test]
fn test_longer_identifier_beats_keyword_prefix() {
    let grammar = helpers::decls();
    // "mutx" must lex as one identifier, not "mut" + junk
    let tree = parse(&grammar, "let mutx = 7;");
    assert!(!tree.has_error(), "{:?}", tree.errors());

    let decl = tree.root().child(0).unwrap();
    let ident = decl.child(0).unwrap();
    assert_eq!(ident.name(), "ident");
    assert_eq!(ident.text(), "mutx");
}

#[test]
fn test_maximal_munch_on_numbers() {
    let grammar = helpers::calc();
    let tree = parse(&grammar, "12+345");
    assert!(!tree.has_error());

    let root = tree.root();
    assert_eq!(root.child(0).unwrap().text(), "12");
    assert_eq!(root.child(1).unwrap().text(), "345");
}

#[test]
fn test_token_text_is_not_split_across_extras() {
    let grammar = helpers::list();
    let tree = parse(&grammar, "abc ;");
    assert!(!tree.has_error());
    let word = tree.root().child(0).unwrap().child(0).unwrap();
    assert_eq!(word.text(), "abc");
}

// =============================================================================
// External scanners
// =============================================================================

fn raw_grammar() -> ranni::CompiledGrammar {
    let g = Grammar::builder("raw")
        .rule("file", seq(vec![lit("["), sym("raw"), lit("]")]))
        .external("raw")
        .build();
    ranni::compile(&g).unwrap()
}

/// Consumes everything up to the closing bracket.
struct RawScanner;

impl ExternalScanner for RawScanner {
    fn scan(&mut self, cursor: &mut ScanCursor<'_>, valid: &[Symbol]) -> Option<Symbol> {
        let symbol = *valid.first()?;
        while let Some(ch) = cursor.peek() {
            if ch == ']' {
                break;
            }
            cursor.advance();
        }
        (cursor.consumed() > 0).then_some(symbol)
    }
}

#[test]
fn test_external_scanner_supplies_tokens() {
    let grammar = raw_grammar();
    let mut scanner = RawScanner;
    let tree = parse_with(
        &grammar,
        "[anything *!* goes]",
        ParseOptions {
            scanner: Some(&mut scanner),
            ..ParseOptions::default()
        },
    );

    assert!(!tree.has_error(), "{:?}", tree.errors());
    assert_eq!(tree.to_sexp(), "(file (raw))");
    let raw = tree.root().child(0).unwrap();
    assert_eq!(raw.text(), "anything *!* goes");
}

#[test]
fn test_external_token_without_scanner_degrades_to_error() {
    let grammar = raw_grammar();
    let tree = parse(&grammar, "[stuff]");
    assert!(tree.has_error());
}

#[test]
fn test_scanner_is_only_consulted_where_valid() {
    // the scanner would consume greedily, but outside the brackets the
    // parse states never list the external token as valid
    let grammar = raw_grammar();
    let mut scanner = RawScanner;
    let tree = parse_with(
        &grammar,
        "[a]",
        ParseOptions {
            scanner: Some(&mut scanner),
            ..ParseOptions::default()
        },
    );
    assert!(!tree.has_error(), "{:?}", tree.errors());
    assert_eq!(tree.root().child(0).unwrap().text(), "a");
}
