//! Parser engine behavior: tree shapes, precedence, recovery, and
//! cancellation.

mod helpers;

use text_size::{TextRange, TextSize};

use ranni::tree::NodeKind;
use ranni::{parse, parse_with, ParseOptions, ParseRecoveryError};

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(TextSize::new(start), TextSize::new(end))
}

#[test]
fn test_single_token_file() {
    let grammar = helpers::greeting();
    let tree = parse(&grammar, "hello");

    let root = tree.root();
    assert_eq!(root.name(), "source_file");
    assert_eq!(root.kind(), NodeKind::Node);
    assert_eq!(root.range(), range(0, 5));
    assert_eq!(root.child_count(), 0);
    assert!(!tree.has_error());
    assert!(tree.errors().is_empty());
    assert_eq!(tree.to_sexp(), "(source_file)");
}

#[test]
fn test_unlexable_input_collapses_to_one_error() {
    let grammar = helpers::greeting();
    let tree = parse(&grammar, "goodbye");

    let root = tree.root();
    assert!(root.is_error());
    assert_eq!(root.range(), range(0, 7));
    assert_eq!(root.child_count(), 0);
    assert!(tree.has_error());
    assert_eq!(
        tree.errors(),
        [ParseRecoveryError::UnrecognizedText { range: range(0, 7) }]
    );
}

#[test]
fn test_precedence_shapes_the_tree() {
    let grammar = helpers::calc();
    let tree = parse(&grammar, "1+2*3");
    assert!(!tree.has_error());
    // multiplication binds tighter: 1 + (2 * 3)
    assert_eq!(
        tree.to_sexp(),
        "(expr (expr (number)) (expr (expr (number)) (expr (number))))"
    );
}

#[test]
fn test_left_associativity() {
    let grammar = helpers::calc();
    let tree = parse(&grammar, "1+2+3");
    assert!(!tree.has_error());
    // (1 + 2) + 3
    assert_eq!(
        tree.to_sexp(),
        "(expr (expr (expr (number)) (expr (number))) (expr (number)))"
    );
}

#[test]
fn test_parentheses_override_precedence() {
    let grammar = helpers::calc();
    let grouped = parse(&grammar, "(1+2)*3");
    let flat = parse(&grammar, "1+2*3");
    assert!(!grouped.has_error());
    assert_ne!(grouped.to_sexp(), flat.to_sexp());
}

#[test]
fn test_extras_are_skipped_but_covered() {
    let grammar = helpers::list();
    let tree = parse(&grammar, " aa; bb; ");

    let root = tree.root();
    assert!(!tree.has_error());
    assert_eq!(root.range(), range(0, 9));
    assert_eq!(root.child_count(), 2);
    assert_eq!(root.child(0).unwrap().range(), range(1, 4));
    assert_eq!(root.child(0).unwrap().text(), "aa;");
    assert_eq!(root.child(1).unwrap().range(), range(5, 8));
}

#[test]
fn test_empty_input_still_yields_a_root() {
    let grammar = helpers::list();
    let tree = parse(&grammar, "");

    let root = tree.root();
    assert_eq!(root.name(), "file");
    assert_eq!(root.range(), range(0, 0));
    assert_eq!(root.child_count(), 0);
    assert!(!tree.has_error());
}

#[test]
fn test_unexpected_token_is_skipped_into_an_error_node() {
    let grammar = helpers::calc();
    let tree = parse(&grammar, "1 + + 2");

    assert!(tree.has_error());
    assert_eq!(
        tree.errors(),
        [ParseRecoveryError::UnexpectedToken {
            token: "+".into(),
            range: range(4, 5),
        }]
    );
    // the parse still recovers the surrounding addition
    assert!(tree.to_sexp().contains("(ERROR)"), "{}", tree.to_sexp());
    assert_eq!(tree.root().range(), range(0, 7));
}

#[test]
fn test_truncated_input_reports_eof() {
    let grammar = helpers::calc();
    let tree = parse(&grammar, "1+");

    assert!(tree.has_error());
    assert_eq!(
        tree.errors().last(),
        Some(&ParseRecoveryError::UnexpectedEof {
            offset: TextSize::new(2)
        })
    );
    assert_eq!(tree.root().range(), range(0, 2));
}

#[test]
fn test_trailing_garbage_becomes_a_sibling_error() {
    let grammar = helpers::greeting();
    let tree = parse(&grammar, "hello!");

    let root = tree.root();
    assert!(tree.has_error());
    assert_eq!(root.range(), range(0, 6));
    assert_eq!(root.child_count(), 2);
    assert!(!root.child(0).unwrap().is_error());
    assert!(root.child(1).unwrap().is_error());
}

#[test]
fn test_node_navigation() {
    let grammar = helpers::list();
    let tree = parse(&grammar, "aa; bb;");

    let root = tree.root();
    let second = root.child(1).unwrap();
    assert_eq!(second.parent().unwrap().id(), root.id());
    assert_eq!(root.node_at(TextSize::new(5)).name(), "word");
    let words: Vec<&str> = root
        .children()
        .map(|entry| entry.child(0).unwrap().text())
        .collect();
    assert_eq!(words, ["aa", "bb"]);
}

#[test]
fn test_token_budget_cancels_the_parse() {
    let grammar = helpers::calc();
    let tree = parse_with(
        &grammar,
        "1+2+3+4",
        ParseOptions {
            token_budget: Some(2),
            ..ParseOptions::default()
        },
    );

    assert!(tree.was_cancelled());
    // the tree still covers the whole source, with the unparsed suffix
    // under an error node
    let root = tree.root();
    assert_eq!(root.range(), range(0, 7));
    let tail = root.child(root.child_count() - 1).unwrap();
    assert!(tail.is_error());
    assert_eq!(tail.range().end(), TextSize::new(7));
}

#[test]
fn test_uncancelled_parse_is_not_marked() {
    let grammar = helpers::calc();
    let tree = parse_with(
        &grammar,
        "1+2",
        ParseOptions {
            token_budget: Some(1000),
            ..ParseOptions::default()
        },
    );
    assert!(!tree.was_cancelled());
    assert!(!tree.has_error());
}
