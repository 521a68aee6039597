//! Grammar compilation: validation, table construction, and conflict
//! reporting.

mod helpers;

use ranni::grammar::{choice, lit, pattern, prec_left, seq, sym, Grammar};
use ranni::{compile, CompileError, ConflictKind};

#[test]
fn test_compile_produces_tables() {
    let compiled = helpers::calc();
    assert_eq!(compiled.name(), "calc");
    assert!(compiled.state_count() > 1);
    assert_eq!(compiled.symbol_name(compiled.start_symbol()), "expr");
    assert!(compiled.symbol_named("number").is_some());
    assert!(compiled.symbol_named("nope").is_none());
}

#[test]
fn test_empty_grammar_is_rejected() {
    let g = Grammar::builder("void").build();
    assert!(matches!(
        compile(&g).unwrap_err(),
        CompileError::EmptyGrammar(_)
    ));
}

#[test]
fn test_duplicate_rule_is_rejected() {
    let g = Grammar::builder("t")
        .rule("a", lit("x"))
        .rule("a", lit("y"))
        .build();
    let err = compile(&g).unwrap_err();
    match err {
        CompileError::DuplicateRule { name } => assert_eq!(name, "a"),
        other => panic!("expected DuplicateRule, got {other}"),
    }
}

#[test]
fn test_undefined_reference_is_rejected() {
    let g = Grammar::builder("t")
        .rule("file", seq(vec![sym("thing"), lit(";")]))
        .build();
    let err = compile(&g).unwrap_err();
    match err {
        CompileError::UndefinedRule { referenced, from } => {
            assert_eq!(referenced, "thing");
            assert_eq!(from, "file");
        }
        other => panic!("expected UndefinedRule, got {other}"),
    }
}

#[test]
fn test_undefined_start_rule_is_rejected() {
    let g = Grammar::builder("t")
        .rule("file", lit("x"))
        .start("main")
        .build();
    assert!(matches!(
        compile(&g).unwrap_err(),
        CompileError::UndefinedStartRule(_)
    ));
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let g = Grammar::builder("t")
        .rule("file", seq(vec![pattern("[a-")]))
        .build();
    match compile(&g).unwrap_err() {
        CompileError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "[a-"),
        other => panic!("expected InvalidPattern, got {other}"),
    }
}

#[test]
fn test_composite_extra_is_rejected() {
    let g = Grammar::builder("t")
        .rule("file", lit("x"))
        .extra(seq(vec![lit("/*"), lit("*/")]))
        .build();
    assert!(matches!(
        compile(&g).unwrap_err(),
        CompileError::InvalidExtra(_)
    ));
}

#[test]
fn test_ambiguous_operator_reports_shift_reduce() {
    let g = Grammar::builder("t")
        .rule(
            "expr",
            choice(vec![
                seq(vec![sym("expr"), lit("+"), sym("expr")]),
                sym("number"),
            ]),
        )
        .rule("number", pattern("[0-9]+"))
        .build();
    let err = compile(&g).unwrap_err();
    let CompileError::Conflict(conflict) = err else {
        panic!("expected a conflict");
    };
    assert_eq!(conflict.kind, ConflictKind::ShiftReduce);
    assert_eq!(conflict.lookahead, "+");
    let message = conflict.to_string();
    assert!(message.contains("shift/reduce"), "{message}");
    assert!(message.contains("expr → expr '+' expr"), "{message}");
    assert!(message.contains("precedence or associativity"), "{message}");
}

#[test]
fn test_overlapping_alternatives_report_reduce_reduce() {
    let g = Grammar::builder("t")
        .rule("file", choice(vec![sym("a"), sym("b")]))
        .rule("a", seq(vec![lit("x")]))
        .rule("b", seq(vec![lit("x")]))
        .build();
    let err = compile(&g).unwrap_err();
    let CompileError::Conflict(conflict) = err else {
        panic!("expected a conflict");
    };
    assert_eq!(conflict.kind, ConflictKind::ReduceReduce);
}

#[test]
fn test_associativity_resolves_the_operator_grammar() {
    // same grammar as the shift/reduce case, fixed with prec_left
    let g = Grammar::builder("t")
        .rule(
            "expr",
            choice(vec![
                prec_left(1, seq(vec![sym("expr"), lit("+"), sym("expr")])),
                sym("number"),
            ]),
        )
        .rule("number", pattern("[0-9]+"))
        .build();
    assert!(compile(&g).is_ok());
}

#[test]
fn test_compiled_grammar_is_reusable_across_parses() {
    let grammar = helpers::list();
    let a = ranni::parse(&grammar, "aa;");
    let b = ranni::parse(&grammar, "bb; cc;");
    assert!(!a.has_error());
    assert!(!b.has_error());
    assert_eq!(a.root().child_count(), 1);
    assert_eq!(b.root().child_count(), 2);
}
