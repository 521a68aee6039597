//! Shared grammars for the integration tests.
#![allow(dead_code)] // not every test binary uses every grammar

use ranni::grammar::{
    choice, lit, optional, pattern, prec_left, repeat, seq, sym, Grammar,
};
use ranni::CompiledGrammar;

/// `source_file` matching exactly "hello".
pub fn greeting() -> CompiledGrammar {
    let g = Grammar::builder("greeting")
        .rule("source_file", lit("hello"))
        .build();
    ranni::compile(&g).unwrap()
}

/// Arithmetic with left-associative `+` and tighter `*`, parentheses,
/// and whitespace extras.
pub fn calc() -> CompiledGrammar {
    let g = Grammar::builder("calc")
        .rule(
            "expr",
            choice(vec![
                prec_left(1, seq(vec![sym("expr"), lit("+"), sym("expr")])),
                prec_left(2, seq(vec![sym("expr"), lit("*"), sym("expr")])),
                seq(vec![lit("("), sym("expr"), lit(")")]),
                sym("number"),
            ]),
        )
        .rule("number", pattern("[0-9]+"))
        .extra(pattern(r"[ \t\n]+"))
        .build();
    ranni::compile(&g).unwrap()
}

/// A flat list of `word ;` entries, whitespace-separated.
pub fn list() -> CompiledGrammar {
    let g = Grammar::builder("list")
        .rule("file", repeat(sym("entry")))
        .rule("entry", seq(vec![sym("word"), lit(";")]))
        .rule("word", pattern("[a-z]+"))
        .extra(pattern(r"[ \n]+"))
        .build();
    ranni::compile(&g).unwrap()
}

/// Declarations with a `let` keyword that collides with the identifier
/// pattern, plus an optional mutability marker.
pub fn decls() -> CompiledGrammar {
    let g = Grammar::builder("decls")
        .rule("file", repeat(sym("decl")))
        .rule(
            "decl",
            seq(vec![
                lit("let"),
                optional(lit("mut")),
                sym("ident"),
                lit("="),
                sym("number"),
                lit(";"),
            ]),
        )
        .rule("ident", pattern("[a-z][a-z0-9]*"))
        .rule("number", pattern("[0-9]+"))
        .extra(pattern(r"[ \n]+"))
        .build();
    ranni::compile(&g).unwrap()
}
