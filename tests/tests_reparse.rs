//! Incremental reparsing: equivalence with from-scratch parses, edit
//! plumbing, and cancelled-tree fallback.

mod helpers;

use rstest::rstest;
use text_size::{TextRange, TextSize};

use ranni::{
    apply_edits, parse, parse_with, reparse, structurally_equal, Edit, ParseOptions,
};

fn edit(start: u32, old_end: u32, replacement: &str) -> Edit {
    Edit::replace(
        TextRange::new(TextSize::new(start), TextSize::new(old_end)),
        replacement,
    )
}

/// The central property: an incremental reparse must be structurally
/// indistinguishable from parsing the edited text from scratch.
#[rstest]
#[case::replace_word("aa; bb; cc;", 4, 6, "xyz")]
#[case::extend_word("aa; bb; cc;", 5, 5, "bbb")]
#[case::shrink_word("aa; bbbb; cc;", 5, 8, "")]
#[case::insert_entry_mid("aa; cc;", 4, 4, "bb; ")]
#[case::append_entry("aa;", 3, 3, " zz;")]
#[case::delete_first_entry("aa; bb; cc;", 0, 4, "")]
#[case::delete_last_entry("aa; bb; cc;", 7, 11, "")]
#[case::break_an_entry("aa; bb; cc;", 6, 7, "")]
#[case::fix_an_error("aa; bb cc;", 6, 6, ";")]
#[case::replace_everything("aa; bb;", 0, 7, "zz;")]
#[case::clear_everything("aa; bb;", 0, 7, "")]
#[case::edit_at_start("aa; bb;", 0, 0, "x")]
fn test_reparse_equals_scratch(
    #[case] text: &str,
    #[case] start: u32,
    #[case] old_end: u32,
    #[case] replacement: &str,
) {
    let grammar = helpers::list();
    let old = parse(&grammar, text);
    let change = edit(start, old_end, replacement);
    let new_text = apply_edits(std::slice::from_ref(&change), text);

    let incremental = reparse(&grammar, &old, std::slice::from_ref(&change), &new_text);
    let scratch = parse(&grammar, &new_text);

    assert_eq!(incremental.text(), new_text);
    assert!(
        structurally_equal(&incremental, &scratch),
        "incremental {} vs scratch {}",
        incremental.to_sexp(),
        scratch.to_sexp()
    );
    assert_eq!(incremental.errors(), scratch.errors());
}

#[rstest]
#[case::deepen_precedence("1+2*3", 5, 5, "*4")]
#[case::change_operator("1+2*3", 1, 2, "*")]
#[case::raise_operator_precedence("1 + 2 + 3", 6, 7, "*")]
#[case::lower_operator_precedence("1 * 2 * 3", 6, 7, "+")]
#[case::wrap_in_parens("1+2", 0, 0, "(")]
fn test_reparse_equals_scratch_for_expressions(
    #[case] text: &str,
    #[case] start: u32,
    #[case] old_end: u32,
    #[case] replacement: &str,
) {
    let grammar = helpers::calc();
    let old = parse(&grammar, text);
    let change = edit(start, old_end, replacement);
    let new_text = apply_edits(std::slice::from_ref(&change), text);

    let incremental = reparse(&grammar, &old, std::slice::from_ref(&change), &new_text);
    let scratch = parse(&grammar, &new_text);
    assert!(
        structurally_equal(&incremental, &scratch),
        "incremental {} vs scratch {}",
        incremental.to_sexp(),
        scratch.to_sexp()
    );
}

/// Changing an operator changes how the table resolves the reduce left
/// of it, even across whitespace: `1 + 2` must stop being a unit when
/// the `+` after it becomes a `*`.
#[test]
fn test_operator_edit_invalidates_the_subtree_left_of_it() {
    let grammar = helpers::calc();
    let old = parse(&grammar, "1 + 2 + 3");
    let change = edit(6, 7, "*");

    let incremental = reparse(&grammar, &old, std::slice::from_ref(&change), "1 + 2 * 3");
    assert_eq!(
        incremental.to_sexp(),
        "(expr (expr (number)) (expr (expr (number)) (expr (number))))"
    );
}

#[test]
fn test_sequential_edits_thread_coordinates() {
    let grammar = helpers::list();
    let old = parse(&grammar, "aa; bb;");
    // insert at the front, then edit in post-insertion coordinates
    let edits = vec![edit(0, 0, "zz; "), edit(8, 10, "xx")];
    let new_text = apply_edits(&edits, "aa; bb;");
    assert_eq!(new_text, "zz; aa; xx;");

    let incremental = reparse(&grammar, &old, &edits, &new_text);
    let scratch = parse(&grammar, &new_text);
    assert!(structurally_equal(&incremental, &scratch));
}

#[test]
fn test_empty_edit_list_reproduces_the_tree() {
    let grammar = helpers::list();
    let old = parse(&grammar, "aa; bb;");
    let again = reparse(&grammar, &old, &[], "aa; bb;");
    assert!(structurally_equal(&old, &again));
    assert_eq!(again.text(), old.text());
}

#[test]
fn test_untouched_subtrees_keep_their_shape() {
    let grammar = helpers::list();
    let old = parse(&grammar, "aa; bb; cc; dd;");
    let change = edit(8, 10, "xx");
    let incremental = reparse(&grammar, &old, std::slice::from_ref(&change), "aa; bb; xx; dd;");

    let root = incremental.root();
    assert_eq!(root.child_count(), 4);
    assert_eq!(root.child(0).unwrap().text(), "aa;");
    assert_eq!(root.child(2).unwrap().text(), "xx;");
    assert_eq!(root.child(3).unwrap().text(), "dd;");
}

#[test]
fn test_cancelled_tree_falls_back_to_full_parse() {
    let grammar = helpers::list();
    let cancelled = parse_with(
        &grammar,
        "aa; bb; cc;",
        ParseOptions {
            token_budget: Some(2),
            ..ParseOptions::default()
        },
    );
    assert!(cancelled.was_cancelled());

    let change = edit(4, 6, "xx");
    let recovered = reparse(&grammar, &cancelled, std::slice::from_ref(&change), "aa; xx; cc;");
    assert!(!recovered.was_cancelled());

    let scratch = parse(&grammar, "aa; xx; cc;");
    assert!(structurally_equal(&recovered, &scratch));
}

#[test]
fn test_reparse_of_error_tree_can_heal() {
    let grammar = helpers::greeting();
    let broken = parse(&grammar, "goodbye");
    assert!(broken.has_error());

    let change = edit(0, 7, "hello");
    let healed = reparse(&grammar, &broken, std::slice::from_ref(&change), "hello");
    assert!(!healed.has_error());
    assert_eq!(healed.to_sexp(), "(source_file)");
}
