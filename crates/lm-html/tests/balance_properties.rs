//! Property tests for the tag-balance validator.

use lm_core::EditorError;
use lm_html::check_balance;
use lm_html::validate;
use proptest::prelude::*;

const NAMES: &[&str] = &["div", "span", "b", "i", "em", "section", "p", "a"];

fn tag_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(NAMES)
}

/// Balanced markup nested at most `depth` levels, with text and void tags sprinkled in.
fn balanced(depth: u32) -> BoxedStrategy<String> {
    let leaf = prop_oneof![
        "[a-z ]{0,6}",
        Just("<br>".to_owned()),
        Just("<img src=\"x.png\"/>".to_owned()),
        Just("<!-- note -->".to_owned()),
    ];
    leaf.prop_recursive(depth, 32, 4, |inner| {
        (tag_name(), prop::collection::vec(inner, 0..4)).prop_map(|(name, children)| {
            format!("<{name}>{}</{name}>", children.concat())
        })
    })
    .boxed()
}

proptest! {
    #[test]
    fn text_without_angle_brackets_is_valid(text in "[^<>]{0,64}") {
        prop_assert!(validate(&text).valid);
    }

    #[test]
    fn validator_is_total(text in ".{0,64}") {
        let result = validate(&text);
        prop_assert_eq!(result.valid, result.error.is_none());
    }

    #[test]
    fn balanced_sequences_are_valid(markup in balanced(4)) {
        prop_assert!(check_balance(&markup).is_ok(), "rejected {}", markup);
    }

    #[test]
    fn injected_unmatched_close_is_named(markup in balanced(3), name in tag_name()) {
        let broken = format!("{markup}</{name}>");
        prop_assert_eq!(
            check_balance(&broken),
            Err(EditorError::UnmatchedClosing { tag: name.to_owned() })
        );
    }

    #[test]
    fn injected_unclosed_open_is_named(markup in balanced(3), name in tag_name()) {
        let broken = format!("{markup}<{name}>");
        prop_assert_eq!(
            check_balance(&broken),
            Err(EditorError::UnclosedTags { tags: vec![name.to_owned()] })
        );
    }
}
