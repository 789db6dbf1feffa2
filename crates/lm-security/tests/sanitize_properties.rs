//! Idempotence and coverage properties of the fragment sanitizer.

use lm_dom::NodeId;
use lm_html::HtmlParser;
use lm_html::MarkupParser;
use lm_security::SanitizePolicy;
use proptest::prelude::*;

const TAGS: &[&str] = &["a", "b", "span", "div"];

fn attribute() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(" onclick=\"x()\"".to_owned()),
        Just(" ONMOUSEOVER='y'".to_owned()),
        Just(" href=\"javascript:alert(1)\"".to_owned()),
        Just(" href=\"https://x\"".to_owned()),
        Just(" class=\"note\"".to_owned()),
        Just(" title=\"online\"".to_owned()),
    ]
}

fn element() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        "[a-z ]{0,5}",
        Just("<script>alert(1)</script>".to_owned()),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        (
            prop::sample::select(TAGS),
            prop::collection::vec(attribute(), 0..3),
            prop::collection::vec(inner, 0..3),
        )
            .prop_map(|(tag, attrs, children)| {
                format!("<{tag}{}>{}</{tag}>", attrs.concat(), children.concat())
            })
    })
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(markup in element()) {
        let Ok(mut tree) = HtmlParser::lenient().parse_fragment(&markup) else {
            return Err(TestCaseError::fail("lenient parse failed"));
        };
        let policy = SanitizePolicy::default();

        policy.sanitize(&mut tree, NodeId::ROOT);
        let once = tree.inner_html(NodeId::ROOT);
        let report = policy.sanitize_with_report(&mut tree, NodeId::ROOT);
        let twice = tree.inner_html(NodeId::ROOT);

        prop_assert_eq!(&once, &twice);
        prop_assert!(report.is_clean());
        prop_assert!(!once.contains("<script"));
        prop_assert!(!once.contains("onclick"));
        prop_assert!(!once.contains("javascript:"));
    }
}
