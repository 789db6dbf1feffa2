//! Stack-based tag-balance validation.
//!
//! Self-closing tags and comments are masked out before scanning so they can
//! never touch the open-tag stack. Masking replaces each span with spaces of
//! the same byte length, which keeps token offsets aligned with the input.

use std::ops::Range;
use std::sync::LazyLock;

use lm_core::EditorError;
use lm_core::EditorResult;
use lm_dom::tags;
use regex::Regex;

static SELF_CLOSING_TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"<[^>]+/\s*>"));
static COMMENT: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)<!--.*?-->"));
static TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"</?([a-zA-Z][^\s>/]*)[^>]*>"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"<[^>]+>"));

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static tag pattern must compile")
}

/// Outcome of [`validate`]: `error` is only set when `valid` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }
}

impl From<EditorResult<()>> for ValidationResult {
    fn from(result: EditorResult<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(error) => Self {
                valid: false,
                error: Some(error.to_string()),
            },
        }
    }
}

/// One tag-shaped token found after masking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken {
    pub name: String,
    pub closing: bool,
    pub span: Range<usize>,
}

/// Validates tag balance and reports the first diagnostic as text.
pub fn validate(text: &str) -> ValidationResult {
    check_balance(text).into()
}

/// Typed form of [`validate`].
pub fn check_balance(text: &str) -> EditorResult<()> {
    let mut stack: Vec<String> = Vec::new();

    for token in tag_tokens(text) {
        if token.closing {
            if stack.last() != Some(&token.name) {
                return Err(EditorError::UnmatchedClosing { tag: token.name });
            }
            stack.pop();
        } else if !tags::is_void(&token.name) {
            stack.push(token.name);
        }
    }

    if stack.is_empty() {
        Ok(())
    } else {
        Err(EditorError::UnclosedTags { tags: stack })
    }
}

/// Tag tokens that participate in balance, in source order, names lowercased.
pub fn tag_tokens(text: &str) -> Vec<TagToken> {
    let masked = mask_non_participating(text);
    TAG.captures_iter(&masked)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let name = captures.get(1)?.as_str().to_ascii_lowercase();
            Some(TagToken {
                name,
                closing: whole.as_str().starts_with("</"),
                span: whole.range(),
            })
        })
        .collect()
}

/// True when `text` contains anything shaped like a tag.
pub fn has_tag_tokens(text: &str) -> bool {
    ANY_TAG.is_match(text)
}

/// End offset of the balanced run opened by the tag starting exactly at
/// `start`, if the stack returns to empty without an unmatched closing tag.
pub fn balanced_run_end(text: &str, start: usize) -> Option<usize> {
    let mut tokens = tag_tokens(text)
        .into_iter()
        .skip_while(|token| token.span.start < start);

    let first = tokens.next()?;
    if first.span.start != start || first.closing || tags::is_void(&first.name) {
        return None;
    }

    let mut stack = vec![first.name];
    for token in tokens {
        if token.closing {
            if stack.last() != Some(&token.name) {
                return None;
            }
            stack.pop();
            if stack.is_empty() {
                return Some(token.span.end);
            }
        } else if !tags::is_void(&token.name) {
            stack.push(token.name);
        }
    }

    None
}

fn mask_non_participating(text: &str) -> String {
    let without_self_closing = mask_matches(text, &SELF_CLOSING_TAG);
    mask_matches(&without_self_closing, &COMMENT)
}

fn mask_matches(text: &str, pattern: &Regex) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0_usize;
    for found in pattern.find_iter(text) {
        out.push_str(&text[cursor..found.start()]);
        out.extend(std::iter::repeat_n(' ', found.len()));
        cursor = found.end();
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::ValidationResult;
    use super::balanced_run_end;
    use super::check_balance;
    use super::has_tag_tokens;
    use super::tag_tokens;
    use super::validate;
    use lm_core::EditorError;

    #[test]
    fn plain_text_is_trivially_valid() {
        assert_eq!(validate("just words"), ValidationResult::ok());
        assert_eq!(validate(""), ValidationResult::ok());
        assert_eq!(validate("a < b and c > d"), ValidationResult::ok());
    }

    #[test]
    fn void_and_self_closing_tags_never_touch_the_stack() {
        assert!(validate("<br><div></div>").valid);
        assert!(validate("<div><br></div>").valid);
        assert!(validate("<div><custom-widget /></div>").valid);
        assert_eq!(
            check_balance("<div><br>"),
            Err(EditorError::UnclosedTags {
                tags: vec!["div".to_owned()]
            })
        );
    }

    #[test]
    fn comments_are_ignored() {
        assert!(validate("<p><!-- <span> --></p>").valid);
    }

    #[test]
    fn reports_first_unmatched_closing_tag() {
        let result = validate("<b><i>x</b></i>");
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Unmatched closing tag: b"));

        assert_eq!(
            check_balance("</em>"),
            Err(EditorError::UnmatchedClosing {
                tag: "em".to_owned()
            })
        );
    }

    #[test]
    fn unclosed_tags_are_listed_in_open_order() {
        let result = validate("<div><span><b>x</b>");
        assert_eq!(result.error.as_deref(), Some("Unclosed tags: div, span"));
    }

    #[test]
    fn tag_names_are_case_insensitive() {
        assert!(validate("<DIV>x</div>").valid);
        let tokens = tag_tokens("<Em class='a'>x</EM>");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].name, "em");
        assert!(tokens[1].closing);
    }

    #[test]
    fn unterminated_tags_are_plain_text() {
        assert!(validate("<div").valid);
        assert!(validate("x <b y").valid);
    }

    #[test]
    fn token_offsets_survive_masking() {
        let text = "<p>a<br/>b</p>";
        let tokens = tag_tokens(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(&text[tokens[1].span.clone()], "</p>");
    }

    #[test]
    fn balanced_run_end_follows_nested_same_name_tags() {
        let text = "<div><div>x</div></div> tail";
        assert_eq!(balanced_run_end(text, 0), Some(23));
        assert_eq!(balanced_run_end("<div><div>x</div>", 0), None);
        assert_eq!(balanced_run_end("<br><b>x</b>", 0), None);
        assert_eq!(balanced_run_end("a <i>x</i>", 2), Some(10));
    }

    #[test]
    fn detects_any_tag_shape() {
        assert!(has_tag_tokens("x <y> z"));
        assert!(!has_tag_tokens("x < y"));
    }
}
