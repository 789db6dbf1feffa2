//! Fixed tag-name sets shared by the validator, parser and block normalizer.

/// Elements that never take a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements that may sit directly under the editing root without a paragraph wrapper.
pub const BLOCK_ELEMENTS: &[&str] = &[
    "div",
    "p",
    "ul",
    "ol",
    "table",
    "section",
    "header",
    "footer",
    "article",
    "pre",
    "blockquote",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "nav",
    "aside",
    "main",
    "figure",
    "figcaption",
    "details",
    "summary",
];

/// Elements whose content is raw text rather than markup.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|name| tag.eq_ignore_ascii_case(name))
}

pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS
        .iter()
        .any(|name| tag.eq_ignore_ascii_case(name))
}

pub fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS
        .iter()
        .any(|name| tag.eq_ignore_ascii_case(name))
}
