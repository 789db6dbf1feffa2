//! Markup validation and parsing boundaries.

pub mod balance;
mod parser;

pub use balance::TagToken;
pub use balance::ValidationResult;
pub use balance::check_balance;
pub use balance::validate;
pub use parser::HtmlParser;
pub use parser::HtmlParserConfig;

use lm_core::EditorResult;
use lm_dom::DomTree;

/// Host-supplied markup parser.
///
/// Implementations must be sandboxed: no script execution and no resource
/// fetches. The returned tree is detached; its root is a synthetic container
/// whose children are the parsed top-level nodes.
pub trait MarkupParser {
    fn parse_fragment(&self, markup: &str) -> EditorResult<DomTree>;
}

impl<P: MarkupParser + ?Sized> MarkupParser for Box<P> {
    fn parse_fragment(&self, markup: &str) -> EditorResult<DomTree> {
        (**self).parse_fragment(markup)
    }
}
