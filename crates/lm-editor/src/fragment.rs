//! Turns a validated markup run into sanitized, detached nodes.

use lm_core::EditorResult;
use lm_core::Severity;
use lm_dom::DomTree;
use lm_dom::NodeId;
use lm_html::HtmlParser;
use lm_html::MarkupParser;
use lm_html::check_balance;
use lm_security::SanitizePolicy;
use tracing::debug;
use tracing::warn;

use crate::freeze;
use crate::notify::Notifier;

/// Validates, parses and sanitizes markup runs.
pub struct FragmentParser {
    parser: Box<dyn MarkupParser>,
    policy: SanitizePolicy,
}

impl FragmentParser {
    pub fn new(parser: Box<dyn MarkupParser>, policy: SanitizePolicy) -> EditorResult<Self> {
        policy.validate()?;
        Ok(Self { parser, policy })
    }

    /// Every failure is surfaced through `notifier` before it is returned.
    pub fn parse(&self, markup: &str, notifier: &mut dyn Notifier) -> EditorResult<Fragment> {
        if let Err(error) = check_balance(markup) {
            debug!(code = error.code(), "fragment rejected by balance check");
            notifier.notify(&error.to_string(), Severity::Error);
            return Err(error);
        }

        let mut tree = match self.parser.parse_fragment(markup) {
            Ok(tree) => tree,
            Err(error) => {
                warn!(code = error.code(), %error, "host parser rejected fragment");
                notifier.notify("HTML parsing error detected", Severity::Error);
                return Err(error);
            }
        };

        let root = tree.root();
        self.policy.sanitize(&mut tree, root);
        Ok(Fragment { tree })
    }
}

impl Default for FragmentParser {
    fn default() -> Self {
        Self {
            parser: Box::new(HtmlParser::default()),
            policy: SanitizePolicy::default(),
        }
    }
}

/// Parsed nodes waiting to be inserted into a document. Owned by no document.
#[derive(Debug, Clone)]
pub struct Fragment {
    tree: DomTree,
}

impl Fragment {
    pub fn nodes(&self) -> &[NodeId] {
        self.tree.children(self.tree.root())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }

    pub fn to_html(&self) -> String {
        self.tree.inner_html(self.tree.root())
    }

    /// Copies the nodes into `target` under `parent`, ahead of `before`.
    pub fn insert_into(
        &self,
        target: &mut DomTree,
        parent: NodeId,
        before: Option<NodeId>,
    ) -> Vec<NodeId> {
        let mut inserted = Vec::with_capacity(self.nodes().len());
        for node in self.nodes() {
            if let Some(copy) = target.import_subtree(&self.tree, *node) {
                target.insert_before(parent, copy, before);
                inserted.push(copy);
            }
        }
        inserted
    }

    /// Like [`Fragment::insert_into`], freezing every inserted element.
    pub fn insert_frozen(
        &self,
        target: &mut DomTree,
        parent: NodeId,
        before: Option<NodeId>,
    ) -> Vec<NodeId> {
        let inserted = self.insert_into(target, parent, before);
        for node in &inserted {
            freeze::freeze(target, *node);
        }
        inserted
    }
}
