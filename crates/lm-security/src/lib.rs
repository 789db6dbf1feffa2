//! Fragment sanitizing policy.
//!
//! Covers inline scripts, event-handler attributes and `javascript:` links.
//! Style-based and other injection vectors are out of scope.

use lm_core::EditorError;
use lm_core::EditorResult;
use lm_dom::DomTree;
use lm_dom::NodeId;
use tracing::debug;
use url::Url;

/// Sanitizer switches. Defaults are the hardened configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizePolicy {
    pub strip_scripts: bool,
    pub strip_event_handlers: bool,
    pub strip_javascript_urls: bool,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self {
            strip_scripts: true,
            strip_event_handlers: true,
            strip_javascript_urls: true,
        }
    }
}

/// What a sanitizer pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub scripts_removed: usize,
    pub attributes_removed: usize,
}

impl SanitizeReport {
    pub fn is_clean(&self) -> bool {
        self.scripts_removed == 0 && self.attributes_removed == 0
    }
}

impl SanitizePolicy {
    pub fn validate(&self) -> EditorResult<()> {
        if !self.strip_scripts {
            return Err(EditorError::InvalidPolicy {
                message: "script stripping must stay enabled".to_owned(),
            });
        }

        Ok(())
    }

    /// Sanitizes the subtree under `root` in place and returns `root`.
    pub fn sanitize(&self, tree: &mut DomTree, root: NodeId) -> NodeId {
        self.sanitize_with_report(tree, root);
        root
    }

    pub fn sanitize_with_report(&self, tree: &mut DomTree, root: NodeId) -> SanitizeReport {
        let mut report = SanitizeReport::default();

        if self.strip_scripts {
            let scripts: Vec<NodeId> = tree
                .descendant_elements(root)
                .into_iter()
                .filter(|node| tree.tag_name(*node) == Some("script"))
                .collect();
            for script in scripts {
                tree.remove(script);
                report.scripts_removed += 1;
            }
        }

        let mut elements = vec![root];
        elements.extend(tree.descendant_elements(root));
        for element in elements {
            report.attributes_removed += tree
                .retain_attributes(element, |name, value| !self.should_strip_attribute(name, value));
        }

        if !report.is_clean() {
            debug!(
                scripts = report.scripts_removed,
                attributes = report.attributes_removed,
                "sanitized fragment"
            );
        }
        report
    }

    fn should_strip_attribute(&self, name: &str, value: &str) -> bool {
        if self.strip_event_handlers && is_event_handler(name) {
            return true;
        }

        self.strip_javascript_urls && name.eq_ignore_ascii_case("href") && is_javascript_url(value)
    }
}

fn is_event_handler(name: &str) -> bool {
    name.get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
}

/// Literal `javascript:` prefix, or anything a URL parser resolves to that
/// scheme (leading whitespace, embedded tabs or newlines).
pub fn is_javascript_url(value: &str) -> bool {
    let literal = value
        .get(..11)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("javascript:"));
    if literal {
        return true;
    }

    Url::parse(value).is_ok_and(|url| url.scheme() == "javascript")
}
