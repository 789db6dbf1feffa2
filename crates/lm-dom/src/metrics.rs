//! Visible-text metrics for the status bar.

use crate::DomTree;
use crate::NodeId;

/// Character and line counts derived from rendered text, never from markup source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextMetrics {
    pub char_count: usize,
    pub line_count: usize,
}

impl TextMetrics {
    pub fn measure(tree: &DomTree) -> Self {
        let char_count = tree.text_content(NodeId::ROOT).chars().count();

        let mut line_count = 0_usize;
        for child in tree.children(NodeId::ROOT) {
            if tree.is_text(*child) {
                if tree.text(*child).is_some_and(|text| !text.trim().is_empty()) {
                    line_count = line_count.saturating_add(1);
                }
                continue;
            }

            line_count = line_count.saturating_add(1);
            let inner_breaks = tree
                .descendant_elements(*child)
                .into_iter()
                .filter(|node| tree.tag_name(*node) == Some("br"))
                .filter(|node| tree.next_sibling(*node).is_some())
                .count();
            line_count = line_count.saturating_add(inner_breaks);
        }

        Self {
            char_count,
            line_count: line_count.max(1),
        }
    }
}
