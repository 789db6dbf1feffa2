//! Marks converted fragments as atomic, non-editable islands.

use lm_dom::DomTree;
use lm_dom::NodeId;

pub const LIVE_CLASS: &str = "live-html";
pub const LIVE_MARKER_ATTR: &str = "data-live-html";
pub const TAG_NAME_ATTR: &str = "data-tag-name";

/// Freezes `node` and every element below it. Text nodes are left alone.
pub fn freeze(tree: &mut DomTree, node: NodeId) {
    let Some(tag) = tree.tag_name(node).map(str::to_ascii_lowercase) else {
        return;
    };

    tree.set_attribute(node, "contenteditable", "false");
    tree.set_attribute(node, LIVE_MARKER_ATTR, "1");
    tree.set_attribute(node, TAG_NAME_ATTR, &tag);
    tree.add_class(node, LIVE_CLASS);

    if tag == "a" {
        tree.set_attribute(node, "rel", "noopener");
        tree.set_attribute(node, "target", "_blank");
    }

    for descendant in tree.descendant_elements(node) {
        tree.set_attribute(descendant, "contenteditable", "false");
    }
}

pub fn is_frozen(tree: &DomTree, node: NodeId) -> bool {
    tree.attribute(node, LIVE_MARKER_ATTR) == Some("1")
}

/// The outermost frozen element containing `node`, if any.
pub fn outermost_frozen(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    let mut found = None;
    let mut current = Some(node);
    while let Some(id) = current {
        if is_frozen(tree, id) {
            found = Some(id);
        }
        current = tree.parent(id);
    }
    found
}

#[cfg(test)]
mod tests {
    use super::freeze;
    use super::is_frozen;
    use super::outermost_frozen;
    use lm_dom::DomTree;

    #[test]
    fn marks_element_and_descendants() {
        let mut tree = DomTree::new("div");
        let bold = tree.create_element("B");
        let inner = tree.create_element("i");
        let text = tree.create_text("x");
        tree.append_child(tree.root(), bold);
        tree.append_child(bold, inner);
        tree.append_child(inner, text);

        freeze(&mut tree, bold);

        assert!(is_frozen(&tree, bold));
        assert!(!is_frozen(&tree, inner));
        assert_eq!(tree.attribute(bold, "data-tag-name"), Some("b"));
        assert!(tree.has_class(bold, "live-html"));
        assert_eq!(tree.attribute(inner, "contenteditable"), Some("false"));
        assert!(!tree.is_content_editable(text));
        assert_eq!(outermost_frozen(&tree, text), Some(bold));
    }

    #[test]
    fn anchors_open_in_a_new_context() {
        let mut tree = DomTree::new("div");
        let link = tree.create_element_with_attrs(
            "a",
            vec![("href".to_owned(), "https://example.com".to_owned())],
        );
        tree.append_child(tree.root(), link);
        freeze(&mut tree, link);
        assert_eq!(tree.attribute(link, "rel"), Some("noopener"));
        assert_eq!(tree.attribute(link, "target"), Some("_blank"));
        assert_eq!(tree.attribute(link, "href"), Some("https://example.com"));
    }

    #[test]
    fn keeps_existing_classes() {
        let mut tree = DomTree::new("div");
        let span = tree.create_element_with_attrs(
            "span",
            vec![("class".to_owned(), "note".to_owned())],
        );
        tree.append_child(tree.root(), span);
        freeze(&mut tree, span);
        assert!(tree.has_class(span, "note"));
        assert!(tree.has_class(span, "live-html"));
    }

    #[test]
    fn text_nodes_are_ignored() {
        let mut tree = DomTree::new("div");
        let text = tree.create_text("plain");
        tree.append_child(tree.root(), text);
        freeze(&mut tree, text);
        assert!(!is_frozen(&tree, text));
        assert_eq!(outermost_frozen(&tree, text), None);
    }
}
