//! Caret placement inside the editable document.

use lm_dom::DomTree;
use lm_dom::NodeId;
use lm_dom::tags;

/// Insertion point: a text node and a character offset into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

impl Caret {
    /// True when the caret still points into attached, editable text.
    pub fn is_valid(&self, tree: &DomTree) -> bool {
        tree.text(self.node)
            .is_some_and(|text| self.offset <= text.chars().count())
            && tree.is_attached(self.node)
            && tree.is_content_editable(self.node)
    }
}

/// Moves the caret to the end of the document, creating an editable text
/// node when the last block has none.
pub fn caret_at_end(tree: &mut DomTree) -> Caret {
    let root = tree.root();
    let block = match tree.last_child(root) {
        Some(last) if tree.is_text(last) => return end_of_text(tree, last),
        Some(last)
            if tree.is_content_editable(last)
                && tree.tag_name(last).is_some_and(|tag| !tags::is_void(tag)) =>
        {
            last
        }
        _ => {
            let paragraph = tree.create_element("p");
            tree.append_child(root, paragraph);
            paragraph
        }
    };

    let children = tree.children(block);
    if children.len() == 1 && tree.tag_name(children[0]) == Some("br") {
        let placeholder = children[0];
        tree.remove(placeholder);
    }

    if let Some(last) = tree.last_child(block) {
        if tree.is_text(last) {
            return end_of_text(tree, last);
        }
    }

    let text = tree.create_text("");
    tree.append_child(block, text);
    Caret {
        node: text,
        offset: 0,
    }
}

/// Caret immediately after `node`, adding a single-space text node when
/// nothing editable follows it.
pub fn caret_after(tree: &mut DomTree, node: NodeId) -> Caret {
    if let Some(next) = tree.next_sibling(node) {
        if tree.is_text(next) {
            return Caret {
                node: next,
                offset: 0,
            };
        }
    }

    let spacer = tree.create_text(" ");
    tree.insert_after(node, spacer);
    Caret {
        node: spacer,
        offset: 1,
    }
}

/// Inserts `text` at the caret and returns the caret after it.
pub fn insert_text(tree: &mut DomTree, caret: Caret, text: &str) -> Caret {
    let Some(current) = tree.text(caret.node) else {
        return caret;
    };
    let at = byte_offset(current, caret.offset);
    let mut next = String::with_capacity(current.len() + text.len());
    next.push_str(&current[..at]);
    next.push_str(text);
    next.push_str(&current[at..]);
    tree.set_text(caret.node, next);
    Caret {
        node: caret.node,
        offset: caret.offset + text.chars().count(),
    }
}

/// Deletes the character before `offset` in text node `node`.
pub fn delete_before(tree: &mut DomTree, node: NodeId, offset: usize) -> bool {
    if offset == 0 {
        return false;
    }
    let Some(current) = tree.text(node) else {
        return false;
    };
    let start = byte_offset(current, offset - 1);
    let end = byte_offset(current, offset);
    if start == end {
        return false;
    }
    let mut next = current.to_owned();
    next.replace_range(start..end, "");
    tree.set_text(node, next);
    true
}

/// Cuts everything after the caret out of its text node and returns it.
pub fn take_text_after(tree: &mut DomTree, caret: Caret) -> String {
    let Some(current) = tree.text(caret.node) else {
        return String::new();
    };
    let at = byte_offset(current, caret.offset);
    let tail = current[at..].to_owned();
    let head = current[..at].to_owned();
    tree.set_text(caret.node, head);
    tail
}

/// End of the last editable text inside `block`, if the block is still in
/// the document.
pub fn end_of_block(tree: &DomTree, block: NodeId) -> Option<Caret> {
    if !tree.is_attached(block) {
        return None;
    }
    let last = tree
        .descendants(block)
        .into_iter()
        .rev()
        .find(|node| tree.is_text(*node) && tree.is_content_editable(*node))?;
    Some(end_of_text(tree, last))
}

pub fn end_of_text(tree: &DomTree, node: NodeId) -> Caret {
    Caret {
        node,
        offset: tree.text(node).map_or(0, |text| text.chars().count()),
    }
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::Caret;
    use super::caret_after;
    use super::caret_at_end;
    use super::delete_before;
    use super::end_of_block;
    use super::insert_text;
    use super::take_text_after;
    use lm_dom::DomTree;

    fn placeholder_doc() -> DomTree {
        let mut tree = DomTree::new("div");
        let paragraph = tree.create_element("p");
        let br = tree.create_element("br");
        tree.append_child(tree.root(), paragraph);
        tree.append_child(paragraph, br);
        tree
    }

    #[test]
    fn end_caret_replaces_the_placeholder_break() {
        let mut tree = placeholder_doc();
        let caret = caret_at_end(&mut tree);
        assert_eq!(caret.offset, 0);
        assert_eq!(tree.inner_html(tree.root()), "<p></p>");
        assert!(caret.is_valid(&tree));
    }

    #[test]
    fn typing_respects_multibyte_offsets() {
        let mut tree = placeholder_doc();
        let caret = caret_at_end(&mut tree);
        let caret = insert_text(&mut tree, caret, "héllo");
        assert_eq!(caret.offset, 5);
        let caret = insert_text(&mut tree, Caret { offset: 2, ..caret }, "→");
        assert_eq!(tree.text(caret.node), Some("hé→llo"));
        assert!(delete_before(&mut tree, caret.node, 3));
        assert_eq!(tree.text(caret.node), Some("héllo"));
        assert!(!delete_before(&mut tree, caret.node, 0));
    }

    #[test]
    fn splitting_keeps_the_head_in_place() {
        let mut tree = placeholder_doc();
        let caret = caret_at_end(&mut tree);
        let caret = insert_text(&mut tree, caret, "left|right");
        let tail = take_text_after(&mut tree, Caret { offset: 5, ..caret });
        assert_eq!(tail, "right");
        assert_eq!(tree.text(caret.node), Some("left|"));
    }

    #[test]
    fn caret_after_adds_spacer_when_needed() {
        let mut tree = DomTree::new("div");
        let paragraph = tree.create_element("p");
        let bold = tree.create_element("b");
        tree.append_child(tree.root(), paragraph);
        tree.append_child(paragraph, bold);

        let caret = caret_after(&mut tree, bold);
        assert_eq!(tree.text(caret.node), Some(" "));
        assert_eq!(caret.offset, 1);
        assert_eq!(tree.previous_sibling(caret.node), Some(bold));

        let again = caret_after(&mut tree, bold);
        assert_eq!(again.node, caret.node);
        assert_eq!(again.offset, 0);
    }

    #[test]
    fn end_caret_skips_frozen_blocks() {
        let mut tree = DomTree::new("div");
        let frozen = tree.create_element_with_attrs(
            "div",
            vec![("contenteditable".to_owned(), "false".to_owned())],
        );
        tree.append_child(tree.root(), frozen);
        let caret = caret_at_end(&mut tree);
        assert!(caret.is_valid(&tree));
        assert_eq!(tree.children(tree.root()).len(), 2);
    }

    #[test]
    fn block_end_skips_frozen_text() {
        let mut tree = DomTree::new("div");
        let paragraph = tree.create_element("p");
        let head = tree.create_text("head");
        let frozen = tree.create_element("b");
        let inner = tree.create_text("inner");
        tree.append_child(tree.root(), paragraph);
        tree.append_child(paragraph, head);
        tree.append_child(paragraph, frozen);
        tree.append_child(frozen, inner);
        tree.set_attribute(frozen, "contenteditable", "false");

        assert_eq!(
            end_of_block(&tree, paragraph),
            Some(Caret {
                node: head,
                offset: 4
            })
        );

        tree.remove(paragraph);
        assert_eq!(end_of_block(&tree, paragraph), None);
    }
}
