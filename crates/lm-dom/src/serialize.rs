//! Markup serialization for snapshots and copy-out.

use crate::DomTree;
use crate::NodeId;
use crate::NodeKind;
use crate::tags;

impl DomTree {
    /// Serializes the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag_name(id).is_some_and(tags::is_raw_text);
        for child in self.children(id) {
            write_node(self, *child, raw, &mut out);
        }
        out
    }

    /// Serializes `id` together with its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_node(self, id, false, &mut out);
        out
    }
}

fn write_node(tree: &DomTree, id: NodeId, raw_parent: bool, out: &mut String) {
    match tree.kind(id) {
        Some(NodeKind::Text(text)) => {
            if raw_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        Some(NodeKind::Element(data)) => {
            out.push('<');
            out.push_str(&data.tag);
            for (name, value) in &data.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
            out.push('>');

            if tags::is_void(&data.tag) {
                return;
            }

            let raw = tags::is_raw_text(&data.tag);
            for child in tree.children(id) {
                write_node(tree, *child, raw, out);
            }
            out.push_str("</");
            out.push_str(&data.tag);
            out.push('>');
        }
        None => {}
    }
}

fn escape_text(input: &str, out: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attribute(input: &str, out: &mut String) {
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::DomTree;
    use crate::NodeId;

    #[test]
    fn escapes_markup_shaped_text() {
        let mut tree = DomTree::new("editor");
        let p = tree.create_element("p");
        let text = tree.create_text("a <b>x</b> & c");
        tree.append_child(NodeId::ROOT, p);
        tree.append_child(p, text);
        assert_eq!(
            tree.inner_html(NodeId::ROOT),
            "<p>a &lt;b&gt;x&lt;/b&gt; &amp; c</p>"
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let mut tree = DomTree::new("editor");
        let p = tree.create_element("p");
        let br = tree.create_element("br");
        tree.append_child(NodeId::ROOT, p);
        tree.append_child(p, br);
        assert_eq!(tree.inner_html(NodeId::ROOT), "<p><br></p>");
    }

    #[test]
    fn attributes_are_quoted_and_escaped() {
        let mut tree = DomTree::new("editor");
        let a = tree.create_element_with_attrs(
            "a",
            vec![("title".to_owned(), "say \"hi\" & go".to_owned())],
        );
        let text = tree.create_text("x");
        tree.append_child(a, text);
        assert_eq!(
            tree.outer_html(a),
            "<a title=\"say &quot;hi&quot; &amp; go\">x</a>"
        );
    }
}
