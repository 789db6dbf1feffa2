//! Repeats detection until the document is stable, then normalizes blocks.

use lm_dom::DomTree;
use lm_dom::NodeKind;
use lm_dom::tags;
use tracing::debug;
use tracing::warn;

use crate::detect::detect_and_replace;
use crate::fragment::FragmentParser;
use crate::notify::Notifier;

pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Outcome of one [`process_all`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceReport {
    /// Detector passes made, including the final pass that found nothing.
    pub iterations: usize,
    pub replacements: usize,
    /// False when the iteration ceiling stopped the loop.
    pub converged: bool,
}

impl ConvergenceReport {
    pub fn changed(&self) -> bool {
        self.replacements > 0
    }
}

/// Runs the detector over the whole document until a pass makes no change
/// or `max_iterations` passes have run, then normalizes top-level blocks.
pub fn process_all(
    tree: &mut DomTree,
    fragments: &FragmentParser,
    notifier: &mut dyn Notifier,
    max_iterations: usize,
) -> ConvergenceReport {
    let root = tree.root();
    let mut iterations = 0;
    let mut replacements = 0;
    let mut changed;

    loop {
        changed = detect_and_replace(tree, root, fragments, notifier);
        iterations += 1;
        if changed {
            replacements += 1;
        }
        if !changed || iterations >= max_iterations {
            break;
        }
    }

    if changed {
        warn!(iterations, "iteration ceiling reached; remaining markup left as text");
    } else {
        debug!(iterations, replacements, "document converged");
    }

    normalize_blocks(tree);

    ConvergenceReport {
        iterations,
        replacements,
        converged: !changed,
    }
}

/// Wraps stray top-level text and inline elements in paragraphs and makes
/// sure the document keeps at least one block.
pub fn normalize_blocks(tree: &mut DomTree) {
    let root = tree.root();

    for child in tree.children(root).to_vec() {
        let wrap = match tree.kind(child) {
            Some(NodeKind::Text(text)) => !text.trim().is_empty(),
            Some(NodeKind::Element(data)) => !tags::is_block(&data.tag),
            None => false,
        };
        if wrap {
            let paragraph = tree.create_element("p");
            tree.insert_before(root, paragraph, Some(child));
            tree.append_child(paragraph, child);
        }
    }

    let has_block = tree
        .children(root)
        .iter()
        .any(|child| tree.is_element(*child));
    if !has_block {
        append_empty_paragraph(tree);
    }
}

/// Appends the `<p><br></p>` placeholder.
pub fn append_empty_paragraph(tree: &mut DomTree) {
    let root = tree.root();
    let paragraph = tree.create_element("p");
    let line_break = tree.create_element("br");
    tree.append_child(paragraph, line_break);
    tree.append_child(root, paragraph);
}

#[cfg(test)]
mod tests {
    use super::normalize_blocks;
    use super::process_all;
    use crate::fragment::FragmentParser;
    use crate::notify::NoticeLog;
    use lm_core::EditorError;
    use lm_core::EditorResult;
    use lm_dom::DomTree;
    use lm_html::MarkupParser;
    use lm_security::SanitizePolicy;

    struct RejectingParser;

    impl MarkupParser for RejectingParser {
        fn parse_fragment(&self, _markup: &str) -> EditorResult<DomTree> {
            Err(EditorError::host_parse("rejected"))
        }
    }

    fn doc_with_paragraph(text: &str) -> DomTree {
        let mut tree = DomTree::new("div");
        let paragraph = tree.create_element("p");
        let node = tree.create_text(text);
        tree.append_child(tree.root(), paragraph);
        tree.append_child(paragraph, node);
        tree
    }

    #[test]
    fn single_fragment_converges_in_two_passes() {
        let mut tree = doc_with_paragraph("hello <i>world</i> bye");
        let mut log = NoticeLog::new();
        let report = process_all(&mut tree, &FragmentParser::default(), &mut log, 20);
        assert_eq!(report.iterations, 2);
        assert_eq!(report.replacements, 1);
        assert!(report.converged);
    }

    #[test]
    fn plain_text_converges_immediately() {
        let mut tree = doc_with_paragraph("nothing to see");
        let mut log = NoticeLog::new();
        let report = process_all(&mut tree, &FragmentParser::default(), &mut log, 20);
        assert_eq!(report.iterations, 1);
        assert!(!report.changed());
        assert_eq!(tree.inner_html(tree.root()), "<p>nothing to see</p>");
    }

    #[test]
    fn rejected_fragments_stop_at_the_ceiling() {
        let mut tree = doc_with_paragraph("<b>hi</b>");
        let mut log = NoticeLog::new();
        let Ok(fragments) = FragmentParser::new(Box::new(RejectingParser), SanitizePolicy::default())
        else {
            panic!("default policy is valid");
        };

        let report = process_all(&mut tree, &fragments, &mut log, 20);

        assert_eq!(report.iterations, 20);
        assert!(!report.converged);
        assert_eq!(tree.text_content(tree.root()), "<b>hi</b>");
        assert_eq!(log.len(), 20);
    }

    #[test]
    fn wraps_stray_top_level_content() {
        let mut tree = DomTree::new("div");
        let root = tree.root();
        let text = tree.create_text("loose");
        let bold = tree.create_element("b");
        let gap = tree.create_text("  ");
        let list = tree.create_element("ul");
        tree.append_child(root, text);
        tree.append_child(root, bold);
        tree.append_child(root, gap);
        tree.append_child(root, list);

        normalize_blocks(&mut tree);

        assert_eq!(tree.inner_html(root), "<p>loose</p><p><b></b></p>  <ul></ul>");
    }

    #[test]
    fn empty_document_gets_a_placeholder_paragraph() {
        let mut tree = DomTree::new("div");
        normalize_blocks(&mut tree);
        assert_eq!(tree.inner_html(tree.root()), "<p><br></p>");

        let mut blank = DomTree::new("div");
        let space = blank.create_text(" ");
        let root = blank.root();
        blank.append_child(root, space);
        normalize_blocks(&mut blank);
        assert_eq!(blank.inner_html(root), " <p><br></p>");
    }
}
