//! Finds typed markup runs in editable text and swaps them for live nodes.
//!
//! Each call performs at most one replacement and reports whether it did;
//! the convergence loop keeps calling until nothing changes.

use std::ops::Range;
use std::sync::LazyLock;

use fancy_regex::Regex;
use lm_core::EditorError;
use lm_dom::DomTree;
use lm_dom::NodeId;
use lm_html::balance::balanced_run_end;
use lm_html::check_balance;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::fragment::FragmentParser;
use crate::notify::Notifier;

/// Loose shape of a markup run: a paired element closed by the same name
/// (lazy body), or a self-closing element.
static MARKUP_RUN: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"<([a-zA-Z][^\s>/]*)(?:\s+([^>]*))?>([\s\S]*?)</\1\s*>|<([a-zA-Z][^\s>/]*)(?:\s+([^>]*))?/\s*>")
});

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static markup pattern must compile")
}

/// Byte range of the first convertible markup run in `text`.
///
/// The loose match is accepted only when it balances. When it stops short of
/// its own closing tag (nested same-name elements), the run is extended to
/// the point where the open-tag stack empties; otherwise it is abandoned.
pub fn find_markup_run(text: &str) -> Option<Range<usize>> {
    let found = match MARKUP_RUN.find(text) {
        Ok(Some(found)) => found.range(),
        Ok(None) => return None,
        Err(error) => {
            warn!(%error, "markup pattern gave up on text node");
            return None;
        }
    };

    match check_balance(&text[found.clone()]) {
        Ok(()) => Some(found),
        Err(EditorError::UnclosedTags { .. }) => {
            let end = balanced_run_end(text, found.start)?;
            check_balance(&text[found.start..end]).ok()?;
            trace!(start = found.start, end, "extended markup run");
            Some(found.start..end)
        }
        Err(error) => {
            trace!(code = error.code(), "abandoned unbalanced markup run");
            None
        }
    }
}

/// True when `text` holds at least one run the detector would convert.
pub fn contains_valid_markup(text: &str) -> bool {
    find_markup_run(text).is_some()
}

/// Converts the first markup run found under `root`, in document order.
///
/// Explicitly non-editable elements (including `root` itself) are never
/// entered, so frozen content is not reprocessed.
pub fn detect_and_replace(
    tree: &mut DomTree,
    root: NodeId,
    fragments: &FragmentParser,
    notifier: &mut dyn Notifier,
) -> bool {
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if let Some(text) = tree.text(node) {
            if text.trim().is_empty() {
                continue;
            }
            let Some(run) = find_markup_run(text) else {
                continue;
            };
            if replace_run(tree, node, run, fragments, notifier) {
                return true;
            }
            continue;
        }

        if tree.is_explicitly_non_editable(node) {
            continue;
        }
        stack.extend(tree.children(node).iter().rev().copied());
    }

    false
}

fn replace_run(
    tree: &mut DomTree,
    node: NodeId,
    run: Range<usize>,
    fragments: &FragmentParser,
    notifier: &mut dyn Notifier,
) -> bool {
    let Some(parent) = tree.parent(node) else {
        return false;
    };
    let Some(text) = tree.text(node).map(str::to_owned) else {
        return false;
    };

    let before = &text[..run.start];
    let markup = &text[run.clone()];
    let after = &text[run.end..];

    if !before.is_empty() {
        let leading = tree.create_text(before);
        tree.insert_before(parent, leading, Some(node));
    }

    match fragments.parse(markup, notifier) {
        Ok(fragment) => {
            let inserted = fragment.insert_frozen(tree, parent, Some(node));
            let spacer = tree.create_text(" ");
            tree.insert_before(parent, spacer, Some(node));
            debug!(nodes = inserted.len(), "converted markup run");
        }
        Err(error) => {
            let raw = tree.create_text(markup);
            tree.insert_before(parent, raw, Some(node));
            debug!(code = error.code(), "kept markup run as text");
        }
    }

    if !after.is_empty() {
        let trailing = tree.create_text(after);
        tree.insert_before(parent, trailing, Some(node));
    }

    tree.remove(node);
    true
}
