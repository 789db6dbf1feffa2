//! Event-driven editing session.
//!
//! Input arrives as [`Command`]s stamped with a logical time. Commands are
//! applied one per turn in arrival order; debounce timers fire in deadline
//! order whenever the clock is advanced past them.

use std::collections::VecDeque;
use std::time::Duration;

use lm_core::EditorResult;
use lm_core::Severity;
use lm_dom::DomTree;
use lm_dom::NodeId;
use lm_dom::TextMetrics;
use lm_html::HtmlParser;
use lm_html::MarkupParser;
use lm_html::ValidationResult;
use lm_html::balance::has_tag_tokens;
use lm_html::validate;
use lm_security::SanitizePolicy;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::caret;
use crate::caret::Caret;
use crate::config::EditorConfig;
use crate::converge;
use crate::converge::ConvergenceReport;
use crate::detect::contains_valid_markup;
use crate::fragment::FragmentParser;
use crate::freeze;
use crate::history::HistoryLog;
use crate::notify::Notifier;
use crate::timer::Debouncer;

const SURFACE_TAG: &str = "div";
const TAB_TEXT: &str = "  ";

/// One user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text typed at the caret. Never interpreted as markup.
    Type(String),
    /// Plain-text paste at the caret.
    Paste(String),
    Tab,
    /// Splits the current paragraph at the caret.
    Enter,
    Backspace,
    /// Ids are renumbered after every conversion; queued clicks follow along.
    Click(NodeId),
    /// Replaces the current selection text. Empty clears it.
    Select(String),
    Undo,
    Redo,
    Clear,
    Validate,
    /// Runs the convergence loop immediately instead of waiting for the timer.
    ProcessAll,
    /// Only advances the clock.
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TimerKind {
    Guard,
    Save,
    Process,
}

/// Owns the editable document and everything that reacts to input.
pub struct EditorSession {
    config: EditorConfig,
    tree: DomTree,
    fragments: FragmentParser,
    restorer: HtmlParser,
    history: HistoryLog,
    notifier: Box<dyn Notifier>,
    caret: Option<Caret>,
    selection: Option<String>,
    process_timer: Debouncer,
    save_timer: Debouncer,
    guard_timer: Debouncer,
    queue: VecDeque<Command>,
    now: Duration,
    last_report: Option<ConvergenceReport>,
}

impl EditorSession {
    pub fn new(config: EditorConfig, notifier: Box<dyn Notifier>) -> EditorResult<Self> {
        let parser = HtmlParser::new(config.parser_config());
        Self::with_parser(config, Box::new(parser), notifier)
    }

    /// Uses `parser` for fragments. Snapshot restores always use the
    /// built-in lenient parser.
    pub fn with_parser(
        config: EditorConfig,
        parser: Box<dyn MarkupParser>,
        notifier: Box<dyn Notifier>,
    ) -> EditorResult<Self> {
        config.validate()?;
        let fragments = FragmentParser::new(parser, SanitizePolicy::default())?;

        let mut tree = DomTree::new(SURFACE_TAG);
        converge::append_empty_paragraph(&mut tree);

        let mut session = Self {
            history: HistoryLog::new(config.history_limit),
            process_timer: Debouncer::new(config.process_delay()),
            save_timer: Debouncer::new(config.save_delay()),
            guard_timer: Debouncer::new(config.guard_grace()),
            config,
            tree,
            fragments,
            restorer: HtmlParser::lenient(),
            notifier,
            caret: None,
            selection: None,
            queue: VecDeque::new(),
            now: Duration::ZERO,
            last_report: None,
        };
        session.save_snapshot();
        info!(
            max_iterations = session.config.max_iterations,
            history_limit = session.config.history_limit,
            "editor session started"
        );
        Ok(session)
    }

    pub fn enqueue(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    /// Advances the clock to `now`, applying queued commands and firing due
    /// timers. Returns how many commands were applied.
    pub fn run_pending(&mut self, now: Duration) -> usize {
        let now = now.max(self.now);
        self.fire_due_timers(now);

        let mut applied = 0;
        while let Some(command) = self.queue.pop_front() {
            self.apply(command);
            applied += 1;
        }

        self.fire_due_timers(now);
        applied
    }

    pub fn dispatch(&mut self, command: Command, now: Duration) {
        self.enqueue(command);
        self.run_pending(now);
    }

    pub fn advance_to(&mut self, now: Duration) {
        self.run_pending(now);
    }

    /// Time by which every armed timer will have fired.
    pub fn settle_time(&self) -> Duration {
        [
            self.process_timer.deadline(),
            self.save_timer.deadline(),
            self.guard_timer.deadline(),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(self.now)
    }

    /// Advances until no timer is pending, including saves armed by a
    /// convergence run.
    pub fn settle(&mut self) {
        while self.has_pending_timers() {
            let target = self.settle_time();
            self.advance_to(target);
        }
    }

    pub fn has_pending_timers(&self) -> bool {
        self.process_timer.is_pending() || self.save_timer.is_pending() || self.guard_timer.is_pending()
    }

    fn apply(&mut self, command: Command) {
        debug!(?command, now_ms = self.now.as_millis() as u64, "applying command");
        match command {
            Command::Type(text) => self.type_text(&text),
            Command::Paste(text) => {
                self.type_text(&text);
                self.notify("Content pasted", Severity::Success);
            }
            Command::Tab => self.type_text(TAB_TEXT),
            Command::Enter => self.split_paragraph(),
            Command::Backspace => self.backspace(),
            Command::Click(node) => self.click(node),
            Command::Select(text) => {
                self.selection = (!text.is_empty()).then_some(text);
            }
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::Clear => self.clear(),
            Command::Validate => {
                self.validate_content();
            }
            Command::ProcessAll => {
                self.process_timer.cancel();
                self.run_convergence();
            }
            Command::Tick => {}
        }
    }

    fn fire_due_timers(&mut self, now: Duration) {
        loop {
            let next = [
                (TimerKind::Guard, self.guard_timer.deadline()),
                (TimerKind::Save, self.save_timer.deadline()),
                (TimerKind::Process, self.process_timer.deadline()),
            ]
            .into_iter()
            .filter_map(|(kind, deadline)| deadline.filter(|at| *at <= now).map(|at| (at, kind)))
            .min();

            let Some((deadline, kind)) = next else {
                break;
            };
            self.now = self.now.max(deadline);

            match kind {
                TimerKind::Guard => {
                    self.guard_timer.cancel();
                    self.history.release_guard();
                }
                TimerKind::Save => {
                    self.save_timer.cancel();
                    self.save_snapshot();
                }
                TimerKind::Process => {
                    self.process_timer.cancel();
                    self.on_process_timer();
                }
            }
        }
        self.now = now;
    }

    fn on_input(&mut self) {
        self.process_timer.arm(self.now);
        self.save_timer.arm(self.now);
    }

    fn on_process_timer(&mut self) {
        if let Some(selection) = &self.selection {
            if contains_valid_markup(selection) {
                debug!("selection holds markup; processing skipped");
                return;
            }
        }
        self.run_convergence();
    }

    fn run_convergence(&mut self) {
        let block = self
            .caret
            .and_then(|caret| self.top_level_ancestor(caret.node));
        let report = converge::process_all(
            &mut self.tree,
            &self.fragments,
            self.notifier.as_mut(),
            self.config.max_iterations,
        );

        if !self.caret.is_some_and(|caret| caret.is_valid(&self.tree)) {
            // Stay in the block that was being edited.
            let fallback = block.and_then(|block| caret::end_of_block(&self.tree, block));
            self.caret = Some(fallback.unwrap_or_else(|| caret::caret_at_end(&mut self.tree)));
        }
        if report.changed() {
            self.compact();
            self.save_timer.arm(self.now);
        }
        self.last_report = Some(report);
    }

    /// Reclaims the slots of nodes replaced during conversion and renumbers
    /// every id the session still holds.
    fn compact(&mut self) {
        let before = self.tree.capacity();
        let remap = self.tree.compact();
        let moved = |node: NodeId| remap.get(node.index()).copied().flatten();

        self.caret = self
            .caret
            .and_then(|caret| moved(caret.node).map(|node| Caret { node, ..caret }));
        self.queue = std::mem::take(&mut self.queue)
            .into_iter()
            .filter_map(|command| match command {
                Command::Click(node) => moved(node).map(Command::Click),
                other => Some(other),
            })
            .collect();
        debug!(before, after = self.tree.capacity(), "document arena compacted");
    }

    fn ensure_caret(&mut self) -> Caret {
        match self.caret {
            Some(caret) if caret.is_valid(&self.tree) => caret,
            _ => {
                let caret = caret::caret_at_end(&mut self.tree);
                self.caret = Some(caret);
                caret
            }
        }
    }

    fn type_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let caret = self.ensure_caret();
        self.caret = Some(caret::insert_text(&mut self.tree, caret, text));
        self.selection = None;
        self.on_input();
    }

    fn split_paragraph(&mut self) {
        let caret = self.ensure_caret();
        let Some(block) = self.top_level_ancestor(caret.node) else {
            return;
        };

        let tail = caret::take_text_after(&mut self.tree, caret);
        let paragraph = self.tree.create_element("p");
        self.tree.insert_after(block, paragraph);

        if self.tree.parent(caret.node) == Some(block) {
            let following: Vec<NodeId> = self
                .tree
                .children(block)
                .iter()
                .skip_while(|child| **child != caret.node)
                .skip(1)
                .copied()
                .collect();
            for node in following {
                self.tree.append_child(paragraph, node);
            }
        }

        let tail_node = self.tree.create_text(tail);
        let first = self.tree.first_child(paragraph);
        self.tree.insert_before(paragraph, tail_node, first);
        self.caret = Some(Caret {
            node: tail_node,
            offset: 0,
        });
        self.on_input();
    }

    fn top_level_ancestor(&self, node: NodeId) -> Option<NodeId> {
        let root = self.tree.root();
        let mut current = node;
        loop {
            let parent = self.tree.parent(current)?;
            if parent == root {
                return Some(current);
            }
            current = parent;
        }
    }

    fn backspace(&mut self) {
        let before = match self.caret.filter(|caret| caret.is_valid(&self.tree)) {
            Some(caret) if caret.offset == 0 => self.tree.previous_sibling(caret.node),
            Some(caret) => {
                if caret::delete_before(&mut self.tree, caret.node, caret.offset) {
                    self.caret = Some(Caret {
                        offset: caret.offset - 1,
                        ..caret
                    });
                    self.on_input();
                }
                return;
            }
            None => self.last_inline_node(),
        };

        let Some(before) = before else {
            return;
        };

        if freeze::is_frozen(&self.tree, before) {
            let after = self.tree.next_sibling(before);
            self.tree.remove(before);
            self.caret = Some(match after {
                Some(next) if self.tree.is_text(next) => Caret {
                    node: next,
                    offset: 0,
                },
                _ => caret::caret_at_end(&mut self.tree),
            });
            info!("removed frozen fragment");
            self.save_snapshot();
            return;
        }

        let Some(previous_len) = self.tree.text(before).map(|text| text.chars().count()) else {
            return;
        };
        if caret::delete_before(&mut self.tree, before, previous_len) {
            self.on_input();
        }
    }

    fn last_inline_node(&self) -> Option<NodeId> {
        let block = self.tree.last_child(self.tree.root())?;
        self.tree.last_child(block)
    }

    fn click(&mut self, node: NodeId) {
        let Some(frozen) = freeze::outermost_frozen(&self.tree, node) else {
            return;
        };
        if !self.tree.is_attached(frozen) {
            return;
        }
        self.caret = Some(caret::caret_after(&mut self.tree, frozen));
        self.selection = None;
        debug!(node = frozen.index(), "caret moved past frozen fragment");
    }

    fn undo(&mut self) {
        let Some(snapshot) = self.history.undo().map(str::to_owned) else {
            debug!("nothing to undo");
            return;
        };
        self.restore(&snapshot);
        info!(index = ?self.history.index(), "undo");
    }

    fn redo(&mut self) {
        let Some(snapshot) = self.history.redo().map(str::to_owned) else {
            debug!("nothing to redo");
            return;
        };
        self.restore(&snapshot);
        info!(index = ?self.history.index(), "redo");
    }

    fn restore(&mut self, snapshot: &str) {
        let mut tree = DomTree::new(SURFACE_TAG);
        let root = tree.root();
        if let Err(error) = self.restorer.parse_into(snapshot, &mut tree, root) {
            warn!(%error, "snapshot could not be restored");
            self.history.release_guard();
            return;
        }
        self.tree = tree;
        self.caret = Some(caret::caret_at_end(&mut self.tree));
        self.selection = None;
        self.guard_timer.arm(self.now);
    }

    fn clear(&mut self) {
        let mut tree = DomTree::new(SURFACE_TAG);
        converge::append_empty_paragraph(&mut tree);
        self.tree = tree;
        self.caret = None;
        self.selection = None;
        self.save_snapshot();
        info!("document cleared");
        self.notify("Content cleared", Severity::Success);
    }

    /// Validates the document's plain text and notifies the outcome.
    pub fn validate_content(&mut self) -> ValidationResult {
        let content = self.tree.text_content(self.tree.root());
        if !has_tag_tokens(&content) {
            self.notify("No HTML tags found", Severity::Info);
            return ValidationResult::ok();
        }

        let result = validate(&content);
        match &result.error {
            None => self.notify("HTML is valid!", Severity::Success),
            Some(error) => {
                let message = error.clone();
                self.notify(&message, Severity::Error);
            }
        }
        result
    }

    /// Serialized document markup, as handed to the clipboard.
    pub fn copy_markup(&mut self) -> String {
        let markup = self.markup();
        self.notify("Content copied to clipboard", Severity::Success);
        markup
    }

    /// Records the current document in history unless guarded or unchanged.
    pub fn save_snapshot(&mut self) -> bool {
        let snapshot = self.markup();
        self.history.save(snapshot)
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        self.notifier.notify(message, severity);
    }

    pub fn markup(&self) -> String {
        self.tree.inner_html(self.tree.root())
    }

    pub fn document(&self) -> &DomTree {
        &self.tree
    }

    pub fn caret(&self) -> Option<Caret> {
        self.caret
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn metrics(&self) -> TextMetrics {
        self.tree.metrics()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn last_report(&self) -> Option<ConvergenceReport> {
        self.last_report
    }
}
