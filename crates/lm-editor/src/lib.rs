//! Live-markup editing engine.
//!
//! Plain text typed into the document is scanned for balanced markup runs,
//! which are parsed, sanitized and swapped in as frozen nodes. A bounded
//! snapshot history backs undo and redo.

pub mod caret;
pub mod config;
pub mod converge;
pub mod detect;
pub mod fragment;
pub mod freeze;
pub mod history;
pub mod notify;
mod session;
mod timer;

pub use caret::Caret;
pub use config::EditorConfig;
pub use converge::ConvergenceReport;
pub use converge::normalize_blocks;
pub use converge::process_all;
pub use detect::contains_valid_markup;
pub use detect::detect_and_replace;
pub use fragment::Fragment;
pub use fragment::FragmentParser;
pub use history::HistoryLog;
pub use notify::CallbackNotifier;
pub use notify::Notice;
pub use notify::NoticeLog;
pub use notify::Notifier;
pub use notify::TracingNotifier;
pub use session::Command;
pub use session::EditorSession;
pub use timer::Debouncer;
