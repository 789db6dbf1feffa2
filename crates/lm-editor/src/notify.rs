//! User-visible notices.

use std::cell::RefCell;
use std::rc::Rc;

use lm_core::Severity;
use tracing::error;
use tracing::info;

/// Receives `(message, severity)` pairs meant for the user.
pub trait Notifier {
    fn notify(&mut self, message: &str, severity: Severity);
}

/// One recorded notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

/// Shared in-memory recorder. Clones observe the same log.
#[derive(Debug, Clone, Default)]
pub struct NoticeLog {
    notices: Rc<RefCell<Vec<Notice>>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    /// The notice currently on screen: each new notice replaces the previous one.
    pub fn latest(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.notices.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.notices.borrow_mut().clear();
    }
}

impl Notifier for NoticeLog {
    fn notify(&mut self, message: &str, severity: Severity) {
        trace_notice(message, severity);
        self.notices.borrow_mut().push(Notice {
            message: message.to_owned(),
            severity,
        });
    }
}

/// Forwards notices to `tracing` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, message: &str, severity: Severity) {
        trace_notice(message, severity);
    }
}

/// Adapts a plain callback.
pub struct CallbackNotifier<F>(pub F);

impl<F> Notifier for CallbackNotifier<F>
where
    F: FnMut(&str, Severity),
{
    fn notify(&mut self, message: &str, severity: Severity) {
        trace_notice(message, severity);
        (self.0)(message, severity);
    }
}

fn trace_notice(message: &str, severity: Severity) {
    match severity {
        Severity::Error => error!(target: "livemark::notice", %message),
        Severity::Info | Severity::Success => {
            info!(target: "livemark::notice", severity = severity.as_str(), %message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CallbackNotifier;
    use super::NoticeLog;
    use super::Notifier;
    use lm_core::Severity;

    #[test]
    fn clones_share_one_log() {
        let log = NoticeLog::new();
        let mut writer = log.clone();
        writer.notify("Content pasted", Severity::Success);
        writer.notify("Unclosed tags: b", Severity::Error);
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.latest().map(|notice| notice.message),
            Some("Unclosed tags: b".to_owned())
        );
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn callback_receives_message_and_severity() {
        let mut seen = Vec::new();
        {
            let mut notifier = CallbackNotifier(|message: &str, severity| {
                seen.push((message.to_owned(), severity));
            });
            notifier.notify("HTML is valid!", Severity::Success);
        }
        assert_eq!(seen, vec![("HTML is valid!".to_owned(), Severity::Success)]);
    }
}
