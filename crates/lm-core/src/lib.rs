//! Shared primitives used across Livemark crates.

use core::fmt;

/// Result alias used across the workspace.
pub type EditorResult<T> = Result<T, EditorError>;

/// Every recoverable failure the editing engine can report.
///
/// None of these are fatal: callers surface them as notices and leave the
/// offending text in place.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error("Unmatched closing tag: {tag}")]
    UnmatchedClosing { tag: String },

    #[error("Unclosed tags: {}", tags.join(", "))]
    UnclosedTags { tags: Vec<String> },

    #[error("HTML parsing error detected: {message}")]
    HostParse { message: String },

    #[error("invalid editor configuration: {message}")]
    InvalidConfig { message: String },

    #[error("invalid sanitize policy: {message}")]
    InvalidPolicy { message: String },
}

impl EditorError {
    pub fn host_parse(message: impl Into<String>) -> Self {
        Self::HostParse {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Stable machine-readable identifier for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnmatchedClosing { .. } => "validate.unmatched_closing",
            Self::UnclosedTags { .. } => "validate.unclosed_tags",
            Self::HostParse { .. } => "parse.host_error",
            Self::InvalidConfig { .. } => "config.invalid",
            Self::InvalidPolicy { .. } => "security.invalid_policy",
        }
    }
}

/// Severity attached to user-visible notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::EditorError;
    use super::Severity;

    #[test]
    fn balance_errors_render_user_facing_diagnostics() {
        let unmatched = EditorError::UnmatchedClosing {
            tag: "span".to_owned(),
        };
        assert_eq!(unmatched.to_string(), "Unmatched closing tag: span");
        assert_eq!(unmatched.code(), "validate.unmatched_closing");

        let unclosed = EditorError::UnclosedTags {
            tags: vec!["div".to_owned(), "b".to_owned()],
        };
        assert_eq!(unclosed.to_string(), "Unclosed tags: div, b");
        assert_eq!(unclosed.code(), "validate.unclosed_tags");
    }

    #[test]
    fn host_parse_errors_carry_the_parser_message() {
        let error = EditorError::host_parse("unterminated start tag");
        assert_eq!(error.code(), "parse.host_error");
        assert!(error.to_string().contains("unterminated start tag"));
    }

    #[test]
    fn severity_labels_are_lowercase() {
        assert_eq!(Severity::Success.to_string(), "success");
        assert_eq!(Severity::Error.as_str(), "error");
    }
}
