//! Session tunables.

use std::fs;
use std::path::Path;
use std::time::Duration;

use lm_core::EditorError;
use lm_core::EditorResult;
use lm_html::HtmlParserConfig;
use serde::Deserialize;
use serde::Serialize;

/// Every knob of an editing session. Missing TOML keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Ceiling on detector passes per convergence run.
    pub max_iterations: usize,
    /// History entries kept before the oldest is evicted.
    pub history_limit: usize,
    /// Quiet period after the last input before fragments are processed.
    pub process_delay_ms: u64,
    /// Quiet period after the last input before a history snapshot is taken.
    pub save_delay_ms: u64,
    /// How long the history guard swallows saves after undo/redo.
    pub guard_grace_ms: u64,
    pub strict_parser: bool,
    pub max_parse_depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            history_limit: 50,
            process_delay_ms: 150,
            save_delay_ms: 10,
            guard_grace_ms: 10,
            strict_parser: true,
            max_parse_depth: 256,
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(source: &str) -> EditorResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|error| EditorError::invalid_config(format!("malformed TOML: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> EditorResult<Self> {
        let source = fs::read_to_string(path).map_err(|error| {
            EditorError::invalid_config(format!(
                "failed to read config file `{}`: {error}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> EditorResult<()> {
        if self.max_iterations == 0 {
            return Err(EditorError::invalid_config(
                "max_iterations must be greater than zero",
            ));
        }

        if self.history_limit == 0 {
            return Err(EditorError::invalid_config(
                "history_limit must be greater than zero",
            ));
        }

        if self.max_parse_depth == 0 {
            return Err(EditorError::invalid_config(
                "max_parse_depth must be greater than zero",
            ));
        }

        Ok(())
    }

    pub fn process_delay(&self) -> Duration {
        Duration::from_millis(self.process_delay_ms)
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    pub fn guard_grace(&self) -> Duration {
        Duration::from_millis(self.guard_grace_ms)
    }

    pub fn parser_config(&self) -> HtmlParserConfig {
        HtmlParserConfig {
            strict: self.strict_parser,
            max_depth: self.max_parse_depth,
        }
    }
}
