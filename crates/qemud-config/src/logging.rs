//! Log output settings shared by the binaries.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::DEFAULT_LOG_FILTER;

/// How log events are rendered on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Single-line human-readable events.
    #[default]
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Filter expression and output format, resolved from flags or defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogSettings {
    /// `tracing` filter directive, e.g. `qemud-driver::transport=debug`.
    pub filter: String,
    /// Output rendering.
    pub format: LogFormat,
}

impl LogSettings {
    /// Uses the supplied values, falling back to the defaults for any that
    /// are absent or blank.
    #[must_use]
    pub fn resolve(filter: Option<&str>, format: Option<LogFormat>) -> Self {
        let filter = filter
            .map(str::trim)
            .filter(|directive| !directive.is_empty())
            .unwrap_or(DEFAULT_LOG_FILTER);
        Self {
            filter: filter.to_owned(),
            format: format.unwrap_or_default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}
