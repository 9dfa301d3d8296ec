//! Event delivery configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ConfigError;

/// Configuration for status-affecting event notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Whether events are delivered at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Where events go.
    #[serde(default)]
    pub sink: EventSinkKind,

    /// Output file (for the file sink).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sink: EventSinkKind::default(),
            path: None,
        }
    }
}

impl EventsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.sink == EventSinkKind::File && self.path.is_none() {
            return Err(ConfigError::Config(
                "events.path is required when events.sink is 'file'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Event sink type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventSinkKind {
    /// Discard events.
    Null,
    /// Emit events as structured log lines.
    #[default]
    Console,
    /// Append events to a JSON Lines file.
    File,
}

fn default_enabled() -> bool {
    true
}
