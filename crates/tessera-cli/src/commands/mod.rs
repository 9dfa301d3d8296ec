//! CLI command implementations for Tessera.
//!
//! Commands return their output as a string; `main` prints it.

pub mod config;
pub mod keys;
pub mod template;
pub mod token;

use anyhow::Context;
use std::path::Path;

/// Read a JSON or YAML file into a JSON value, picking the parser by extension.
pub(crate) fn read_structured(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))
    }
}
