//! Signing key configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::ConfigError;
use super::tenant::{MAX_LIFETIME_SECS, check_bounds};

/// Where each tenant's signing keys come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Key sources keyed by tenant ID.
    #[serde(default)]
    pub tenants: HashMap<String, KeySource>,

    /// How long the previous key keeps verifying after a rotation.
    #[serde(default = "default_rotation_grace")]
    pub rotation_grace_secs: u64,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            tenants: HashMap::new(),
            rotation_grace_secs: default_rotation_grace(),
        }
    }
}

impl KeysConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        check_bounds(
            "keys.rotation_grace_secs",
            self.rotation_grace_secs,
            0,
            MAX_LIFETIME_SECS,
        )
    }
}

/// Hex-encoded Ed25519 private keys for one tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeySource {
    /// Environment variable containing the current private key.
    #[serde(default)]
    pub private_key_env: Option<String>,

    /// File containing the current private key.
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,

    /// Environment variable containing the previous private key.
    #[serde(default)]
    pub previous_private_key_env: Option<String>,

    /// File containing the previous private key.
    #[serde(default)]
    pub previous_private_key_file: Option<PathBuf>,

    /// When the previous key stopped signing.
    #[serde(default)]
    pub previous_retired_at: Option<DateTime<Utc>>,
}

impl KeySource {
    /// Resolve the current private key from environment or file.
    pub fn resolve_private_key(&self) -> Result<Option<String>, std::io::Error> {
        resolve(self.private_key_env.as_deref(), self.private_key_file.as_deref())
    }

    /// Resolve the previous private key from environment or file.
    pub fn resolve_previous_private_key(&self) -> Result<Option<String>, std::io::Error> {
        resolve(
            self.previous_private_key_env.as_deref(),
            self.previous_private_key_file.as_deref(),
        )
    }
}

fn resolve(env_var: Option<&str>, path: Option<&Path>) -> Result<Option<String>, std::io::Error> {
    // Try environment variable first
    if let Some(env_var) = env_var {
        if let Ok(key) = std::env::var(env_var) {
            return Ok(Some(key.trim().to_string()));
        }
    }

    if let Some(path) = path {
        if path.exists() {
            let key = std::fs::read_to_string(path)?;
            return Ok(Some(key.trim().to_string()));
        }
    }

    Ok(None)
}

fn default_rotation_grace() -> u64 {
    24 * 60 * 60
}
