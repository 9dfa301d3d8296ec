//! Configuration types for Tessera.
//!
//! Configuration is loaded from a single YAML file (`tessera.yaml`):
//!
//! ```yaml
//! issuer: https://auth.example.com
//! defaults:
//!   session:
//!     time_to_expire_secs: 604800
//!     inactivity_timeout_secs: 0
//!   tokens:
//!     session_token_ttl_secs: 60
//! tenants:
//!   ins_2abc:
//!     session:
//!       single_session_mode: true
//! keys:
//!   rotation_grace_secs: 86400
//!   tenants:
//!     ins_2abc:
//!       private_key_env: INS_2ABC_SIGNING_KEY
//! testing_tokens:
//!   secret_env: TESSERA_TESTING_SECRET
//! events:
//!   enabled: true
//!   sink: console
//! ```
//!
//! Bounds are enforced by [`TesseraConfig::validate`] at load time, never at
//! issue time.

pub mod events;
pub mod keys;
pub mod tenant;
pub mod testing;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub use events::{EventSinkKind, EventsConfig};
pub use keys::{KeySource, KeysConfig};
pub use tenant::{
    MAX_LIFETIME_SECS, MIN_LIFETIME_SECS, SessionPolicy, TenantPolicy, TokenPolicy,
    VerificationPolicy,
};
pub use testing::TestingTokenConfig;

/// Complete Tessera configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesseraConfig {
    /// Issuer (`iss`) stamped into session tokens.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Policy applied to tenants without an explicit override.
    #[serde(default)]
    pub defaults: TenantPolicy,

    /// Per-tenant policy overrides.
    #[serde(default)]
    pub tenants: HashMap<String, TenantPolicy>,

    /// Signing key sources.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Deterministic testing-token settings.
    #[serde(default)]
    pub testing_tokens: TestingTokenConfig,

    /// Event delivery settings.
    #[serde(default)]
    pub events: EventsConfig,
}

impl Default for TesseraConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            defaults: TenantPolicy::default(),
            tenants: HashMap::new(),
            keys: KeysConfig::default(),
            testing_tokens: TestingTokenConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{field} must be between {min} and {max} seconds, got {value}")]
    OutOfBounds {
        field: String,
        value: u64,
        min: u64,
        max: u64,
    },
}

impl TesseraConfig {
    /// Load configuration from a YAML file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content and validate it.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every tenant policy and global setting against its bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Config("issuer must not be empty".to_string()));
        }

        self.defaults.validate("defaults")?;
        for (tenant, policy) in &self.tenants {
            policy.validate(&format!("tenants.{}", tenant))?;
        }

        self.keys.validate()?;
        self.testing_tokens.validate()?;
        self.events.validate()?;

        tracing::debug!(
            tenants = self.tenants.len(),
            "Configuration validated"
        );
        Ok(())
    }

    /// The effective policy for a tenant.
    pub fn tenant_policy(&self, tenant_id: &str) -> &TenantPolicy {
        self.tenants.get(tenant_id).unwrap_or(&self.defaults)
    }
}

fn default_issuer() -> String {
    "https://tessera.local".to_string()
}
