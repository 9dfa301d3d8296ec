//! Per-tenant policy: session lifetimes, token TTLs and verification limits.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Shortest configurable session lifetime or inactivity window (5 minutes).
pub const MIN_LIFETIME_SECS: u64 = 5 * 60;

/// Longest configurable session lifetime or inactivity window (365 days).
pub const MAX_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// Policy for a single tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantPolicy {
    #[serde(default)]
    pub session: SessionPolicy,

    #[serde(default)]
    pub tokens: TokenPolicy,

    #[serde(default)]
    pub verification: VerificationPolicy,

    /// Session token claims template (a JSON object of claim bindings).
    #[serde(default)]
    pub claims_template: Option<serde_json::Value>,
}

impl TenantPolicy {
    pub(crate) fn validate(&self, path: &str) -> Result<(), ConfigError> {
        self.session.validate(&format!("{}.session", path))?;
        self.tokens.validate(&format!("{}.tokens", path))?;
        self.verification.validate(&format!("{}.verification", path))?;

        if let Some(template) = &self.claims_template {
            if !template.is_object() {
                return Err(ConfigError::Config(format!(
                    "{}.claims_template must be a JSON object",
                    path
                )));
            }
        }
        Ok(())
    }
}

/// Session lifetime rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// Absolute lifetime measured from session creation.
    #[serde(default = "default_time_to_expire")]
    pub time_to_expire_secs: u64,

    /// Sliding inactivity window measured from the last touch. `0` disables it.
    #[serde(default)]
    pub inactivity_timeout_secs: u64,

    /// When set, a new sign-in replaces the user's other active sessions.
    #[serde(default)]
    pub single_session_mode: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            time_to_expire_secs: default_time_to_expire(),
            inactivity_timeout_secs: 0,
            single_session_mode: false,
        }
    }
}

impl SessionPolicy {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        check_bounds(
            &format!("{}.time_to_expire_secs", path),
            self.time_to_expire_secs,
            MIN_LIFETIME_SECS,
            MAX_LIFETIME_SECS,
        )?;

        if self.inactivity_timeout_secs != 0 {
            check_bounds(
                &format!("{}.inactivity_timeout_secs", path),
                self.inactivity_timeout_secs,
                MIN_LIFETIME_SECS,
                MAX_LIFETIME_SECS,
            )?;
        }
        Ok(())
    }
}

/// Token lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPolicy {
    /// Lifetime of a minted session token.
    #[serde(default = "default_session_token_ttl")]
    pub session_token_ttl_secs: u64,

    /// Ticket lifetime when the caller does not request one.
    #[serde(default = "default_ticket_ttl")]
    pub ticket_default_ttl_secs: u64,

    /// Upper bound for any requested ticket lifetime.
    #[serde(default = "default_ticket_max_ttl")]
    pub ticket_max_ttl_secs: u64,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            session_token_ttl_secs: default_session_token_ttl(),
            ticket_default_ttl_secs: default_ticket_ttl(),
            ticket_max_ttl_secs: default_ticket_max_ttl(),
        }
    }
}

impl TokenPolicy {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        check_bounds(
            &format!("{}.session_token_ttl_secs", path),
            self.session_token_ttl_secs,
            1,
            MAX_LIFETIME_SECS,
        )?;
        check_bounds(
            &format!("{}.ticket_max_ttl_secs", path),
            self.ticket_max_ttl_secs,
            1,
            MAX_LIFETIME_SECS,
        )?;
        check_bounds(
            &format!("{}.ticket_default_ttl_secs", path),
            self.ticket_default_ttl_secs,
            1,
            self.ticket_max_ttl_secs,
        )
    }
}

/// Verification challenge limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationPolicy {
    /// Attempts allowed before the verification fails.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lifetime of a verification challenge.
    #[serde(default = "default_verification_ttl")]
    pub ttl_secs: u64,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            ttl_secs: default_verification_ttl(),
        }
    }
}

impl VerificationPolicy {
    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Config(format!(
                "{}.max_attempts must be at least 1",
                path
            )));
        }
        check_bounds(&format!("{}.ttl_secs", path), self.ttl_secs, 1, MAX_LIFETIME_SECS)
    }
}

pub(super) fn check_bounds(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfBounds {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn default_time_to_expire() -> u64 {
    7 * 24 * 60 * 60
}

fn default_session_token_ttl() -> u64 {
    60
}

fn default_ticket_ttl() -> u64 {
    60 * 60
}

fn default_ticket_max_ttl() -> u64 {
    30 * 24 * 60 * 60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_verification_ttl() -> u64 {
    10 * 60
}
