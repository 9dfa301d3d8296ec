//! Testing-token configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ConfigError;
use super::tenant::{MAX_LIFETIME_SECS, check_bounds};

/// Settings for deterministic testing tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestingTokenConfig {
    /// Environment variable containing the HMAC secret.
    #[serde(default)]
    pub secret_env: Option<String>,

    /// File containing the HMAC secret.
    #[serde(default)]
    pub secret_file: Option<PathBuf>,

    /// Width of the window timestamps are floored to.
    #[serde(default = "default_window")]
    pub window_secs: u64,

    /// Whether a token minted in the immediately prior window still verifies.
    #[serde(default = "default_true")]
    pub accept_previous_window: bool,
}

impl Default for TestingTokenConfig {
    fn default() -> Self {
        Self {
            secret_env: None,
            secret_file: None,
            window_secs: default_window(),
            accept_previous_window: true,
        }
    }
}

impl TestingTokenConfig {
    /// Resolve the secret from environment or file. Surrounding whitespace is
    /// trimmed from either source.
    pub fn resolve_secret(&self) -> Result<Option<String>, std::io::Error> {
        if let Some(env_var) = &self.secret_env {
            if let Ok(secret) = std::env::var(env_var) {
                return Ok(Some(secret.trim().to_string()));
            }
        }

        if let Some(path) = &self.secret_file {
            if path.exists() {
                let secret = std::fs::read_to_string(path)?;
                return Ok(Some(secret.trim().to_string()));
            }
        }

        Ok(None)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        check_bounds(
            "testing_tokens.window_secs",
            self.window_secs,
            1,
            MAX_LIFETIME_SECS,
        )
    }
}

fn default_window() -> u64 {
    10 * 60
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_window_bounds() {
        let zero = TestingTokenConfig {
            window_secs: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let huge = TestingTokenConfig {
            window_secs: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(ConfigError::OutOfBounds { .. })
        ));

        assert!(TestingTokenConfig::default().validate().is_ok());
    }

    #[test]
    fn test_file_secret_is_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "s3cret").unwrap();

        let config = TestingTokenConfig {
            secret_env: Some("TESSERA_TEST_SECRET_THAT_IS_NOT_SET".into()),
            secret_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(config.resolve_secret().unwrap().as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_env_secret_is_trimmed() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("TESSERA_TEST_TRIMMED_SECRET", "s3cret\n") };

        let config = TestingTokenConfig {
            secret_env: Some("TESSERA_TEST_TRIMMED_SECRET".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_secret().unwrap().as_deref(), Some("s3cret"));
    }
}
