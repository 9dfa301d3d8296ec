//! Deterministic testing tokens.
//!
//! Format: `<window_start>-<mac>` where `window_start` is `now` floored to the
//! window in unix seconds and `mac` is
//! `base64url_nopad(HMAC-SHA256(secret, domain || window_start))`.
//!
//! Every call for the same domain within one window returns the same token;
//! the token changes when the window rolls over. External validators compute
//! the same value from the shared secret.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tessera_core::TestingTokenConfig;
use tessera_core::config::MAX_LIFETIME_SECS;
use zeroize::Zeroizing;

use crate::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks testing tokens with a shared secret.
#[derive(Clone)]
pub struct TestingTokenIssuer {
    secret: Zeroizing<Vec<u8>>,
    window_secs: i64,
    accept_previous_window: bool,
}

impl std::fmt::Debug for TestingTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestingTokenIssuer")
            .field("window_secs", &self.window_secs)
            .field("accept_previous_window", &self.accept_previous_window)
            .finish_non_exhaustive()
    }
}

impl TestingTokenIssuer {
    /// `window_secs` is clamped to `1..=MAX_LIFETIME_SECS`.
    pub fn new(secret: impl Into<Vec<u8>>, window_secs: u64) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            window_secs: window_secs.clamp(1, MAX_LIFETIME_SECS) as i64,
            accept_previous_window: true,
        }
    }

    /// Whether a token from the immediately prior window still verifies.
    pub fn accept_previous_window(mut self, accept: bool) -> Self {
        self.accept_previous_window = accept;
        self
    }

    /// Build from configuration, resolving the secret from env or file.
    pub fn from_config(config: &TestingTokenConfig) -> Result<Self, TokenError> {
        let secret = config
            .resolve_secret()?
            .ok_or(TokenError::TestingSecretUnavailable)?;
        let secret = Zeroizing::new(secret);

        Ok(Self::new(secret.as_bytes(), config.window_secs)
            .accept_previous_window(config.accept_previous_window))
    }

    pub fn window_secs(&self) -> i64 {
        self.window_secs
    }

    /// `now` floored to the start of its window, in unix seconds.
    pub fn window_start(&self, now: DateTime<Utc>) -> i64 {
        let ts = now.timestamp();
        ts - ts.rem_euclid(self.window_secs)
    }

    /// Issue the token for `domain` at `now`.
    pub fn issue(&self, domain: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let window_start = self.window_start(now);
        Ok(format!("{}-{}", window_start, self.mac(domain, window_start)?))
    }

    /// Check a presented token for `domain` at `now`.
    pub fn verify(&self, domain: &str, token: &str, now: DateTime<Utc>) -> Result<(), TokenError> {
        let (window, mac) = token
            .split_once('-')
            .ok_or_else(|| TokenError::Malformed("testing token has no separator".into()))?;
        let window: i64 = window
            .parse()
            .map_err(|_| TokenError::Malformed("testing token window is not a number".into()))?;

        if window.rem_euclid(self.window_secs) != 0 {
            return Err(TokenError::Malformed("testing token window is not aligned".into()));
        }

        let expected = self.mac(domain, window)?;
        if !bool::from(expected.as_bytes().ct_eq(mac.as_bytes())) {
            return Err(TokenError::SignatureInvalid);
        }

        let current = self.window_start(now);
        if window > current {
            return Err(TokenError::Malformed("testing token window is in the future".into()));
        }

        let accepted = window == current
            || (self.accept_previous_window && window == current - self.window_secs);

        if !accepted {
            let expired_at = DateTime::from_timestamp(window + self.window_secs, 0)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            return Err(TokenError::Expired { expired_at });
        }

        Ok(())
    }

    fn mac(&self, domain: &str, window_start: i64) -> Result<String, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TokenError::CreationFailed(e.to_string()))?;
        mac.update(domain.as_bytes());
        mac.update(window_start.to_string().as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const DOMAIN: &str = "auth.example.com";

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn issuer() -> TestingTokenIssuer {
        TestingTokenIssuer::new(b"testing-secret".to_vec(), 600)
    }

    #[test]
    fn test_known_vector_format() {
        let token = issuer().issue(DOMAIN, at(1_700_000_123)).unwrap();
        let (window, mac) = token.split_once('-').unwrap();

        assert_eq!(window, "1699999800");
        assert_eq!(mac.len(), 43);
        assert!(!mac.contains('='));
    }

    #[test]
    fn test_stable_within_window() {
        let issuer = issuer();
        let start = at(1_699_999_800);

        let first = issuer.issue(DOMAIN, start).unwrap();
        let last = issuer.issue(DOMAIN, start + Duration::seconds(599)).unwrap();
        let next = issuer.issue(DOMAIN, start + Duration::seconds(600)).unwrap();

        assert_eq!(first, last);
        assert_ne!(first, next);
    }

    #[test]
    fn test_domain_and_secret_bind_token() {
        let now = at(1_700_000_000);
        let a = issuer().issue(DOMAIN, now).unwrap();

        assert_ne!(a, issuer().issue("other.example.com", now).unwrap());
        let other_secret = TestingTokenIssuer::new(b"other".to_vec(), 600);
        assert_ne!(a, other_secret.issue(DOMAIN, now).unwrap());
    }

    #[test]
    fn test_verify_windows() {
        let issuer = issuer();
        let now = at(1_700_000_000);
        let token = issuer.issue(DOMAIN, now).unwrap();

        issuer.verify(DOMAIN, &token, now).unwrap();
        issuer
            .verify(DOMAIN, &token, now + Duration::seconds(600))
            .unwrap();

        assert!(matches!(
            issuer.verify(DOMAIN, &token, now + Duration::seconds(1200)),
            Err(TokenError::Expired { .. })
        ));

        let strict = self::issuer().accept_previous_window(false);
        assert!(matches!(
            strict.verify(DOMAIN, &token, now + Duration::seconds(600)),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let issuer = issuer();
        let now = at(1_700_000_000);
        let token = issuer.issue(DOMAIN, now).unwrap();

        assert!(matches!(
            issuer.verify("evil.example.com", &token, now),
            Err(TokenError::SignatureInvalid)
        ));
        assert!(matches!(
            issuer.verify(DOMAIN, "garbage", now),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            issuer.verify(DOMAIN, "1699999801-abc", now),
            Err(TokenError::Malformed(_))
        ));

        let (window, _) = token.split_once('-').unwrap();
        let forged = format!("{}-{}", window, "A".repeat(43));
        assert!(matches!(
            issuer.verify(DOMAIN, &forged, now),
            Err(TokenError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_future_window_is_malformed() {
        let issuer = issuer();
        let now = at(1_700_000_000);
        let later = issuer.issue(DOMAIN, now + Duration::seconds(600)).unwrap();

        assert!(matches!(
            issuer.verify(DOMAIN, &later, now),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_oversized_window_is_clamped() {
        let issuer = TestingTokenIssuer::new(b"testing-secret".to_vec(), u64::MAX);
        assert_eq!(issuer.window_secs(), MAX_LIFETIME_SECS as i64);

        let now = at(1_700_000_000);
        let token = issuer.issue(DOMAIN, now).unwrap();
        issuer.verify(DOMAIN, &token, now).unwrap();
    }

    #[test]
    fn test_from_config_requires_secret() {
        let config = TestingTokenConfig {
            secret_env: Some("TESSERA_TEST_SECRET_THAT_IS_NOT_SET".into()),
            ..Default::default()
        };
        assert!(matches!(
            TestingTokenIssuer::from_config(&config),
            Err(TokenError::TestingSecretUnavailable)
        ));
    }
}
