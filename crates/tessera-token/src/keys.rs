//! Ed25519 signing keys, per-tenant keyrings and key providers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tessera_core::config::MAX_LIFETIME_SECS;
use tessera_core::{KeySource, KeysConfig};
use zeroize::Zeroizing;

use crate::error::TokenError;

/// PKCS#8 v1 prefix for a raw Ed25519 seed (RFC 8410).
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// Key ID: first 8 bytes of the SHA-256 of the public key, hex encoded.
fn derive_kid(public_key: &[u8; 32]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(&digest[..8])
}

/// An Ed25519 keypair for signing tokens.
#[derive(Clone)]
pub struct SigningKeyPair {
    inner: SigningKey,
    kid: String,
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut bytes = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(&mut *bytes);

        Self::from_signing_key(SigningKey::from_bytes(&bytes))
    }

    fn from_signing_key(inner: SigningKey) -> Self {
        let kid = derive_kid(inner.verifying_key().as_bytes());
        Self { inner, kid }
    }

    /// Load a keypair from the 32-byte private seed.
    pub fn from_private_key_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        let seed: Zeroizing<[u8; 32]> = Zeroizing::new(bytes.try_into().map_err(|_| {
            TokenError::InvalidPrivateKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?);
        Ok(Self::from_signing_key(SigningKey::from_bytes(&seed)))
    }

    /// Load a keypair from a hex-encoded private seed.
    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, TokenError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_str.trim()).map_err(|e| TokenError::InvalidPrivateKey(e.to_string()))?,
        );
        Self::from_private_key_bytes(&bytes)
    }

    /// Key ID stamped into the `kid` header.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.inner.to_bytes()))
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.inner.verifying_key().as_bytes())
    }

    /// The public half, for verification.
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey {
            kid: self.kid.clone(),
            public_key: self.inner.verifying_key(),
        }
    }

    /// JWT encoding key built from a PKCS#8 wrapping of the seed.
    pub fn encoding_key(&self) -> EncodingKey {
        let mut der = Zeroizing::new(Vec::with_capacity(48));
        der.extend_from_slice(&ED25519_PKCS8_PREFIX);
        der.extend_from_slice(self.inner.as_bytes());
        EncodingKey::from_ed_der(&der)
    }

    /// Save the keypair to files.
    pub fn save_to_files(
        &self,
        private_key_path: &Path,
        public_key_path: &Path,
    ) -> Result<(), TokenError> {
        std::fs::write(private_key_path, self.private_key_hex().as_bytes())?;
        std::fs::write(public_key_path, self.public_key_hex())?;
        Ok(())
    }

    /// Load a keypair from a private key file.
    pub fn load_from_file(private_key_path: &Path) -> Result<Self, TokenError> {
        let hex_str = Zeroizing::new(std::fs::read_to_string(private_key_path)?);
        Self::from_private_key_hex(&hex_str)
    }
}

/// A public key with its key ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationKey {
    pub kid: String,
    pub public_key: VerifyingKey,
}

impl VerificationKey {
    /// Load a public key from a hex string.
    pub fn from_public_key_hex(hex_str: &str) -> Result<Self, TokenError> {
        let bytes =
            hex::decode(hex_str.trim()).map_err(|e| TokenError::InvalidPublicKey(e.to_string()))?;
        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            TokenError::InvalidPublicKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        let public_key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| TokenError::InvalidPublicKey(e.to_string()))?;

        Ok(Self {
            kid: derive_kid(&bytes),
            public_key,
        })
    }

    /// Load a public key from a file.
    pub fn load_from_file(path: &Path) -> Result<Self, TokenError> {
        let hex_str = std::fs::read_to_string(path)?;
        Self::from_public_key_hex(&hex_str)
    }

    pub fn decoding_key(&self) -> Result<DecodingKey, TokenError> {
        let x = URL_SAFE_NO_PAD.encode(self.public_key.as_bytes());
        DecodingKey::from_ed_components(&x).map_err(|e| TokenError::InvalidPublicKey(e.to_string()))
    }
}

/// A key that was replaced, accepted for verification until its grace ends.
#[derive(Debug, Clone)]
pub struct RetiredKey {
    pub key: VerificationKey,
    pub retired_at: DateTime<Utc>,
}

/// A tenant's current signing key plus the immediately prior key.
#[derive(Debug, Clone)]
pub struct TenantKeyring {
    tenant_id: String,
    current: SigningKeyPair,
    previous: Option<RetiredKey>,
    grace: Duration,
}

impl TenantKeyring {
    pub fn new(tenant_id: impl Into<String>, current: SigningKeyPair, grace: Duration) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            current,
            previous: None,
            grace,
        }
    }

    /// Attach a previously retired key.
    pub fn with_previous(mut self, key: VerificationKey, retired_at: DateTime<Utc>) -> Self {
        self.previous = Some(RetiredKey { key, retired_at });
        self
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn signing_key(&self) -> &SigningKeyPair {
        &self.current
    }

    pub fn previous(&self) -> Option<&RetiredKey> {
        self.previous.as_ref()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Make `new_key` current. The old current key becomes the previous key;
    /// any older key is dropped.
    pub fn rotate(&mut self, new_key: SigningKeyPair, now: DateTime<Utc>) {
        let old = std::mem::replace(&mut self.current, new_key);
        tracing::info!(
            tenant = %self.tenant_id,
            retired_kid = %old.kid(),
            kid = %self.current.kid(),
            "Rotated signing key"
        );
        self.previous = Some(RetiredKey {
            key: old.verification_key(),
            retired_at: now,
        });
    }

    /// Keys accepted for verification at `now`: the current key, plus the
    /// previous one while `now < retired_at + grace`.
    pub fn verification_keys(&self, now: DateTime<Utc>) -> Vec<VerificationKey> {
        let mut keys = vec![self.current.verification_key()];
        if let Some(previous) = &self.previous {
            let in_grace = previous
                .retired_at
                .checked_add_signed(self.grace)
                .is_none_or(|end| now < end);
            if in_grace {
                keys.push(previous.key.clone());
            }
        }
        keys
    }
}

/// Source of per-tenant signing keys.
pub trait KeyProvider: Send + Sync {
    /// The tenant's keyring, or `SigningKeyUnavailable`.
    fn keyring(&self, tenant_id: &str) -> Result<TenantKeyring, TokenError>;
}

/// Keyrings held in memory.
#[derive(Debug, Default)]
pub struct StaticKeyProvider {
    keyrings: RwLock<HashMap<String, TenantKeyring>>,
}

impl StaticKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, keyring: TenantKeyring) {
        let mut keyrings = self.keyrings.write().unwrap_or_else(|e| e.into_inner());
        keyrings.insert(keyring.tenant_id.clone(), keyring);
    }

    /// Rotate a tenant's key in place.
    pub fn rotate(
        &self,
        tenant_id: &str,
        new_key: SigningKeyPair,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let mut keyrings = self
            .keyrings
            .write()
            .map_err(|_| unavailable(tenant_id))?;
        let keyring = keyrings.get_mut(tenant_id).ok_or_else(|| unavailable(tenant_id))?;
        keyring.rotate(new_key, now);
        Ok(())
    }
}

impl KeyProvider for StaticKeyProvider {
    fn keyring(&self, tenant_id: &str) -> Result<TenantKeyring, TokenError> {
        let keyrings = self.keyrings.read().map_err(|_| unavailable(tenant_id))?;
        keyrings
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| unavailable(tenant_id))
    }
}

fn unavailable(tenant_id: &str) -> TokenError {
    TokenError::SigningKeyUnavailable {
        tenant_id: tenant_id.to_string(),
    }
}

/// Keyrings resolved from [`KeysConfig`] sources (env vars or files) on
/// every lookup, so rotated secrets are picked up without a restart.
#[derive(Debug, Clone)]
pub struct ConfigKeyProvider {
    config: KeysConfig,
}

impl ConfigKeyProvider {
    pub fn new(config: KeysConfig) -> Self {
        Self { config }
    }

    fn load(&self, tenant_id: &str, source: &KeySource) -> Result<TenantKeyring, TokenError> {
        let current = source
            .resolve_private_key()?
            .ok_or_else(|| unavailable(tenant_id))?;
        let current = SigningKeyPair::from_private_key_hex(&Zeroizing::new(current))?;

        let grace_secs = self.config.rotation_grace_secs.min(MAX_LIFETIME_SECS);
        let grace = Duration::seconds(grace_secs as i64);
        let mut keyring = TenantKeyring::new(tenant_id, current, grace);

        if let Some(previous) = source.resolve_previous_private_key()? {
            let previous = SigningKeyPair::from_private_key_hex(&Zeroizing::new(previous))?;
            match source.previous_retired_at {
                Some(retired_at) => {
                    keyring = keyring.with_previous(previous.verification_key(), retired_at);
                }
                None => tracing::warn!(
                    tenant = %tenant_id,
                    kid = %previous.kid(),
                    "Previous signing key has no retired_at; ignoring it"
                ),
            }
        }

        Ok(keyring)
    }
}

impl KeyProvider for ConfigKeyProvider {
    fn keyring(&self, tenant_id: &str) -> Result<TenantKeyring, TokenError> {
        let source = self
            .config
            .tenants
            .get(tenant_id)
            .ok_or_else(|| unavailable(tenant_id))?;

        self.load(tenant_id, source).map_err(|e| {
            tracing::error!(tenant = %tenant_id, error = %e, "Failed to load signing key");
            match e {
                TokenError::SigningKeyUnavailable { .. } => e,
                _ => unavailable(tenant_id),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_keypair_roundtrip() {
        let keypair1 = SigningKeyPair::generate();
        let hex_str = keypair1.private_key_hex();

        let keypair2 = SigningKeyPair::from_private_key_hex(&hex_str).unwrap();
        assert_eq!(keypair1.public_key_hex(), keypair2.public_key_hex());
        assert_eq!(keypair1.kid(), keypair2.kid());
        assert_eq!(keypair1.kid().len(), 16);
    }

    #[test]
    fn test_distinct_keys_have_distinct_kids() {
        assert_ne!(
            SigningKeyPair::generate().kid(),
            SigningKeyPair::generate().kid()
        );
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(matches!(
            SigningKeyPair::from_private_key_hex("zz"),
            Err(TokenError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            SigningKeyPair::from_private_key_hex("abcd"),
            Err(TokenError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_keypair_file_save_load() {
        let keypair = SigningKeyPair::generate();
        let dir = tempfile::tempdir().unwrap();
        let priv_path = dir.path().join("ins_1.key");
        let pub_path = dir.path().join("ins_1.pub");

        keypair.save_to_files(&priv_path, &pub_path).unwrap();

        let loaded = SigningKeyPair::load_from_file(&priv_path).unwrap();
        assert_eq!(keypair.public_key_hex(), loaded.public_key_hex());

        let public = VerificationKey::load_from_file(&pub_path).unwrap();
        assert_eq!(public.kid, keypair.kid());
    }

    #[test]
    fn test_load_tolerates_trailing_newline() {
        let keypair = SigningKeyPair::generate();
        let mut priv_file = NamedTempFile::new().unwrap();
        writeln!(priv_file, "{}", keypair.private_key_hex().as_str()).unwrap();

        let loaded = SigningKeyPair::load_from_file(priv_file.path()).unwrap();
        assert_eq!(keypair.kid(), loaded.kid());
    }

    #[test]
    fn test_rotation_grace_window() {
        let old = SigningKeyPair::generate();
        let new = SigningKeyPair::generate();
        let mut keyring = TenantKeyring::new("ins_1", old.clone(), Duration::hours(24));

        keyring.rotate(new.clone(), t0());
        assert_eq!(keyring.signing_key().kid(), new.kid());

        let kids = |now| -> Vec<String> {
            keyring
                .verification_keys(now)
                .into_iter()
                .map(|k| k.kid)
                .collect()
        };

        assert_eq!(
            kids(t0() + Duration::hours(23)),
            vec![new.kid().to_string(), old.kid().to_string()]
        );
        assert_eq!(kids(t0() + Duration::hours(24)), vec![new.kid().to_string()]);
    }

    #[test]
    fn test_rotation_drops_older_keys() {
        let first = SigningKeyPair::generate();
        let second = SigningKeyPair::generate();
        let third = SigningKeyPair::generate();
        let mut keyring = TenantKeyring::new("ins_1", first.clone(), Duration::hours(24));

        keyring.rotate(second.clone(), t0());
        keyring.rotate(third, t0());

        let kids: Vec<_> = keyring
            .verification_keys(t0())
            .into_iter()
            .map(|k| k.kid)
            .collect();
        assert!(kids.contains(&second.kid().to_string()));
        assert!(!kids.contains(&first.kid().to_string()));
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticKeyProvider::new();
        assert!(matches!(
            provider.keyring("ins_1"),
            Err(TokenError::SigningKeyUnavailable { .. })
        ));

        let key = SigningKeyPair::generate();
        provider.insert(TenantKeyring::new("ins_1", key.clone(), Duration::hours(1)));
        assert_eq!(provider.keyring("ins_1").unwrap().signing_key().kid(), key.kid());

        let next = SigningKeyPair::generate();
        provider.rotate("ins_1", next.clone(), t0()).unwrap();
        let keyring = provider.keyring("ins_1").unwrap();
        assert_eq!(keyring.signing_key().kid(), next.kid());
        assert_eq!(keyring.previous().unwrap().key.kid, key.kid());
    }

    #[test]
    fn test_config_provider_from_files() {
        let current = SigningKeyPair::generate();
        let previous = SigningKeyPair::generate();

        let mut current_file = NamedTempFile::new().unwrap();
        writeln!(current_file, "{}", current.private_key_hex().as_str()).unwrap();
        let mut previous_file = NamedTempFile::new().unwrap();
        writeln!(previous_file, "{}", previous.private_key_hex().as_str()).unwrap();

        let mut config = KeysConfig::default();
        config.tenants.insert(
            "ins_1".into(),
            KeySource {
                private_key_file: Some(current_file.path().to_path_buf()),
                previous_private_key_file: Some(previous_file.path().to_path_buf()),
                previous_retired_at: Some(t0()),
                ..Default::default()
            },
        );

        let provider = ConfigKeyProvider::new(config);
        let keyring = provider.keyring("ins_1").unwrap();
        assert_eq!(keyring.signing_key().kid(), current.kid());
        assert_eq!(keyring.verification_keys(t0()).len(), 2);
        assert_eq!(keyring.verification_keys(t0() + Duration::days(2)).len(), 1);

        assert!(matches!(
            provider.keyring("ins_missing"),
            Err(TokenError::SigningKeyUnavailable { .. })
        ));
    }

    #[test]
    fn test_config_provider_bad_key_is_unavailable() {
        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "not-hex").unwrap();

        let mut config = KeysConfig::default();
        config.tenants.insert(
            "ins_1".into(),
            KeySource {
                private_key_file: Some(bad.path().to_path_buf()),
                ..Default::default()
            },
        );

        let err = ConfigKeyProvider::new(config).keyring("ins_1").unwrap_err();
        assert_eq!(err.kind(), tessera_core::ErrorKind::SigningKeyUnavailable);
    }

    #[test]
    fn test_config_provider_caps_unvalidated_grace() {
        let current = SigningKeyPair::generate();
        let mut current_file = NamedTempFile::new().unwrap();
        writeln!(current_file, "{}", current.private_key_hex().as_str()).unwrap();

        let mut config = KeysConfig {
            rotation_grace_secs: 10_000_000_000_000_000,
            ..KeysConfig::default()
        };
        config.tenants.insert(
            "ins_1".into(),
            KeySource {
                private_key_file: Some(current_file.path().to_path_buf()),
                ..Default::default()
            },
        );

        let keyring = ConfigKeyProvider::new(config).keyring("ins_1").unwrap();
        assert_eq!(keyring.grace(), Duration::seconds(MAX_LIFETIME_SECS as i64));
    }

    #[test]
    fn test_static_provider_insert_replaces_keyring() {
        let provider = StaticKeyProvider::new();
        let first = SigningKeyPair::generate();
        let second = SigningKeyPair::generate();

        provider.insert(TenantKeyring::new("ins_1", first, Duration::zero()));
        provider.insert(TenantKeyring::new("ins_1", second.clone(), Duration::zero()));

        let keyring = provider.keyring("ins_1").unwrap();
        assert_eq!(keyring.signing_key().kid(), second.kid());
    }
}
