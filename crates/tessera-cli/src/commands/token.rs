//! Token commands.
//!
//! `tessera token ticket` - Mint a ticket for a source record.
//! `tessera token verify` - Verify a ticket or session token and print its claims.
//! `tessera token testing` - Issue or check a deterministic testing token.

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tessera_audit::EventNotifier;
use tessera_core::{Clock, SystemClock, TesseraConfig};
use tessera_token::{
    CredentialIssuer, SessionTokenClaims, SigningContext, SigningKeyPair, SourceType,
    TenantKeyring, TestingTokenIssuer, TicketClaims, TicketRequest, VerificationKey,
    verify_with_keys,
};

/// Arguments of `tessera token ticket`.
#[derive(Debug, Clone, Default)]
pub struct TicketArgs {
    pub key: Option<String>,
    pub tenant: String,
    pub source_type: String,
    pub source_id: String,
    pub purpose: String,
    pub subject: Option<String>,
    pub redirect_url: Option<String>,
    pub ttl: Option<String>,
    pub config: Option<PathBuf>,
}

/// Resolve a private key from either a file path or a hex-encoded string.
fn resolve_private_key(key: Option<String>) -> anyhow::Result<SigningKeyPair> {
    let key_str = key.context(
        "Private key not provided. Either pass --key <path> or set TESSERA_PRIVATE_KEY env var",
    )?;

    let path = Path::new(&key_str);
    if path.exists() {
        return SigningKeyPair::load_from_file(path)
            .with_context(|| format!("Failed to load private key from file: {}", path.display()));
    }

    SigningKeyPair::from_private_key_hex(key_str.trim())
        .context("Failed to parse private key. Expected hex-encoded Ed25519 private key")
}

/// Resolve a public key from either a file path or a hex-encoded string.
fn resolve_public_key(key: Option<String>) -> anyhow::Result<VerificationKey> {
    let key_str = key.context(
        "Public key not provided. Either pass --public-key <path> or set TESSERA_PUBLIC_KEY env var",
    )?;

    let path = Path::new(&key_str);
    if path.exists() {
        return VerificationKey::load_from_file(path)
            .with_context(|| format!("Failed to load public key from file: {}", path.display()));
    }

    VerificationKey::from_public_key_hex(key_str.trim())
        .context("Failed to parse public key. Expected hex-encoded Ed25519 public key")
}

/// Parse a duration string like "24h", "7d", "30m" or "10s" into seconds.
/// A bare number is taken as seconds.
fn parse_duration(s: &str) -> anyhow::Result<u64> {
    let s = s.trim().to_lowercase();

    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c),
        _ => (s.as_str(), 's'),
    };

    let value: u64 = digits
        .parse()
        .with_context(|| format!("Invalid duration '{}'", s))?;

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86_400,
        other => bail!("Unknown duration unit '{}' (use s, m, h or d)", other),
    };

    value
        .checked_mul(multiplier)
        .with_context(|| format!("Duration '{}' is too large", s))
}

/// Mint a ticket and return the token.
pub fn ticket(args: TicketArgs) -> anyhow::Result<String> {
    ticket_at(args, SystemClock.now())
}

fn ticket_at(args: TicketArgs, now: DateTime<Utc>) -> anyhow::Result<String> {
    let keypair = resolve_private_key(args.key)?;

    let config = match &args.config {
        Some(path) => TesseraConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TesseraConfig::default(),
    };

    let source_type: SourceType = args
        .source_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let mut request = TicketRequest::new(source_type, args.source_id, args.purpose);
    if let Some(subject) = args.subject {
        request = request.subject(subject);
    }
    if let Some(url) = args.redirect_url {
        request = request.redirect_url(url);
    }
    if let Some(ttl) = &args.ttl {
        request = request.ttl_secs(parse_duration(ttl)?);
    }

    let keyring = TenantKeyring::new(&args.tenant, keypair, chrono::Duration::zero());
    let ctx = SigningContext::new(
        config.issuer.clone(),
        keyring,
        config.tenant_policy(&args.tenant).tokens.clone(),
    );

    let notifier = if args.config.is_some() {
        EventNotifier::new(&config.events)?
    } else {
        EventNotifier::disabled()
    };

    let issued = CredentialIssuer::default()
        .with_notifier(notifier)
        .issue_ticket(&request, &ctx, now)?;

    tracing::info!(
        tenant = %args.tenant,
        kid = %ctx.keyring.signing_key().kid(),
        exp = issued.claims.exp,
        "Minted ticket"
    );

    Ok(issued.token)
}

/// Verify a token against a public key and return its claims as JSON.
pub fn verify(token: &str, public_key: Option<String>, kind: &str) -> anyhow::Result<String> {
    verify_at(token, public_key, kind, SystemClock.now())
}

fn verify_at(
    token: &str,
    public_key: Option<String>,
    kind: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let key = resolve_public_key(public_key)?;
    let keys = [key];
    let token = token.trim();

    let claims = match kind {
        "ticket" => serde_json::to_value(verify_with_keys::<TicketClaims>(token, &keys, now)?)?,
        "session" => {
            serde_json::to_value(verify_with_keys::<SessionTokenClaims>(token, &keys, now)?)?
        }
        other => bail!("Unknown token type '{}' (use ticket or session)", other),
    };

    Ok(format!(
        "✔ Token is valid\n{}",
        serde_json::to_string_pretty(&claims)?
    ))
}

/// Issue the testing token for `domain`, or check `token` when given.
pub fn testing(
    domain: &str,
    secret: &str,
    window_secs: u64,
    token: Option<&str>,
) -> anyhow::Result<String> {
    testing_at(domain, secret, window_secs, token, SystemClock.now())
}

fn testing_at(
    domain: &str,
    secret: &str,
    window_secs: u64,
    token: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    if secret.is_empty() {
        bail!("Testing secret must not be empty");
    }
    let issuer = TestingTokenIssuer::new(secret.as_bytes(), window_secs);

    match token {
        Some(token) => {
            issuer.verify(domain, token.trim(), now)?;
            Ok(format!("✔ Testing token is valid for {}", domain))
        }
        None => Ok(issuer.issue(domain, now)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn ticket_args(key: &SigningKeyPair) -> TicketArgs {
        TicketArgs {
            key: Some(key.private_key_hex().to_string()),
            tenant: "ins_1".into(),
            source_type: "invitation".into(),
            source_id: "inv_1".into(),
            purpose: "accept_invitation".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), 10);
        assert_eq!(parse_duration("30m").unwrap(), 1800);
        assert_eq!(parse_duration("24h").unwrap(), 86_400);
        assert_eq!(parse_duration("7d").unwrap(), 604_800);
        assert_eq!(parse_duration("90").unwrap(), 90);
        assert!(parse_duration("5w").is_err());
        assert!(parse_duration("h").is_err());
    }

    #[test]
    fn test_ticket_then_verify() {
        let key = SigningKeyPair::generate();
        let token = ticket_at(ticket_args(&key), now()).unwrap();

        let out = verify_at(&token, Some(key.public_key_hex()), "ticket", now()).unwrap();
        assert!(out.contains("\"source_id\": \"inv_1\""));
        assert!(out.contains("\"tenant_id\": \"ins_1\""));
    }

    #[test]
    fn test_ticket_rejected_as_session_token() {
        let key = SigningKeyPair::generate();
        let token = ticket_at(ticket_args(&key), now()).unwrap();

        assert!(verify_at(&token, Some(key.public_key_hex()), "session", now()).is_err());
        assert!(verify_at(&token, Some(key.public_key_hex()), "bogus", now()).is_err());
    }

    #[test]
    fn test_verify_with_wrong_key_fails() {
        let key = SigningKeyPair::generate();
        let other = SigningKeyPair::generate();
        let token = ticket_at(ticket_args(&key), now()).unwrap();

        assert!(verify_at(&token, Some(other.public_key_hex()), "ticket", now()).is_err());
    }

    #[test]
    fn test_ticket_ttl_clamped_by_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("tessera.yaml");
        std::fs::write(
            &config_path,
            "defaults:\n  tokens:\n    ticket_default_ttl_secs: 600\n    ticket_max_ttl_secs: 3600\n",
        )
        .unwrap();

        let key = SigningKeyPair::generate();
        let mut args = ticket_args(&key);
        args.ttl = Some("7d".into());
        args.config = Some(config_path);
        let token = ticket_at(args, now()).unwrap();

        let claims: TicketClaims =
            verify_with_keys(&token, &[key.verification_key()], now()).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_private_key_from_file() {
        let dir = tempdir().unwrap();
        let key = SigningKeyPair::generate();
        let private_path = dir.path().join("signing.key");
        let public_path = dir.path().join("signing.pub");
        key.save_to_files(&private_path, &public_path).unwrap();

        let mut args = ticket_args(&key);
        args.key = Some(private_path.display().to_string());
        let token = ticket_at(args, now()).unwrap();

        let out = verify_at(&token, Some(public_path.display().to_string()), "ticket", now());
        assert!(out.is_ok());
    }

    #[test]
    fn test_missing_key_is_reported() {
        let key = SigningKeyPair::generate();
        let mut args = ticket_args(&key);
        args.key = None;
        let err = ticket_at(args, now()).unwrap_err();
        assert!(err.to_string().contains("TESSERA_PRIVATE_KEY"));
    }

    #[test]
    fn test_unknown_source_type() {
        let key = SigningKeyPair::generate();
        let mut args = ticket_args(&key);
        args.source_type = "password_reset".into();
        assert!(ticket_at(args, now()).is_err());
    }

    #[test]
    fn test_testing_token_issue_and_check() {
        let token = testing_at("app.example.com", "s3cret", 600, None, now()).unwrap();
        let out = testing_at("app.example.com", "s3cret", 600, Some(&token), now()).unwrap();
        assert!(out.contains("valid"));

        assert!(testing_at("other.example.com", "s3cret", 600, Some(&token), now()).is_err());
        assert!(testing_at("app.example.com", "", 600, None, now()).is_err());
    }
}
