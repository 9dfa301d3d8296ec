//! Credential issuance and verification.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header, Validation, decode, decode_header, encode};
use tessera_audit::{AuthEvent, AuthEventType, EventNotifier, ResourceKind};
use tessera_claims::{ClaimTemplate, ProviderRegistry, SubjectSnapshot, resolve_template};
use tessera_core::config::MAX_LIFETIME_SECS;
use tessera_core::{TesseraConfig, TokenPolicy};
use tessera_lifecycle::{Session, SessionStatus, compute_session_status};

use crate::claims::{SessionTokenClaims, SourceType, TicketClaims, TicketRequest, TokenClaims};
use crate::error::TokenError;
use crate::keys::{KeyProvider, TenantKeyring, VerificationKey};
use crate::testing::TestingTokenIssuer;

/// Everything needed to sign or verify for one tenant.
#[derive(Debug, Clone)]
pub struct SigningContext {
    pub tenant_id: String,
    /// `iss` claim of session tokens.
    pub issuer: String,
    pub keyring: TenantKeyring,
    pub tokens: TokenPolicy,
}

impl SigningContext {
    pub fn new(issuer: impl Into<String>, keyring: TenantKeyring, tokens: TokenPolicy) -> Self {
        Self {
            tenant_id: keyring.tenant_id().to_string(),
            issuer: issuer.into(),
            keyring,
            tokens,
        }
    }

    /// Build the context for `tenant_id` from configuration and a key provider.
    pub fn resolve(
        config: &TesseraConfig,
        keys: &dyn KeyProvider,
        tenant_id: &str,
    ) -> Result<Self, TokenError> {
        let keyring = keys.keyring(tenant_id)?;
        let tokens = config.tenant_policy(tenant_id).tokens.clone();
        Ok(Self::new(config.issuer.clone(), keyring, tokens))
    }
}

/// A freshly minted token and the claims it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken<C> {
    pub token: String,
    pub claims: C,
}

/// Answers whether a ticket's source record can still be consumed
/// (e.g. an invitation that was already accepted can not).
pub trait TicketSourceLookup: Send + Sync {
    fn is_consumed(&self, tenant_id: &str, source_type: SourceType, source_id: &str) -> bool;
}

/// Decode and verify a token of type `C` for the context's tenant.
///
/// Checks run in order and fail distinctly: decoding and token type
/// (`Malformed`), signature against the keys accepted at `now`
/// (`SignatureInvalid`), then expiry against `now` (`Expired`).
pub fn verify_token<C: TokenClaims>(
    token: &str,
    ctx: &SigningContext,
    now: DateTime<Utc>,
) -> Result<C, TokenError> {
    verify_with_keys(token, &ctx.keyring.verification_keys(now), now)
}

/// [`verify_token`] against an explicit set of public keys.
pub fn verify_with_keys<C: TokenClaims>(
    token: &str,
    keys: &[VerificationKey],
    now: DateTime<Utc>,
) -> Result<C, TokenError> {
    let header =
        decode_header(token).map_err(|e| TokenError::Malformed(format!("invalid header: {}", e)))?;

    if header.alg != Algorithm::EdDSA {
        return Err(TokenError::Malformed(format!(
            "unsupported algorithm {:?}",
            header.alg
        )));
    }

    if header.typ.as_deref() != Some(C::TYP) {
        return Err(TokenError::Malformed(format!(
            "expected token type '{}', got '{}'",
            C::TYP,
            header.typ.as_deref().unwrap_or("none")
        )));
    }

    let kid = header
        .kid
        .ok_or_else(|| TokenError::Malformed("missing kid header".into()))?;

    let key = keys
        .iter()
        .find(|k| k.kid == kid)
        .ok_or(TokenError::SignatureInvalid)?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let data = decode::<C>(token, &key.decoding_key()?, &validation)?;

    if now.timestamp() >= data.claims.exp() {
        return Err(TokenError::Expired {
            expired_at: data.claims.expires_at(),
        });
    }

    Ok(data.claims)
}

fn sign<C: TokenClaims>(claims: &C, ctx: &SigningContext) -> Result<String, TokenError> {
    let key = ctx.keyring.signing_key();

    let mut header = Header::new(Algorithm::EdDSA);
    header.typ = Some(C::TYP.to_string());
    header.kid = Some(key.kid().to_string());

    encode(&header, claims, &key.encoding_key()).map_err(|e| {
        tracing::error!(tenant = %ctx.tenant_id, kid = %key.kid(), error = %e, "Token signing failed");
        TokenError::CreationFailed(e.to_string())
    })
}

/// Mints and checks tickets, session tokens and testing tokens.
pub struct CredentialIssuer {
    registry: ProviderRegistry,
    notifier: EventNotifier,
    testing: Option<TestingTokenIssuer>,
    source_lookup: Option<Arc<dyn TicketSourceLookup>>,
}

impl std::fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("registry", &self.registry)
            .field("notifier", &self.notifier)
            .field("testing", &self.testing)
            .field("source_lookup", &self.source_lookup.is_some())
            .finish()
    }
}

impl Default for CredentialIssuer {
    fn default() -> Self {
        Self::new(ProviderRegistry::with_builtins())
    }
}

impl CredentialIssuer {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            notifier: EventNotifier::disabled(),
            testing: None,
            source_lookup: None,
        }
    }

    pub fn with_notifier(mut self, notifier: EventNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_testing_tokens(mut self, testing: TestingTokenIssuer) -> Self {
        self.testing = Some(testing);
        self
    }

    pub fn with_source_lookup(mut self, lookup: Arc<dyn TicketSourceLookup>) -> Self {
        self.source_lookup = Some(lookup);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Mint a ticket.
    ///
    /// The lifetime is the requested TTL clamped to the tenant maximum, or
    /// the tenant default when none is requested.
    #[tracing::instrument(skip(self, request, ctx), fields(tenant = %ctx.tenant_id, source_id = %request.source_id))]
    pub fn issue_ticket(
        &self,
        request: &TicketRequest,
        ctx: &SigningContext,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken<TicketClaims>, TokenError> {
        let ttl = ticket_ttl(request.ttl_secs, &ctx.tokens);

        let claims = TicketClaims {
            tenant_id: ctx.tenant_id.clone(),
            source_type: request.source_type,
            source_id: request.source_id.clone(),
            subject_id: request.subject_id.clone(),
            purpose: request.purpose.clone(),
            redirect_url: request.redirect_url.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl as i64)).timestamp(),
        };

        let token = sign(&claims, ctx)?;

        tracing::debug!(ttl_secs = ttl, purpose = %claims.purpose, "Issued ticket");
        self.notifier.notify(
            AuthEvent::builder(
                AuthEventType::TicketIssued,
                ctx.tenant_id.clone(),
                ResourceKind::Ticket,
                claims.source_id.clone(),
                now,
            )
            .meta(serde_json::json!({
                "source_type": claims.source_type,
                "purpose": claims.purpose,
                "exp": claims.exp,
            }))
            .build(),
        );

        Ok(IssuedToken { token, claims })
    }

    /// Mint a session token for an active session.
    ///
    /// The template is resolved against `subject` and merged under the base
    /// claims `iss`, `sub` (user ID), `sid`, `iat` and `exp`. The token never
    /// outlives the session's current deadline.
    #[tracing::instrument(skip_all, fields(tenant = %ctx.tenant_id, session_id = %session.id))]
    pub fn issue_session_token(
        &self,
        session: &Session,
        template: &ClaimTemplate,
        subject: &SubjectSnapshot,
        ctx: &SigningContext,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken<SessionTokenClaims>, TokenError> {
        if session.tenant_id != ctx.tenant_id {
            tracing::error!(session_tenant = %session.tenant_id, "Session tenant mismatch");
            return Err(TokenError::TenantMismatch {
                session_tenant: session.tenant_id.clone(),
                signing_tenant: ctx.tenant_id.clone(),
            });
        }

        let status = compute_session_status(session, now);
        if status != SessionStatus::Active {
            tracing::warn!(status = %status, "Refusing to mint token for inactive session");
            return Err(TokenError::SessionNotActive { status });
        }

        let extra = resolve_template(template, &self.registry, subject);

        let ttl = ctx.tokens.session_token_ttl_secs.clamp(1, MAX_LIFETIME_SECS);
        let ttl_exp = now + Duration::seconds(ttl as i64);
        let exp = ttl_exp.min(session.effective_deadline());

        // A session in its final second would yield a token already expired
        // at `now`.
        if exp.timestamp() <= now.timestamp() {
            tracing::warn!(deadline = %session.effective_deadline(), "Session ends before a token can be valid");
            return Err(TokenError::SessionNotActive {
                status: SessionStatus::Expired,
            });
        }

        let claims = SessionTokenClaims {
            iss: ctx.issuer.clone(),
            sub: session.user_id.clone(),
            sid: session.id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            extra,
        };

        let token = sign(&claims, ctx)?;
        tracing::debug!(exp = claims.exp, "Issued session token");

        Ok(IssuedToken { token, claims })
    }

    /// Issue the deterministic testing token for `domain`.
    pub fn issue_testing_token(&self, domain: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.testing
            .as_ref()
            .ok_or(TokenError::TestingSecretUnavailable)?
            .issue(domain, now)
    }

    /// Check a testing token for `domain`.
    #[tracing::instrument(skip(self, token))]
    pub fn verify_testing_token(
        &self,
        domain: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let testing = self
            .testing
            .as_ref()
            .ok_or(TokenError::TestingSecretUnavailable)?;

        testing.verify(domain, token, now).inspect_err(|e| {
            self.rejected(domain, ResourceKind::TestingToken, domain, e, now);
        })
    }

    /// Verify a token of type `C`; see [`verify_token`]. Rejections are
    /// reported as events.
    #[tracing::instrument(skip(self, token, ctx), fields(tenant = %ctx.tenant_id, typ = C::TYP))]
    pub fn verify_token<C: TokenClaims>(
        &self,
        token: &str,
        ctx: &SigningContext,
        now: DateTime<Utc>,
    ) -> Result<C, TokenError> {
        verify_token::<C>(token, ctx, now).inspect_err(|e| {
            let kind = if C::TYP == TicketClaims::TYP {
                ResourceKind::Ticket
            } else {
                ResourceKind::SessionToken
            };
            let kid = decode_header(token)
                .ok()
                .and_then(|h| h.kid)
                .unwrap_or_else(|| "unknown".to_string());
            self.rejected(&ctx.tenant_id, kind, &kid, e, now);
        })
    }

    /// Verify a ticket, then check that it belongs to the context's tenant
    /// and that its source record can still be consumed.
    pub fn verify_ticket(
        &self,
        token: &str,
        ctx: &SigningContext,
        now: DateTime<Utc>,
    ) -> Result<TicketClaims, TokenError> {
        let claims = self.verify_token::<TicketClaims>(token, ctx, now)?;

        if claims.tenant_id != ctx.tenant_id {
            let err = TokenError::SignatureInvalid;
            self.rejected(&ctx.tenant_id, ResourceKind::Ticket, &claims.source_id, &err, now);
            return Err(err);
        }

        if let Some(lookup) = &self.source_lookup {
            if lookup.is_consumed(&claims.tenant_id, claims.source_type, &claims.source_id) {
                let err = TokenError::SourceConsumed {
                    source_id: claims.source_id.clone(),
                };
                self.rejected(&ctx.tenant_id, ResourceKind::Ticket, &claims.source_id, &err, now);
                return Err(err);
            }
        }

        Ok(claims)
    }

    fn rejected(
        &self,
        tenant_id: &str,
        kind: ResourceKind,
        resource_id: &str,
        err: &TokenError,
        now: DateTime<Utc>,
    ) {
        let error_kind = err.kind();
        if error_kind.is_client_facing() {
            tracing::warn!(tenant = %tenant_id, reason = %error_kind, "Token rejected");
        } else {
            tracing::error!(tenant = %tenant_id, error = %err, "Token verification failed");
        }

        self.notifier.notify(
            AuthEvent::builder(
                AuthEventType::TokenRejected,
                tenant_id,
                kind,
                resource_id,
                now,
            )
            .reason(error_kind.to_string())
            .build(),
        );
    }
}

fn ticket_ttl(requested: Option<u64>, policy: &TokenPolicy) -> u64 {
    requested
        .unwrap_or(policy.ticket_default_ttl_secs)
        .clamp(1, policy.ticket_max_ttl_secs.clamp(1, MAX_LIFETIME_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_ttl_clamping() {
        let policy = TokenPolicy {
            session_token_ttl_secs: 60,
            ticket_default_ttl_secs: 3600,
            ticket_max_ttl_secs: 7200,
        };

        assert_eq!(ticket_ttl(None, &policy), 3600);
        assert_eq!(ticket_ttl(Some(60), &policy), 60);
        assert_eq!(ticket_ttl(Some(1_000_000), &policy), 7200);
        assert_eq!(ticket_ttl(Some(0), &policy), 1);

        let unbounded = TokenPolicy {
            ticket_max_ttl_secs: u64::MAX,
            ..policy
        };
        assert_eq!(ticket_ttl(Some(u64::MAX), &unbounded), MAX_LIFETIME_SECS);
    }
}
