//! End-to-end issue/verify flows.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header};
use serde_json::json;
use tessera_audit::{AuthEventType, EventNotifier, MemorySink, ResourceKind};
use tessera_claims::{
    ClaimTemplate, OrganizationMembership, ProviderRegistry, SessionSnapshot, SubjectSnapshot,
    UserSnapshot, resolve_template,
};
use tessera_core::{Clock, ErrorKind, FixedClock, SessionPolicy, TesseraConfig};
use tessera_lifecycle::{Session, SessionLifecycle, SessionStatus};
use tessera_token::{
    CredentialIssuer, SessionTokenClaims, SigningContext, SigningKeyPair, SourceType,
    StaticKeyProvider, TenantKeyring, TestingTokenIssuer, TicketClaims, TicketRequest,
    TicketSourceLookup, TokenError, verify_token,
};

const TENANT: &str = "ins_1";

const CONFIG: &str = r#"
issuer: https://auth.example.com
defaults:
  session:
    time_to_expire_secs: 3600
  tokens:
    session_token_ttl_secs: 60
    ticket_default_ttl_secs: 3600
    ticket_max_ttl_secs: 7200
"#;

struct Fixture {
    config: TesseraConfig,
    keys: StaticKeyProvider,
    clock: FixedClock,
    sink: Arc<MemorySink>,
    issuer: CredentialIssuer,
}

impl Fixture {
    fn new() -> Self {
        let config = TesseraConfig::from_yaml(CONFIG).unwrap();
        let keys = StaticKeyProvider::new();
        keys.insert(TenantKeyring::new(
            TENANT,
            SigningKeyPair::generate(),
            Duration::hours(24),
        ));

        let sink = Arc::new(MemorySink::new());
        let issuer = CredentialIssuer::new(ProviderRegistry::with_builtins())
            .with_notifier(EventNotifier::with_sink(sink.clone()));

        Self {
            config,
            keys,
            clock: FixedClock::at_unix(1_700_000_000),
            sink,
            issuer,
        }
    }

    fn ctx(&self) -> SigningContext {
        SigningContext::resolve(&self.config, &self.keys, TENANT).unwrap()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn session(&self) -> Session {
        let policy: &SessionPolicy = &self.config.tenant_policy(TENANT).session;
        Session::new("sess_1", TENANT, "client_1", "user_1", policy, self.now())
    }

    fn rejections(&self) -> usize {
        self.sink
            .events()
            .iter()
            .filter(|e| e.event_type == AuthEventType::TokenRejected)
            .count()
    }
}

fn subject() -> SubjectSnapshot {
    let mut user = UserSnapshot::new("user_1");
    user.primary_email_address = Some("ada@example.com".into());
    SubjectSnapshot::new(TENANT, user).with_session(SessionSnapshot {
        id: "sess_1".into(),
        actor: None,
    })
}

fn template() -> ClaimTemplate {
    ClaimTemplate::parse(&json!({
        "email": "{{user.primary_email_address}}",
        "org_role": "{{org.role}}",
        "app": "dashboard"
    }))
    .unwrap()
}

#[test]
fn test_session_token_round_trip() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let session = fx.session();

    let issued = fx
        .issuer
        .issue_session_token(&session, &template(), &subject(), &ctx, fx.now())
        .unwrap();

    let verified: SessionTokenClaims = fx
        .issuer
        .verify_token(&issued.token, &ctx, fx.now())
        .unwrap();
    assert_eq!(verified, issued.claims);

    assert_eq!(verified.iss, "https://auth.example.com");
    assert_eq!(verified.sub, "user_1");
    assert_eq!(verified.sid, "sess_1");
    assert_eq!(verified.exp, fx.now().timestamp() + 60);

    let expected = resolve_template(&template(), &ProviderRegistry::with_builtins(), &subject());
    assert_eq!(verified.extra, expected);
    assert_eq!(verified.extra["org_role"], serde_json::Value::Null);
}

#[test]
fn test_session_token_expires_at_exp() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let issued = fx
        .issuer
        .issue_session_token(&fx.session(), &template(), &subject(), &ctx, fx.now())
        .unwrap();

    fx.clock.advance(Duration::seconds(59));
    assert!(verify_token::<SessionTokenClaims>(&issued.token, &ctx, fx.now()).is_ok());

    fx.clock.advance(Duration::seconds(1));
    let err = fx
        .issuer
        .verify_token::<SessionTokenClaims>(&issued.token, &ctx, fx.now())
        .unwrap_err();
    assert!(matches!(err, TokenError::Expired { .. }));
    assert_eq!(err.kind(), ErrorKind::Expired);
    assert_eq!(fx.rejections(), 1);
}

#[test]
fn test_session_token_capped_by_session_deadline() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let session = fx.session();

    fx.clock.advance(Duration::seconds(3600 - 10));
    let issued = fx
        .issuer
        .issue_session_token(&session, &template(), &subject(), &ctx, fx.now())
        .unwrap();

    assert_eq!(issued.claims.exp, session.expire_at().timestamp());
}

#[test]
fn test_no_token_in_final_second_of_session() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let session = fx.session();

    fx.clock.set(session.expire_at());
    assert_eq!(session.status(fx.now()), SessionStatus::Active);

    let err = fx
        .issuer
        .issue_session_token(&session, &template(), &subject(), &ctx, fx.now())
        .unwrap_err();
    assert!(matches!(
        err,
        TokenError::SessionNotActive {
            status: SessionStatus::Expired
        }
    ));
    assert_eq!(err.kind(), ErrorKind::SessionNotActive);
}

#[test]
fn test_token_issued_just_before_deadline_verifies() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let session = fx.session();

    fx.clock.set(session.expire_at() - Duration::seconds(1));
    let issued = fx
        .issuer
        .issue_session_token(&session, &template(), &subject(), &ctx, fx.now())
        .unwrap();
    assert!(verify_token::<SessionTokenClaims>(&issued.token, &ctx, fx.now()).is_ok());
}

#[test]
fn test_no_token_for_revoked_session() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let mut session = fx.session();
    SessionLifecycle::default().revoke(&mut session, fx.now());

    let err = fx
        .issuer
        .issue_session_token(&session, &template(), &subject(), &ctx, fx.now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionNotActive);
}

#[test]
fn test_org_claims_follow_membership() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let subject = subject().with_organization(OrganizationMembership {
        id: "org_1".into(),
        name: "Acme".into(),
        role: "admin".into(),
        ..Default::default()
    });

    let issued = fx
        .issuer
        .issue_session_token(&fx.session(), &template(), &subject, &ctx, fx.now())
        .unwrap();
    let verified: SessionTokenClaims = verify_token(&issued.token, &ctx, fx.now()).unwrap();
    assert_eq!(verified.extra["org_role"], json!("admin"));
}

#[test]
fn test_forged_signature_rejected() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let attacker = SigningKeyPair::generate();

    let claims = SessionTokenClaims {
        iss: ctx.issuer.clone(),
        sub: "user_admin".into(),
        sid: "sess_forged".into(),
        iat: fx.now().timestamp(),
        exp: fx.now().timestamp() + 60,
        extra: Default::default(),
    };

    // Signed by another key but claiming the tenant's kid.
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(ctx.keyring.signing_key().kid().to_string());
    let forged = jsonwebtoken::encode(&header, &claims, &attacker.encoding_key()).unwrap();

    let err = verify_token::<SessionTokenClaims>(&forged, &ctx, fx.now()).unwrap_err();
    assert!(matches!(err, TokenError::SignatureInvalid));
}

#[test]
fn test_tampered_payload_rejected() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let issued = fx
        .issuer
        .issue_session_token(&fx.session(), &template(), &subject(), &ctx, fx.now())
        .unwrap();

    let parts: Vec<&str> = issued.token.split('.').collect();
    let mut claims = serde_json::to_value(&issued.claims).unwrap();
    claims["sub"] = json!("user_admin");
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let tampered = format!("{}.{}.{}", parts[0], payload, parts[2]);

    let err = verify_token::<SessionTokenClaims>(&tampered, &ctx, fx.now()).unwrap_err();
    assert!(matches!(err, TokenError::SignatureInvalid));
}

#[test]
fn test_malformed_tokens() {
    let fx = Fixture::new();
    let ctx = fx.ctx();

    for token in ["", "garbage", "a.b.c", "eyJhbGciOiJFZERTQSJ9.e30."] {
        let err = verify_token::<SessionTokenClaims>(token, &ctx, fx.now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed, "token {:?}", token);
    }
}

#[test]
fn test_ticket_is_not_a_session_token() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let ticket = fx
        .issuer
        .issue_ticket(
            &TicketRequest::new(SourceType::SignIn, "sia_1", "sign_in"),
            &ctx,
            fx.now(),
        )
        .unwrap();

    let err = verify_token::<SessionTokenClaims>(&ticket.token, &ctx, fx.now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[test]
fn test_ticket_round_trip_and_clamp() {
    let fx = Fixture::new();
    let ctx = fx.ctx();

    let request = TicketRequest::new(SourceType::OrganizationInvitation, "orginv_1", "accept")
        .subject("user_1")
        .redirect_url("https://app.example.com/welcome")
        .ttl_secs(30 * 86_400);
    let issued = fx.issuer.issue_ticket(&request, &ctx, fx.now()).unwrap();

    assert_eq!(issued.claims.exp, fx.now().timestamp() + 7200);

    let verified = fx.issuer.verify_ticket(&issued.token, &ctx, fx.now()).unwrap();
    assert_eq!(verified, issued.claims);
    assert_eq!(verified.tenant_id, TENANT);
    assert_eq!(verified.redirect_url.as_deref(), Some("https://app.example.com/welcome"));

    let default = fx
        .issuer
        .issue_ticket(
            &TicketRequest::new(SourceType::SignUp, "sua_1", "sign_up"),
            &ctx,
            fx.now(),
        )
        .unwrap();
    assert_eq!(default.claims.exp, fx.now().timestamp() + 3600);

    let issued_events = fx
        .sink
        .events()
        .iter()
        .filter(|e| e.event_type == AuthEventType::TicketIssued)
        .count();
    assert_eq!(issued_events, 2);
}

#[derive(Default)]
struct ConsumedSources(Mutex<HashSet<String>>);

impl TicketSourceLookup for ConsumedSources {
    fn is_consumed(&self, _tenant_id: &str, _source_type: SourceType, source_id: &str) -> bool {
        self.0.lock().unwrap().contains(source_id)
    }
}

#[test]
fn test_ticket_for_consumed_source_rejected() {
    let fx = Fixture::new();
    let ctx = fx.ctx();
    let consumed = Arc::new(ConsumedSources::default());
    let issuer = CredentialIssuer::default().with_source_lookup(consumed.clone());

    let issued = issuer
        .issue_ticket(
            &TicketRequest::new(SourceType::Invitation, "inv_1", "accept"),
            &ctx,
            fx.now(),
        )
        .unwrap();
    issuer.verify_ticket(&issued.token, &ctx, fx.now()).unwrap();

    consumed.0.lock().unwrap().insert("inv_1".into());
    let err = issuer
        .verify_ticket(&issued.token, &ctx, fx.now())
        .unwrap_err();
    assert!(matches!(err, TokenError::SourceConsumed { .. }));
}

#[test]
fn test_key_rotation_grace() {
    let fx = Fixture::new();
    let old_ctx = fx.ctx();
    let old_token = fx
        .issuer
        .issue_ticket(
            &TicketRequest::new(SourceType::SignIn, "sia_1", "sign_in"),
            &old_ctx,
            fx.now(),
        )
        .unwrap()
        .token;

    fx.keys
        .rotate(TENANT, SigningKeyPair::generate(), fx.now())
        .unwrap();
    let ctx = fx.ctx();
    assert_ne!(
        ctx.keyring.signing_key().kid(),
        old_ctx.keyring.signing_key().kid()
    );

    fx.clock.advance(Duration::minutes(30));
    verify_token::<TicketClaims>(&old_token, &ctx, fx.now()).unwrap();

    // Outside the grace window the old key is gone.
    let later = fx.now() + Duration::hours(24);
    let err = verify_token::<TicketClaims>(&old_token, &ctx, later).unwrap_err();
    assert!(matches!(err, TokenError::SignatureInvalid));

    let fresh = fx
        .issuer
        .issue_ticket(
            &TicketRequest::new(SourceType::SignIn, "sia_2", "sign_in").ttl_secs(7200),
            &ctx,
            fx.now(),
        )
        .unwrap();
    assert!(verify_token::<TicketClaims>(&fresh.token, &ctx, fx.now()).is_ok());
}

#[test]
fn test_unknown_tenant_has_no_key() {
    let fx = Fixture::new();
    let err = SigningContext::resolve(&fx.config, &fx.keys, "ins_unknown").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SigningKeyUnavailable);
    assert!(!err.kind().public_message().contains("ins_unknown"));
}

#[test]
fn test_testing_tokens_through_issuer() {
    let fx = Fixture::new();
    let issuer = CredentialIssuer::default()
        .with_testing_tokens(TestingTokenIssuer::new(b"secret".to_vec(), 600));

    let a = issuer.issue_testing_token("auth.example.com", fx.now()).unwrap();
    fx.clock.advance(Duration::seconds(1));
    let b = issuer.issue_testing_token("auth.example.com", fx.now()).unwrap();
    assert_eq!(a, b);

    issuer
        .verify_testing_token("auth.example.com", &a, fx.now())
        .unwrap();

    let unconfigured = CredentialIssuer::default();
    let err = unconfigured
        .issue_testing_token("auth.example.com", fx.now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SigningKeyUnavailable);
}

#[test]
fn test_ticket_for_other_tenant_rejected() {
    let fx = Fixture::new();
    let ctx = fx.ctx();

    // Same key material, but the ticket names another tenant.
    let other = SigningContext::new(
        ctx.issuer.clone(),
        TenantKeyring::new("ins_2", ctx.keyring.signing_key().clone(), Duration::zero()),
        ctx.tokens.clone(),
    );
    let request = TicketRequest::new(SourceType::Invitation, "inv_other", "accept");
    let issued = fx.issuer.issue_ticket(&request, &other, fx.now()).unwrap();
    assert_eq!(issued.claims.tenant_id, "ins_2");

    let err = fx
        .issuer
        .verify_ticket(&issued.token, &ctx, fx.now())
        .unwrap_err();
    assert!(matches!(err, TokenError::SignatureInvalid));
    assert_eq!(fx.rejections(), 1);

    let events = fx.sink.events();
    let rejected = events
        .iter()
        .find(|e| e.event_type == AuthEventType::TokenRejected)
        .unwrap();
    assert_eq!(rejected.tenant_id, TENANT);
    assert_eq!(rejected.resource_id, "inv_other");
    assert!(matches!(rejected.resource_kind, ResourceKind::Ticket));
}

#[test]
fn test_rejected_testing_token_is_reported() {
    let fx = Fixture::new();
    let issuer = CredentialIssuer::default()
        .with_notifier(EventNotifier::with_sink(fx.sink.clone()))
        .with_testing_tokens(TestingTokenIssuer::new(b"secret".to_vec(), 600));

    let token = issuer.issue_testing_token("auth.example.com", fx.now()).unwrap();
    let err = issuer
        .verify_testing_token("evil.example.com", &token, fx.now())
        .unwrap_err();
    assert!(matches!(err, TokenError::SignatureInvalid));

    let events = fx.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, AuthEventType::TokenRejected);
    assert!(matches!(events[0].resource_kind, ResourceKind::TestingToken));
    assert_eq!(events[0].resource_id, "evil.example.com");
    assert_eq!(events[0].reason.as_deref(), Some("signature_invalid"));
}
