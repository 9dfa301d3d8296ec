//! Claim payloads for tickets and session tokens.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A signed payload type.
pub trait TokenClaims: Serialize + DeserializeOwned {
    /// Value of the `typ` header. Tokens of one type never verify as another.
    const TYP: &'static str;

    /// Expiry as unix seconds.
    fn exp(&self) -> i64;

    fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp(), 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// The kind of record a ticket resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    SignIn,
    SignUp,
    Invitation,
    OrganizationInvitation,
    AccountTransfer,
    Impersonation,
    Verification,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignIn => write!(f, "sign_in"),
            Self::SignUp => write!(f, "sign_up"),
            Self::Invitation => write!(f, "invitation"),
            Self::OrganizationInvitation => write!(f, "organization_invitation"),
            Self::AccountTransfer => write!(f, "account_transfer"),
            Self::Impersonation => write!(f, "impersonation"),
            Self::Verification => write!(f, "verification"),
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sign_in" => Ok(Self::SignIn),
            "sign_up" => Ok(Self::SignUp),
            "invitation" => Ok(Self::Invitation),
            "organization_invitation" => Ok(Self::OrganizationInvitation),
            "account_transfer" => Ok(Self::AccountTransfer),
            "impersonation" => Ok(Self::Impersonation),
            "verification" => Ok(Self::Verification),
            other => Err(format!("unknown source type '{}'", other)),
        }
    }
}

/// Payload of a ticket: a short-lived reference to a source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClaims {
    pub tenant_id: String,
    pub source_type: SourceType,
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims for TicketClaims {
    const TYP: &'static str = "ticket+jwt";

    fn exp(&self) -> i64 {
        self.exp
    }
}

/// Payload of a session token: base claims plus resolved template claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTokenClaims {
    pub iss: String,
    /// User ID.
    pub sub: String,
    /// Session ID.
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims for SessionTokenClaims {
    const TYP: &'static str = "JWT";

    fn exp(&self) -> i64 {
        self.exp
    }
}

/// What a caller asks for when minting a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    pub source_type: SourceType,
    pub source_id: String,
    pub subject_id: Option<String>,
    pub purpose: String,
    pub redirect_url: Option<String>,
    /// Requested lifetime in seconds; the tenant default applies when unset.
    pub ttl_secs: Option<u64>,
}

impl TicketRequest {
    pub fn new(
        source_type: SourceType,
        source_id: impl Into<String>,
        purpose: impl Into<String>,
    ) -> Self {
        Self {
            source_type,
            source_id: source_id.into(),
            subject_id: None,
            purpose: purpose.into(),
            redirect_url: None,
            ttl_secs: None,
        }
    }

    pub fn subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    pub fn ttl_secs(mut self, ttl: u64) -> Self {
        self.ttl_secs = Some(ttl);
        self
    }
}
