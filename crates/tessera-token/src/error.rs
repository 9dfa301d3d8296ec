//! Error types for the token crate.

use chrono::{DateTime, Utc};
use tessera_claims::ClaimsError;
use tessera_core::ErrorKind;
use tessera_lifecycle::SessionStatus;
use thiserror::Error;

/// Errors that can occur while issuing or verifying credentials.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Failed to parse private key.
    #[error("failed to parse private key: {0}")]
    InvalidPrivateKey(String),

    /// Failed to parse public key.
    #[error("failed to parse public key: {0}")]
    InvalidPublicKey(String),

    /// No signing key is configured or loadable for the tenant.
    #[error("no signing key available for tenant '{tenant_id}'")]
    SigningKeyUnavailable { tenant_id: String },

    /// No testing-token secret is configured.
    #[error("testing-token secret is not configured")]
    TestingSecretUnavailable,

    /// Token could not be decoded, or is of the wrong type.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signature did not verify against any accepted key.
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// Token is past its expiry.
    #[error("token expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    /// The resource a ticket points at was already consumed.
    #[error("ticket source '{source_id}' is no longer usable")]
    SourceConsumed { source_id: String },

    /// Session tokens can only be minted for active sessions.
    #[error("session is not active (status: {status})")]
    SessionNotActive { status: SessionStatus },

    /// The session belongs to a different tenant than the signing context.
    #[error("session tenant '{session_tenant}' does not match signing tenant '{signing_tenant}'")]
    TenantMismatch {
        session_tenant: String,
        signing_tenant: String,
    },

    /// Claim template error.
    #[error(transparent)]
    Claims(#[from] ClaimsError),

    /// Failed to create token.
    #[error("failed to create token: {0}")]
    CreationFailed(String),

    /// IO error (reading/writing keys).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TokenError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) => ErrorKind::Malformed,
            Self::SignatureInvalid => ErrorKind::SignatureInvalid,
            Self::Expired { .. } | Self::SourceConsumed { .. } => ErrorKind::Expired,
            Self::SessionNotActive { .. } => ErrorKind::SessionNotActive,
            Self::Claims(e) => e.kind(),
            Self::SigningKeyUnavailable { .. } | Self::TestingSecretUnavailable => {
                ErrorKind::SigningKeyUnavailable
            }
            Self::InvalidPrivateKey(_)
            | Self::InvalidPublicKey(_)
            | Self::TenantMismatch { .. }
            | Self::CreationFailed(_)
            | Self::IoError(_) => ErrorKind::Unexpected,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
            ErrorKind::InvalidToken => TokenError::Malformed("invalid JWT structure".into()),
            ErrorKind::InvalidAlgorithm => TokenError::Malformed("algorithm not supported".into()),
            ErrorKind::Base64(_) => TokenError::Malformed("invalid base64 segment".into()),
            ErrorKind::Json(e) => TokenError::Malformed(format!("invalid claims: {}", e)),
            ErrorKind::Utf8(_) => TokenError::Malformed("invalid UTF-8".into()),
            ErrorKind::MissingRequiredClaim(claim) => {
                TokenError::Malformed(format!("missing required claim: {}", claim))
            }
            ErrorKind::InvalidKeyFormat => {
                TokenError::InvalidPublicKey(err.to_string())
            }
            _ => TokenError::Malformed(format!("JWT error: {}", err)),
        }
    }
}
