//! Error taxonomy shared by every Tessera crate.
//!
//! Crate-level error enums stay specific (they carry context for logs), but
//! each one classifies itself into an [`ErrorKind`] so callers can decide how
//! to respond without matching on crate internals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The credential could not be decoded.
    Malformed,
    /// The credential's signature did not verify against any accepted key.
    SignatureInvalid,
    /// The credential or challenge is past its deadline.
    Expired,
    /// The challenge no longer accepts attempts.
    AttemptsExceeded,
    /// The session is not in the `active` state.
    SessionNotActive,
    /// A claim template tried to bind a reserved claim.
    ReservedClaimCollision,
    /// No signing key material is available for the tenant.
    SigningKeyUnavailable,
    /// Anything else: persistence failures, invariant breaches, I/O.
    Unexpected,
}

impl ErrorKind {
    /// Authentication failures caused by what the credential holder presented.
    pub fn is_client_facing(self) -> bool {
        matches!(
            self,
            Self::Malformed | Self::SignatureInvalid | Self::Expired
        )
    }

    /// Business-rule rejections that deserve a user-facing explanation.
    pub fn is_business_rule(self) -> bool {
        matches!(self, Self::AttemptsExceeded | Self::SessionNotActive)
    }

    /// Whether an automatic retry could succeed.
    ///
    /// Authentication failures and business rejections never change on retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Unexpected)
    }

    /// Text that is safe to show to the credential holder.
    pub fn public_message(self) -> &'static str {
        match self {
            Self::Malformed => "The provided token is malformed.",
            Self::SignatureInvalid => "The provided token could not be verified.",
            Self::Expired => "The provided token or code has expired.",
            Self::AttemptsExceeded => "Too many failed attempts. Start a new verification.",
            Self::SessionNotActive => "This session is no longer active.",
            Self::ReservedClaimCollision => "The claims template uses a reserved claim.",
            Self::SigningKeyUnavailable | Self::Unexpected => {
                "Something went wrong. Please try again later."
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Malformed => "malformed",
            Self::SignatureInvalid => "signature_invalid",
            Self::Expired => "expired",
            Self::AttemptsExceeded => "attempts_exceeded",
            Self::SessionNotActive => "session_not_active",
            Self::ReservedClaimCollision => "reserved_claim_collision",
            Self::SigningKeyUnavailable => "signing_key_unavailable",
            Self::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ErrorKind::Expired.is_client_facing());
        assert!(!ErrorKind::Expired.is_retryable());
        assert!(ErrorKind::SessionNotActive.is_business_rule());
        assert!(!ErrorKind::SigningKeyUnavailable.is_client_facing());
    }

    #[test]
    fn test_internal_failures_share_generic_message() {
        assert_eq!(
            ErrorKind::SigningKeyUnavailable.public_message(),
            ErrorKind::Unexpected.public_message()
        );
        assert_eq!(ErrorKind::ReservedClaimCollision.to_string(), "reserved_claim_collision");
    }
}
