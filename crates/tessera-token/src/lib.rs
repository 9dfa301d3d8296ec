//! # tessera-token
//!
//! Signed, short-lived credentials.
//!
//! | Credential | Format | Signed with | Verified by |
//! |------------|--------|-------------|-------------|
//! | **Ticket** | JWT, `typ: ticket+jwt` | tenant Ed25519 key | [`CredentialIssuer::verify_ticket`] |
//! | **Session token** | JWT, `typ: JWT` | tenant Ed25519 key | [`verify_token`] |
//! | **Testing token** | `<window>-<mac>` | shared HMAC secret | [`TestingTokenIssuer::verify`] |
//!
//! Credentials are write-once and verified statelessly. A ticket stops being
//! usable when it expires or when the record it points at was consumed.
//!
//! ## Keys
//!
//! Every tenant has a [`TenantKeyring`]: the current signing key plus the
//! previous key, which keeps verifying for a configured grace period after a
//! rotation. The `kid` header selects the key.
//!
//! ## Time
//!
//! Nothing here reads the wall clock. Every issue and verify call takes
//! `now`, and expiry is checked against it (a token is expired once
//! `now >= exp`).

pub mod claims;
pub mod error;
pub mod issuer;
pub mod keys;
pub mod testing;

pub use claims::{SessionTokenClaims, SourceType, TicketClaims, TicketRequest, TokenClaims};
pub use error::TokenError;
pub use issuer::{
    CredentialIssuer, IssuedToken, SigningContext, TicketSourceLookup, verify_token,
    verify_with_keys,
};
pub use keys::{
    ConfigKeyProvider, KeyProvider, RetiredKey, SigningKeyPair, StaticKeyProvider, TenantKeyring,
    VerificationKey,
};
pub use testing::TestingTokenIssuer;
