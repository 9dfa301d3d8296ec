//! Error types for claim templates.

use tessera_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The template is not a JSON object.
    #[error("claim template must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    /// The template binds a claim the issuer stamps itself.
    #[error("claim '{claim}' is reserved and cannot be set by a template")]
    ReservedClaimCollision { claim: String },

    /// A `{{` without a matching `}}`.
    #[error("unterminated shortcode in claim '{claim}'")]
    UnterminatedShortcode { claim: String },

    /// `{{}}` with nothing inside.
    #[error("empty shortcode in claim '{claim}'")]
    EmptyShortcode { claim: String },

    #[error("invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClaimsError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReservedClaimCollision { .. } => ErrorKind::ReservedClaimCollision,
            _ => ErrorKind::Malformed,
        }
    }
}
