//! Error types for lifecycle operations.

use chrono::{DateTime, Utc};
use tessera_core::ErrorKind;
use thiserror::Error;

use crate::session::SessionStatus;
use crate::store::StoreError;

/// Errors raised by mutating lifecycle operations.
///
/// Status computation never fails; only attempt recording, touches and
/// store-backed operations can.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The verification already failed or used up its attempts.
    #[error("verification no longer accepts attempts ({attempts}/{max_attempts} used)")]
    AttemptsExceeded { attempts: u32, max_attempts: u32 },

    /// The verification already succeeded (or awaits transfer consumption).
    #[error("verification has already been completed")]
    AlreadyVerified,

    /// The verification is past its deadline.
    #[error("verification expired at {expired_at}")]
    VerificationExpired { expired_at: DateTime<Utc> },

    /// The session is not active.
    #[error("session is not active (status: {status})")]
    SessionNotActive { status: SessionStatus },

    /// Record store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LifecycleError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AttemptsExceeded { .. } | Self::AlreadyVerified => ErrorKind::AttemptsExceeded,
            Self::VerificationExpired { .. } => ErrorKind::Expired,
            Self::SessionNotActive { .. } => ErrorKind::SessionNotActive,
            Self::Store(_) => ErrorKind::Unexpected,
        }
    }
}
