//! # tessera-lifecycle
//!
//! Status computation and bookkeeping for verifications and sessions.
//!
//! Status is never stored. It is derived from the record and a clock reading
//! every time it is needed:
//!
//! | Record | Statuses | Derived from |
//! |--------|----------|--------------|
//! | [`Verification`] | unverified, verified, failed, expired, transferable | transfer link, outcome timestamps, `expire_at` |
//! | [`Session`] | active, expired, removed, replaced, revoked | terminal flags, absolute and inactivity deadlines |
//!
//! The status functions ([`compute_verification_status`],
//! [`compute_session_status`]) are pure and total. The mutating primitives on
//! [`VerificationTracker`] and [`SessionLifecycle`] must run inside the same
//! transaction as whatever the caller does with the result; this crate owns
//! the primitives, the caller owns the transaction boundary.

pub mod error;
pub mod session;
pub mod store;
pub mod verification;

pub use error::LifecycleError;
pub use session::{Session, SessionLifecycle, SessionStatus, compute_session_status};
pub use store::{
    MemorySessionStore, MemoryVerificationStore, SessionStore, StoreError, VerificationStore,
};
pub use verification::{
    AccountTransferRef, AttemptOutcome, Verification, VerificationStatus, VerificationStrategy,
    VerificationTracker, compute_verification_status,
};
