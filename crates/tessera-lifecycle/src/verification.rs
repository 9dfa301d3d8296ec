//! Verification status and attempt bookkeeping.
//!
//! A verification tracks one proof-of-possession challenge (a code, an OAuth
//! callback, a magic link). Records are never deleted; they form the audit
//! and anti-replay trail.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tessera_audit::{AuthEvent, AuthEventType, EventNotifier, ResourceKind};
use tessera_core::VerificationPolicy;
use tessera_core::config::MAX_LIFETIME_SECS;

use crate::error::LifecycleError;

/// How the challenge is proven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStrategy {
    EmailCode,
    PhoneCode,
    EmailLink,
    Oauth,
    Saml,
    Ticket,
    Password,
    Totp,
    BackupCode,
    Passkey,
    Web3Signature,
}

/// Derived verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Failed,
    Expired,
    Transferable,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unverified => write!(f, "unverified"),
            Self::Verified => write!(f, "verified"),
            Self::Failed => write!(f, "failed"),
            Self::Expired => write!(f, "expired"),
            Self::Transferable => write!(f, "transferable"),
        }
    }
}

/// Snapshot of the account transfer a verification points at.
///
/// Carrying the transfer's deadline on the record keeps status computation a
/// pure function of `(verification, now)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTransferRef {
    pub id: String,
    pub expire_at: DateTime<Utc>,
}

impl AccountTransferRef {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expire_at
    }
}

/// A verification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub id: String,
    pub tenant_id: String,
    pub strategy: VerificationStrategy,
    pub attempts: u32,
    pub max_attempts: u32,
    pub expire_at: DateTime<Utc>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub account_transfer: Option<AccountTransferRef>,
    /// Machine-readable code of the last failure (e.g. `incorrect_code`).
    #[serde(default)]
    pub error: Option<String>,
}

impl Verification {
    /// Start a new challenge.
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        strategy: VerificationStrategy,
        max_attempts: u32,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            strategy,
            attempts: 0,
            max_attempts,
            expire_at: now + ttl,
            verified_at: None,
            failed_at: None,
            account_transfer: None,
            error: None,
        }
    }

    /// Start a new challenge using a tenant's verification policy.
    pub fn from_policy(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        strategy: VerificationStrategy,
        policy: &VerificationPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let ttl = Duration::seconds(policy.ttl_secs.min(MAX_LIFETIME_SECS) as i64);
        Self::new(id, tenant_id, strategy, policy.max_attempts, ttl, now)
    }

    pub fn status(&self, now: DateTime<Utc>) -> VerificationStatus {
        compute_verification_status(self, now)
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }
}

/// Compute a verification's status.
///
/// Rules are evaluated in order; the first match wins:
///
/// 1. An account transfer is linked and has not expired: `transferable`.
///    This overrides everything else, including a recorded success, so a
///    completed OAuth leg cannot be consumed a second time as a plain
///    verification.
/// 2. A success was recorded: `verified`.
/// 3. A failure was recorded: `failed`.
/// 4. `now` is past `expire_at`: `expired`.
/// 5. Otherwise: `unverified`.
pub fn compute_verification_status(v: &Verification, now: DateTime<Utc>) -> VerificationStatus {
    if let Some(transfer) = &v.account_transfer {
        if !transfer.is_expired(now) {
            return VerificationStatus::Transferable;
        }
    }

    if v.verified_at.is_some() {
        return VerificationStatus::Verified;
    }

    if v.failed_at.is_some() {
        return VerificationStatus::Failed;
    }

    if now > v.expire_at {
        return VerificationStatus::Expired;
    }

    VerificationStatus::Unverified
}

/// Result of checking one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The proof was correct.
    Verified,
    /// The proof was wrong; further attempts are allowed until the limit.
    Incorrect { error: String },
    /// The challenge cannot succeed any more (e.g. the provider denied access).
    Terminal { error: String },
}

/// Attempt bookkeeping with event notification.
#[derive(Debug, Clone, Default)]
pub struct VerificationTracker {
    notifier: EventNotifier,
}

impl VerificationTracker {
    pub fn new(notifier: EventNotifier) -> Self {
        Self { notifier }
    }

    /// Current status; see [`compute_verification_status`].
    pub fn status(&self, v: &Verification, now: DateTime<Utc>) -> VerificationStatus {
        compute_verification_status(v, now)
    }

    /// Record one attempt and return the resulting status.
    ///
    /// Attempts are only accepted while the verification is `unverified`.
    /// The attempt counter is incremented for every accepted attempt; a
    /// terminal outcome, or an incorrect one that uses up the last attempt,
    /// sets `failed_at`.
    pub fn record_attempt(
        &self,
        v: &mut Verification,
        outcome: AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<VerificationStatus, LifecycleError> {
        match compute_verification_status(v, now) {
            VerificationStatus::Unverified => {}
            VerificationStatus::Verified | VerificationStatus::Transferable => {
                return Err(LifecycleError::AlreadyVerified);
            }
            VerificationStatus::Failed => {
                return Err(LifecycleError::AttemptsExceeded {
                    attempts: v.attempts,
                    max_attempts: v.max_attempts,
                });
            }
            VerificationStatus::Expired => {
                return Err(LifecycleError::VerificationExpired {
                    expired_at: v.expire_at,
                });
            }
        }

        if v.attempts >= v.max_attempts {
            return Err(LifecycleError::AttemptsExceeded {
                attempts: v.attempts,
                max_attempts: v.max_attempts,
            });
        }

        v.attempts += 1;

        let event_type = match outcome {
            AttemptOutcome::Verified => {
                v.verified_at = Some(now);
                v.failed_at = None;
                v.error = None;
                AuthEventType::VerificationVerified
            }
            AttemptOutcome::Incorrect { error } => {
                v.error = Some(error);
                if v.attempts >= v.max_attempts {
                    v.failed_at = Some(now);
                    AuthEventType::VerificationFailed
                } else {
                    AuthEventType::VerificationAttemptFailed
                }
            }
            AttemptOutcome::Terminal { error } => {
                v.error = Some(error);
                v.failed_at = Some(now);
                AuthEventType::VerificationFailed
            }
        };

        let status = compute_verification_status(v, now);

        tracing::debug!(
            verification_id = %v.id,
            tenant = %v.tenant_id,
            attempts = v.attempts,
            status = %status,
            "Verification attempt recorded"
        );

        self.emit(v, event_type, status, now);
        Ok(status)
    }

    /// Reset failure fields after a superseding success.
    ///
    /// Returns whether anything changed.
    pub fn clear_error(&self, v: &mut Verification, now: DateTime<Utc>) -> bool {
        if v.failed_at.is_none() && v.error.is_none() {
            return false;
        }

        v.failed_at = None;
        v.error = None;

        let status = compute_verification_status(v, now);
        self.emit(v, AuthEventType::VerificationErrorCleared, status, now);
        true
    }

    /// Link a pending account transfer.
    ///
    /// While the transfer is live the verification reports `transferable`.
    /// Consuming it must happen in the same transaction as provisioning the
    /// resulting account.
    pub fn attach_transfer(
        &self,
        v: &mut Verification,
        transfer: AccountTransferRef,
        now: DateTime<Utc>,
    ) -> VerificationStatus {
        let transfer_id = transfer.id.clone();
        v.account_transfer = Some(transfer);

        let status = compute_verification_status(v, now);
        self.notifier.notify(
            AuthEvent::builder(
                AuthEventType::AccountTransferAttached,
                v.tenant_id.clone(),
                ResourceKind::Verification,
                v.id.clone(),
                now,
            )
            .status(status)
            .meta(serde_json::json!({ "account_transfer_id": transfer_id }))
            .build(),
        );
        status
    }

    fn emit(
        &self,
        v: &Verification,
        event_type: AuthEventType,
        status: VerificationStatus,
        now: DateTime<Utc>,
    ) {
        let mut builder = AuthEvent::builder(
            event_type,
            v.tenant_id.clone(),
            ResourceKind::Verification,
            v.id.clone(),
            now,
        )
        .status(status);

        if let Some(error) = &v.error {
            builder = builder.reason(error.clone());
        }

        self.notifier.notify(builder.build());
    }
}
