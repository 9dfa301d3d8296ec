//! Session status and activity bookkeeping.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tessera_audit::{AuthEvent, AuthEventType, EventNotifier, ResourceKind};
use tessera_core::SessionPolicy;

use crate::error::LifecycleError;
use crate::store::SessionStore;

/// Derived session status.
///
/// `revoked`, `replaced` and `removed` come from explicit terminal flags;
/// `active` and `expired` are derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Expired,
    Removed,
    Replaced,
    Revoked,
}

impl SessionStatus {
    /// Whether the status can never change again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
            Self::Removed => write!(f, "removed"),
            Self::Replaced => write!(f, "replaced"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

/// A session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub user_id: String,
    #[serde(default)]
    pub active_organization_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    /// Absolute lifetime in seconds, measured from `created_at`.
    pub time_to_expire: u64,
    /// Sliding inactivity window in seconds; `0` disables it.
    pub inactivity_timeout: u64,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub replaced_by_session_id: Option<String>,
    #[serde(default)]
    pub removed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session at sign-in using the tenant's session policy.
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        user_id: impl Into<String>,
        policy: &SessionPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            user_id: user_id.into(),
            active_organization_id: None,
            created_at: now,
            last_active_at: now,
            time_to_expire: policy.time_to_expire_secs,
            inactivity_timeout: policy.inactivity_timeout_secs,
            revoked_at: None,
            replaced_by_session_id: None,
            removed_at: None,
        }
    }

    /// The absolute ceiling. Activity never moves it.
    pub fn expire_at(&self) -> DateTime<Utc> {
        add_secs(self.created_at, self.time_to_expire)
    }

    /// When the session lapses for inactivity, if the window is enabled.
    pub fn inactivity_deadline(&self) -> Option<DateTime<Utc>> {
        if self.inactivity_timeout == 0 {
            return None;
        }
        Some(add_secs(self.last_active_at, self.inactivity_timeout))
    }

    /// The earliest instant at which the session stops being active.
    pub fn effective_deadline(&self) -> DateTime<Utc> {
        match self.inactivity_deadline() {
            Some(idle) => idle.min(self.expire_at()),
            None => self.expire_at(),
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> SessionStatus {
        compute_session_status(self, now)
    }
}

/// `at + secs`, saturating at the latest representable instant.
fn add_secs(at: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Compute a session's status.
///
/// Rules are evaluated in order; the first match wins:
///
/// 1. `revoked_at` set: `revoked`.
/// 2. `replaced_by_session_id` set: `replaced`.
/// 3. `removed_at` set: `removed`.
/// 4. `now` past the absolute ceiling (`created_at + time_to_expire`), or
///    past the inactivity window since `last_active_at` when enabled:
///    `expired`.
/// 5. Otherwise: `active`.
pub fn compute_session_status(s: &Session, now: DateTime<Utc>) -> SessionStatus {
    if s.revoked_at.is_some() {
        return SessionStatus::Revoked;
    }

    if s.replaced_by_session_id.is_some() {
        return SessionStatus::Replaced;
    }

    if s.removed_at.is_some() {
        return SessionStatus::Removed;
    }

    if now > s.expire_at() {
        return SessionStatus::Expired;
    }

    if let Some(idle_deadline) = s.inactivity_deadline() {
        if now > idle_deadline {
            return SessionStatus::Expired;
        }
    }

    SessionStatus::Active
}

/// Activity, revocation and replacement bookkeeping with event notification.
#[derive(Debug, Clone, Default)]
pub struct SessionLifecycle {
    notifier: EventNotifier,
}

impl SessionLifecycle {
    pub fn new(notifier: EventNotifier) -> Self {
        Self { notifier }
    }

    /// Current status; see [`compute_session_status`].
    pub fn status(&self, s: &Session, now: DateTime<Utc>) -> SessionStatus {
        compute_session_status(s, now)
    }

    /// Record activity on an active session.
    ///
    /// Slides the inactivity window forward; the absolute ceiling is fixed.
    pub fn touch(&self, s: &mut Session, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.require_active(s, now)?;

        if now > s.last_active_at {
            s.last_active_at = now;
        }

        tracing::debug!(session_id = %s.id, tenant = %s.tenant_id, "Session touched");
        Ok(())
    }

    /// Switch the session's active organization.
    pub fn set_active_organization(
        &self,
        s: &mut Session,
        organization_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        self.touch(s, now)?;
        s.active_organization_id = organization_id;
        Ok(())
    }

    /// Revoke the session. Idempotent; returns whether this call revoked it.
    pub fn revoke(&self, s: &mut Session, now: DateTime<Utc>) -> bool {
        if s.revoked_at.is_some() {
            return false;
        }

        s.revoked_at = Some(now);
        tracing::debug!(session_id = %s.id, tenant = %s.tenant_id, "Session revoked");
        self.emit(s, AuthEventType::SessionRevoked, now, None);
        true
    }

    /// Remove the session (sign-out). No-op unless the session is active.
    pub fn remove(&self, s: &mut Session, now: DateTime<Utc>) -> bool {
        if compute_session_status(s, now) != SessionStatus::Active {
            return false;
        }

        s.removed_at = Some(now);
        self.emit(s, AuthEventType::SessionRemoved, now, None);
        true
    }

    /// Mark the session as replaced by another. No-op unless active.
    pub fn replace(&self, s: &mut Session, replaced_by: &str, now: DateTime<Utc>) -> bool {
        if compute_session_status(s, now) != SessionStatus::Active {
            return false;
        }

        s.replaced_by_session_id = Some(replaced_by.to_string());
        self.emit(s, AuthEventType::SessionReplaced, now, Some(replaced_by));
        true
    }

    /// Single-session mode: replace every other active session of the same
    /// user in the same tenant with `new_session`.
    ///
    /// Returns the IDs of the sessions that were replaced.
    pub fn enforce_single_session(
        &self,
        new_session: &Session,
        others: &mut [Session],
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut replaced = Vec::new();

        for other in others.iter_mut() {
            if other.id == new_session.id
                || other.user_id != new_session.user_id
                || other.tenant_id != new_session.tenant_id
            {
                continue;
            }

            if self.replace(other, &new_session.id, now) {
                replaced.push(other.id.clone());
            }
        }

        replaced
    }

    /// Persist a freshly created session and, when the tenant runs in
    /// single-session mode, replace the user's other active sessions.
    ///
    /// Must be called inside the caller's transaction.
    pub fn activate(
        &self,
        store: &dyn SessionStore,
        session: &Session,
        policy: &SessionPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, LifecycleError> {
        store.update(session)?;

        if !policy.single_session_mode {
            return Ok(Vec::new());
        }

        let mut others = store.sessions_for_user(&session.tenant_id, &session.user_id)?;
        let replaced = self.enforce_single_session(session, &mut others, now);

        for other in others.iter().filter(|o| replaced.contains(&o.id)) {
            store.update(other)?;
        }

        if !replaced.is_empty() {
            tracing::debug!(
                session_id = %session.id,
                tenant = %session.tenant_id,
                replaced = replaced.len(),
                "Single-session mode replaced sessions"
            );
        }

        Ok(replaced)
    }

    fn require_active(&self, s: &Session, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        let status = compute_session_status(s, now);
        if status == SessionStatus::Active {
            return Ok(());
        }

        tracing::warn!(
            session_id = %s.id,
            tenant = %s.tenant_id,
            status = %status,
            "Rejected activity on inactive session"
        );
        self.notifier.notify(
            AuthEvent::builder(
                AuthEventType::SessionTouchRejected,
                s.tenant_id.clone(),
                ResourceKind::Session,
                s.id.clone(),
                now,
            )
            .subject(s.user_id.clone())
            .status(status)
            .build(),
        );
        Err(LifecycleError::SessionNotActive { status })
    }

    fn emit(
        &self,
        s: &Session,
        event_type: AuthEventType,
        now: DateTime<Utc>,
        replaced_by: Option<&str>,
    ) {
        let mut builder = AuthEvent::builder(
            event_type,
            s.tenant_id.clone(),
            ResourceKind::Session,
            s.id.clone(),
            now,
        )
        .subject(s.user_id.clone())
        .status(compute_session_status(s, now));

        if let Some(replaced_by) = replaced_by {
            builder = builder.replaced_by(replaced_by);
        }

        self.notifier.notify(builder.build());
    }
}
