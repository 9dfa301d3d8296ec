//! Event types.
//!
//! Format follows: [tenant - resource - event - status] with optional
//! subject, reason and replacement details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventType {
    // ===== Verification events =====
    VerificationVerified,
    VerificationAttemptFailed,
    VerificationFailed,
    VerificationErrorCleared,
    AccountTransferAttached,

    // ===== Session events =====
    SessionRevoked,
    SessionReplaced,
    SessionRemoved,
    SessionTouchRejected,

    // ===== Credential events =====
    TicketIssued,
    TokenRejected,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VerificationVerified => write!(f, "VERIFICATION_VERIFIED"),
            Self::VerificationAttemptFailed => write!(f, "VERIFICATION_ATTEMPT_FAILED"),
            Self::VerificationFailed => write!(f, "VERIFICATION_FAILED"),
            Self::VerificationErrorCleared => write!(f, "VERIFICATION_ERROR_CLEARED"),
            Self::AccountTransferAttached => write!(f, "ACCOUNT_TRANSFER_ATTACHED"),
            Self::SessionRevoked => write!(f, "SESSION_REVOKED"),
            Self::SessionReplaced => write!(f, "SESSION_REPLACED"),
            Self::SessionRemoved => write!(f, "SESSION_REMOVED"),
            Self::SessionTouchRejected => write!(f, "SESSION_TOUCH_REJECTED"),
            Self::TicketIssued => write!(f, "TICKET_ISSUED"),
            Self::TokenRejected => write!(f, "TOKEN_REJECTED"),
        }
    }
}

/// The kind of record an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Verification,
    Session,
    Ticket,
    SessionToken,
    TestingToken,
}

/// A status-affecting event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the transition happened (taken from the injected clock).
    pub occurred_at: DateTime<Utc>,

    pub event_type: AuthEventType,

    /// Tenant the resource belongs to.
    pub tenant_id: String,

    pub resource_kind: ResourceKind,

    /// ID of the verification, session or token source.
    pub resource_id: String,

    /// User (or other subject) the resource belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,

    /// Status after the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Failure or rejection reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Replacing session ID (for `SessionReplaced`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,

    /// Additional metadata.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

impl AuthEvent {
    /// Create a new event with the given type and core fields.
    pub fn new(
        event_type: AuthEventType,
        tenant_id: impl Into<String>,
        resource_kind: ResourceKind,
        resource_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            event_type,
            tenant_id: tenant_id.into(),
            resource_kind,
            resource_id: resource_id.into(),
            subject_id: None,
            status: None,
            reason: None,
            replaced_by: None,
            meta: serde_json::Value::Null,
        }
    }

    /// Create a builder for an event.
    pub fn builder(
        event_type: AuthEventType,
        tenant_id: impl Into<String>,
        resource_kind: ResourceKind,
        resource_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> AuthEventBuilder {
        AuthEventBuilder {
            event: Self::new(event_type, tenant_id, resource_kind, resource_id, occurred_at),
        }
    }

    /// Format the event as a human-readable log line.
    ///
    /// Format: `[timestamp] EVENT_TYPE tenant=... resource=kind:id [subject=...] [status=...]`
    pub fn to_log_line(&self) -> String {
        let kind = serde_json::to_value(self.resource_kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        let mut line = format!(
            "[{}] {} tenant={} resource={}:{}",
            self.occurred_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.event_type,
            self.tenant_id,
            kind,
            self.resource_id,
        );

        if let Some(ref subject) = self.subject_id {
            line.push_str(&format!(" subject={}", subject));
        }
        if let Some(ref status) = self.status {
            line.push_str(&format!(" status={}", status));
        }
        if let Some(ref replaced_by) = self.replaced_by {
            line.push_str(&format!(" replaced_by={}", replaced_by));
        }
        if let Some(ref reason) = self.reason {
            line.push_str(&format!(" reason=\"{}\"", reason.replace('"', "'")));
        }

        line
    }
}

/// Builder for events.
#[derive(Debug)]
pub struct AuthEventBuilder {
    event: AuthEvent,
}

impl AuthEventBuilder {
    pub fn subject(mut self, subject_id: impl Into<String>) -> Self {
        self.event.subject_id = Some(subject_id.into());
        self
    }

    pub fn status(mut self, status: impl ToString) -> Self {
        self.event.status = Some(status.to_string());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.event.reason = Some(reason.into());
        self
    }

    pub fn replaced_by(mut self, session_id: impl Into<String>) -> Self {
        self.event.replaced_by = Some(session_id.into());
        self
    }

    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.event.meta = meta;
        self
    }

    pub fn build(self) -> AuthEvent {
        self.event
    }
}
