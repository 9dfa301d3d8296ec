//! # tessera-audit
//!
//! Fire-and-forget notifications for status-affecting transitions.
//!
//! Lifecycle and credential operations report what happened (a verification
//! failed, a session was revoked, a token was rejected) through an
//! [`EventNotifier`]. Delivery never blocks or fails the primary operation:
//! sink errors are logged and dropped.
//!
//! ## Event Types
//!
//! | Event Type | Description |
//! |------------|-------------|
//! | `VerificationVerified` | A challenge attempt succeeded |
//! | `VerificationAttemptFailed` | A challenge attempt was incorrect |
//! | `VerificationFailed` | The challenge reached a terminal failure |
//! | `VerificationErrorCleared` | Failure fields reset after a superseding success |
//! | `AccountTransferAttached` | A pending account transfer was linked |
//! | `SessionRevoked` | A session was explicitly revoked |
//! | `SessionReplaced` | Single-session mode replaced a session |
//! | `SessionRemoved` | A session was removed (sign-out) |
//! | `SessionTouchRejected` | Activity was reported on an inactive session |
//! | `TicketIssued` | A ticket was minted |
//! | `TokenRejected` | A presented token failed verification |
//!
//! ## Example Usage
//!
//! ```rust
//! use tessera_audit::{AuthEvent, AuthEventType, EventNotifier, MemorySink, ResourceKind};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let notifier = EventNotifier::with_sink(sink.clone());
//!
//! notifier.notify(
//!     AuthEvent::builder(
//!         AuthEventType::SessionRevoked,
//!         "ins_123",
//!         ResourceKind::Session,
//!         "sess_abc",
//!         chrono::Utc::now(),
//!     )
//!     .subject("user_1")
//!     .build(),
//! );
//!
//! assert_eq!(sink.events().len(), 1);
//! ```

pub mod error;
pub mod event;
pub mod notifier;
pub mod sink;

pub use error::AuditError;
pub use event::{AuthEvent, AuthEventBuilder, AuthEventType, ResourceKind};
pub use notifier::EventNotifier;
pub use sink::{ConsoleSink, EventSink, FileSink, MemorySink, NullSink, create_sink};
