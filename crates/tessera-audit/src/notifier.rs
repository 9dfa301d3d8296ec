//! Fire-and-forget event delivery.

use std::sync::Arc;
use tessera_core::EventsConfig;

use crate::error::AuditError;
use crate::event::AuthEvent;
use crate::sink::{EventSink, NullSink, create_sink};

/// Delivers events to a sink without ever failing the caller.
#[derive(Clone)]
pub struct EventNotifier {
    enabled: bool,
    sink: Arc<dyn EventSink>,
}

impl EventNotifier {
    /// Create a notifier from configuration.
    pub fn new(config: &EventsConfig) -> Result<Self, AuditError> {
        Ok(Self {
            enabled: config.enabled,
            sink: create_sink(config)?,
        })
    }

    /// Create a notifier with a custom sink.
    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self {
            enabled: true,
            sink,
        }
    }

    /// Create a disabled (no-op) notifier.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            sink: Arc::new(NullSink),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Deliver an event. Failures are logged and dropped.
    pub fn notify(&self, event: AuthEvent) {
        if !self.enabled {
            return;
        }

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            tenant = %event.tenant_id,
            resource_id = %event.resource_id,
            "Auth event"
        );

        if let Err(e) = self.sink.publish(&event) {
            tracing::warn!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                tenant = %event.tenant_id,
                error = %e,
                "Failed to deliver auth event"
            );
        }
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNotifier")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
