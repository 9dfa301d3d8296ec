//! Event sinks.

use crate::error::AuditError;
use crate::event::AuthEvent;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tessera_core::{EventSinkKind, EventsConfig};

/// Destination for events.
///
/// Sinks are called synchronously from within the operation that produced
/// the event; implementations should be quick and must be thread-safe.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn publish(&self, event: &AuthEvent) -> Result<(), AuditError>;
}

/// Create a sink based on configuration.
pub fn create_sink(config: &EventsConfig) -> Result<Arc<dyn EventSink>, AuditError> {
    if !config.enabled {
        return Ok(Arc::new(NullSink));
    }

    match config.sink {
        EventSinkKind::Null => Ok(Arc::new(NullSink)),
        EventSinkKind::Console => Ok(Arc::new(ConsoleSink)),
        EventSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                AuditError::InitializationFailed("file sink requires a path".to_string())
            })?;
            Ok(Arc::new(FileSink::new(path)?))
        }
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &AuthEvent) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Emits events as structured `tracing` records.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn publish(&self, event: &AuthEvent) -> Result<(), AuditError> {
        tracing::info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            tenant = %event.tenant_id,
            resource_id = %event.resource_id,
            "{}",
            event.to_log_line()
        );
        Ok(())
    }
}

/// Appends events to a JSON Lines file.
pub struct FileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSink {
    /// Create a file sink, creating the parent directory if needed.
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    /// The file events are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileSink {
    fn publish(&self, event: &AuthEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(event)?;

        let _guard = self
            .lock
            .lock()
            .map_err(|e| AuditError::SinkError(format!("Failed to acquire file lock: {}", e)))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Keeps events in memory; used by tests and embedded callers.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RwLock<Vec<AuthEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event received so far.
    pub fn events(&self) -> Vec<AuthEvent> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &AuthEvent) -> Result<(), AuditError> {
        let mut events = self
            .events
            .write()
            .map_err(|e| AuditError::SinkError(format!("Failed to acquire write lock: {}", e)))?;
        events.push(event.clone());
        Ok(())
    }
}
