//! Error types for the audit crate.

use thiserror::Error;

/// Errors that can occur while delivering events.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to initialize a sink.
    #[error("failed to initialize event sink: {0}")]
    InitializationFailed(String),

    /// Sink-specific failure.
    #[error("sink error: {0}")]
    SinkError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
