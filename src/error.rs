//! # Error Types
//!
//! This module defines error types used throughout the etiket library.
//!
//! Runtime payloads (envelopes arriving over the wire or from disk) are
//! untrusted and fail loudly. Templates are trusted static assets: malformed
//! numeric attributes in a template degrade to defaults instead of raising.

use thiserror::Error;

/// Main error type for etiket operations
#[derive(Debug, Error)]
pub enum EtiketError {
    /// Input is neither valid JSON nor a readable JSON file
    #[error("Payload error: {0}")]
    Payload(String),

    /// Envelope does not conform to the command schema
    #[error("Schema violation: {}", violations.join("; "))]
    SchemaViolation { violations: Vec<String> },

    /// Structurally invalid envelope or command entry
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Command name outside the fixed command set
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    /// Device call made outside an open driver session
    #[error("Printer not connected (device calls must run inside a session)")]
    NotConnected,

    /// A required numeric field could not be coerced to a number
    #[error("Field '{field}' must be numeric, got {value}")]
    NumericCoercion { field: String, value: String },

    /// Template document could not be parsed
    #[error("Template error: {0}")]
    Template(String),

    /// Template registry lookup miss
    #[error("Unknown template '{name}'. Available templates: {}", available.join(", "))]
    UnknownTemplate {
        name: String,
        available: Vec<String>,
    },

    /// Transport-level errors (connection, socket writes)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, EtiketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_lists_paths() {
        let err = EtiketError::SchemaViolation {
            violations: vec!["/commands/0: bad".into(), "/width: bad".into()],
        };
        assert_eq!(
            err.to_string(),
            "Schema violation: /commands/0: bad; /width: bad"
        );
    }

    #[test]
    fn test_unknown_template_lists_available() {
        let err = EtiketError::UnknownTemplate {
            name: "nope".into(),
            available: vec!["demo".into(), "scleral_v4".into()],
        };
        assert!(err.to_string().contains("demo, scleral_v4"));
    }
}
