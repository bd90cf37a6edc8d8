//! JSON Schema validation for envelopes.
//!
//! Validation is an explicit step, run once per finished document rather
//! than on every emitted command. The schema itself is an external asset.

use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::Envelope;
use crate::error::{EtiketError, Result};

impl Envelope {
    /// Validate the serialized envelope against a schema file.
    pub fn validate(&self, schema_path: impl AsRef<Path>) -> Result<()> {
        let path = schema_path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            EtiketError::Payload(format!("Failed to read schema {}: {}", path.display(), e))
        })?;
        let schema: Value = serde_json::from_str(&text)
            .map_err(|e| EtiketError::Payload(format!("Invalid schema {}: {}", path.display(), e)))?;
        self.validate_against(&schema)
    }

    /// Validate the serialized envelope against an already-loaded schema.
    pub fn validate_against(&self, schema: &Value) -> Result<()> {
        validate_value(&self.to_value()?, schema)
    }
}

/// Validate any JSON value against a schema.
///
/// Every non-conforming instance path is reported in the returned
/// [`EtiketError::SchemaViolation`].
pub fn validate_value(instance: &Value, schema: &Value) -> Result<()> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|e| EtiketError::Payload(format!("Invalid schema: {}", e)))?;

    let violations: Vec<String> = match compiled.validate(instance) {
        Ok(()) => return Ok(()),
        Err(errors) => errors
            .map(|error| {
                let path = error.instance_path.to_string();
                let path = if path.is_empty() { "/".to_string() } else { path };
                format!("{}: {}", path, error)
            })
            .collect(),
    };

    Err(EtiketError::SchemaViolation { violations })
}
