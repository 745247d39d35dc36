//! Strict schema validation of the parsed model output.
//!
//! Two layers, both fatal on failure: deserialization into
//! [`GeneratedSupport`] (field presence, types, unknown-field rejection)
//! and the contract's length/cardinality bounds. Nothing is coerced or
//! repaired — the caller treats a violation exactly like a parse failure.

use apoyo_core::error::PipelineError;
use apoyo_core::support::GeneratedSupport;

/// Validate a parsed JSON object against the output contract.
pub fn validate_support(value: &serde_json::Value) -> Result<GeneratedSupport, PipelineError> {
    let support: GeneratedSupport =
        serde_json::from_value(value.clone()).map_err(|e| PipelineError::SchemaViolation {
            detail: e.to_string(),
        })?;

    support.validate()?;
    Ok(support)
}
