use serde_json::Value;
use thiserror::Error;

/// Main error type for Cuttle operations
#[derive(Error, Debug)]
pub enum CuttleError {
    /// A structural problem in the query model, detected before any network
    /// call: unknown operator, leading OR, missing keyword variant, duplicate
    /// inner-hits path, malformed bound.
    #[error("Invalid query parameter: {0}")]
    Parameter(String),

    /// The engine rejected or failed to execute an otherwise well-formed
    /// compiled document. `reason` preserves the engine's diagnostic text
    /// verbatim; `details` carries the structured error body.
    #[error("Query failed: {reason}")]
    Query { reason: String, details: Value },

    /// Connectivity or timeout failure, propagated unchanged from the
    /// transport implementation.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Cuttle operations
pub type Result<T> = std::result::Result<T, CuttleError>;

impl CuttleError {
    /// Build a parameter error with a formatted message
    pub fn parameter(msg: impl Into<String>) -> Self {
        CuttleError::Parameter(msg.into())
    }

    /// Decode an engine error envelope into a `Query` error
    ///
    /// Engines report failures as `{ "error": { "type": ..., "reason": ...,
    /// "root_cause": [...] }, "status": ... }`. The reason string is kept
    /// verbatim and the whole envelope is retained for programmatic handling.
    pub fn from_engine_response(body: &Value) -> Self {
        let error = body.get("error");
        let reason = error
            .and_then(|e| match e {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => map
                    .get("reason")
                    .and_then(|r| r.as_str())
                    .map(String::from),
                _ => None,
            })
            .unwrap_or_else(|| "unknown engine error".to_string());

        CuttleError::Query {
            reason,
            details: error.cloned().unwrap_or(Value::Null),
        }
    }

    /// The engine error type (e.g. `parsing_exception`), when present
    pub fn engine_error_type(&self) -> Option<&str> {
        match self {
            CuttleError::Query { details, .. } => {
                details.get("type").and_then(|t| t.as_str())
            }
            _ => None,
        }
    }

    /// Check if this error was raised before any network call
    pub fn is_parameter(&self) -> bool {
        matches!(self, CuttleError::Parameter(_))
    }
}
