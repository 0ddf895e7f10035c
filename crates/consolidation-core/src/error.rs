use thiserror::Error;

/// Fatal consolidation failures. Everything recoverable is reported through
/// the output envelope's warnings instead.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),
}
