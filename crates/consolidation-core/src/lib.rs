pub mod error;
pub mod types;

pub mod eliminations;
pub mod engine;
pub mod fx;
pub mod ledger;
pub mod merge;
pub mod minority;
pub mod statements;

pub use error::ConsolidationError;
pub use types::*;

/// Standard result type for all consolidation operations
pub type ConsolidationResult<T> = Result<T, ConsolidationError>;
