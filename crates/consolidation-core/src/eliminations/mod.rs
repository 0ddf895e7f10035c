pub mod detector;
pub mod processor;

pub use detector::{detect_eliminations, EliminationEntry, EliminationKind};
pub use processor::{apply_eliminations, EliminationOutcome, UnresolvedElimination};
