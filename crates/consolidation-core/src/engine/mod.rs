pub mod recorder;
pub mod runner;

pub use recorder::{record_run, RunId, RunRecord, RunStore};
pub use runner::{run_consolidation, ConsolidationInput, ConsolidationOutput, ConsolidationSummary};
