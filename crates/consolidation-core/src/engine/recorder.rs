use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::runner::{ConsolidationInput, ConsolidationOutput};
use crate::types::ComputationOutput;
use crate::ConsolidationResult;

/// Identifier assigned by the run store on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunId(pub String);

/// Immutable snapshot of a run: the parameters it was invoked with and the
/// full result it produced, including accumulated warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub parameters: ConsolidationInput,
    pub recorded_at: DateTime<Utc>,
    pub output: ComputationOutput<ConsolidationOutput>,
}

/// Append-only run storage. The engine never reads prior runs back during
/// computation; a write failure is fatal to the run.
pub trait RunStore {
    fn save_run(&self, record: &RunRecord) -> ConsolidationResult<RunId>;
}

/// Persist a completed run. Storage errors propagate to the caller; no
/// partially recorded run is considered authoritative.
pub fn record_run(
    store: &dyn RunStore,
    parameters: &ConsolidationInput,
    output: &ComputationOutput<ConsolidationOutput>,
) -> ConsolidationResult<RunId> {
    let record = RunRecord {
        parameters: parameters.clone(),
        recorded_at: Utc::now(),
        output: output.clone(),
    };

    let run_id = store.save_run(&record)?;
    info!(run_id = %run_id.0, "consolidation run recorded");
    Ok(run_id)
}
