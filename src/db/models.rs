//! Persisted execution records.
//!
//! The execution tree is stored flat: atoms reference their visit, steps
//! their atom, datasets their step. No back-references are kept; the tree
//! is reconstructed by indexed scans.

use serde::{Deserialize, Serialize};

use crate::execution::events::ExecutionEvent;
use crate::models::{
    AtomExecutionState, AtomId, DatasetFilename, DatasetId, DatasetQaState, DynamicConfig,
    Instrument, ObservationId, ObserveClass, SequenceType, Site, StaticConfig, StepConfig,
    StepExecutionState, StepId, TimeSpan, Timestamp, VisitId,
};

/// One physical telescope session against one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: VisitId,
    pub observation_id: ObservationId,
    pub instrument: Instrument,
    pub site: Site,
    pub static_config: StaticConfig,
    pub created_at: Timestamp,
}

/// A recorded atom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomRecord {
    pub id: AtomId,
    pub visit_id: VisitId,
    pub observation_id: ObservationId,
    pub instrument: Instrument,
    pub sequence_type: SequenceType,
    pub step_count: u16,
    pub execution_state: AtomExecutionState,
    /// Link back to the generator output this atom realizes, when known.
    pub generated_id: Option<String>,
}

/// A recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: StepId,
    pub atom_id: AtomId,
    pub visit_id: VisitId,
    pub observation_id: ObservationId,
    pub instrument: Instrument,
    /// 1-based, monotonically increasing per observation.
    pub step_index: u32,
    pub dynamic_config: DynamicConfig,
    pub step_config: StepConfig,
    pub observe_class: ObserveClass,
    pub execution_state: StepExecutionState,
    pub generated_id: Option<String>,
    pub time_estimate: TimeSpan,
    pub completed_at: Option<Timestamp>,
    /// Worst QA state over the step's datasets, once assessed.
    pub qa_state: Option<DatasetQaState>,
}

/// A recorded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: DatasetId,
    pub step_id: StepId,
    pub atom_id: AtomId,
    pub visit_id: VisitId,
    pub observation_id: ObservationId,
    pub filename: DatasetFilename,
    pub qa_state: Option<DatasetQaState>,
}

/// A persisted execution event.
///
/// The `(checksum, received)` pair keys idempotent ingestion: replaying the
/// same event content is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEventRecord {
    pub id: u64,
    pub observation_id: ObservationId,
    pub event: ExecutionEvent,
    pub received: Timestamp,
    pub checksum: String,
}

/// Cached execution digest, keyed by observation and input hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestCacheRecord {
    pub observation_id: ObservationId,
    pub hash: String,
    pub digest: crate::sequence::ExecutionDigest,
}
