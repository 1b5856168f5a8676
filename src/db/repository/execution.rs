//! Execution tree operations: visits, atoms, steps, datasets, and event
//! ingestion.
//!
//! Every mutation is one transaction. `insert_visit` abandons all
//! non-terminal atoms and steps of the observation, and `record_event`
//! validates timestamp monotonicity and applies the state-transition rules,
//! each atomically with its insert. Implementations without a SQL
//! transaction (the in-memory backend) use their write lock as the
//! transaction boundary.

use async_trait::async_trait;

use crate::db::models::{
    AtomRecord, DatasetRecord, ExecutionEventRecord, StepRecord, VisitRecord,
};
use crate::execution::events::ExecutionEvent;
use crate::models::{
    AtomId, DatasetId, DatasetQaState, ObservationId, StepId, Timestamp, VisitId,
};

use super::error::RepositoryResult;

#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    /// Insert a visit and abandon every non-terminal atom and step of the
    /// observation in the same transaction.
    async fn insert_visit(&self, visit: VisitRecord) -> RepositoryResult<()>;

    async fn get_visit(&self, id: VisitId) -> RepositoryResult<Option<VisitRecord>>;

    /// Visits of an observation, ordered by creation time.
    async fn list_visits(&self, observation_id: ObservationId)
        -> RepositoryResult<Vec<VisitRecord>>;

    async fn insert_atom(&self, atom: AtomRecord) -> RepositoryResult<()>;

    async fn get_atom(&self, id: AtomId) -> RepositoryResult<Option<AtomRecord>>;

    async fn list_atoms(&self, observation_id: ObservationId)
        -> RepositoryResult<Vec<AtomRecord>>;

    /// Insert a step, assigning the observation's next 1-based step index.
    /// The index on the passed record is ignored.
    async fn insert_step(&self, step: StepRecord) -> RepositoryResult<StepRecord>;

    async fn get_step(&self, id: StepId) -> RepositoryResult<Option<StepRecord>>;

    /// Steps of an observation in step-index order.
    async fn list_steps(&self, observation_id: ObservationId) -> RepositoryResult<Vec<StepRecord>>;

    /// Insert a dataset, minting its id. Fails with a conflict when the
    /// filename is already used within the observation.
    async fn insert_dataset(&self, dataset: DatasetRecord) -> RepositoryResult<DatasetRecord>;

    async fn get_dataset(&self, id: DatasetId) -> RepositoryResult<Option<DatasetRecord>>;

    /// Datasets of a visit, ordered by filename.
    async fn list_datasets(&self, visit_id: VisitId) -> RepositoryResult<Vec<DatasetRecord>>;

    /// Set a dataset's QA state and refresh the owning step's rollup.
    async fn set_dataset_qa(
        &self,
        id: DatasetId,
        qa_state: Option<DatasetQaState>,
    ) -> RepositoryResult<()>;

    /// Append an event and apply its state transitions atomically.
    ///
    /// Replaying an event with identical content is a no-op returning the
    /// original record. Fails when the timestamp is not strictly after the
    /// visit's latest event.
    async fn record_event(
        &self,
        event: ExecutionEvent,
        received: Timestamp,
    ) -> RepositoryResult<ExecutionEventRecord>;

    /// Events of a visit in timestamp order.
    async fn list_events(&self, visit_id: VisitId)
        -> RepositoryResult<Vec<ExecutionEventRecord>>;
}
