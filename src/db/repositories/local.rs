//! In-memory local repository implementation.
//!
//! Implements all repository traits over process memory, for unit testing
//! and local development. The single write lock doubles as the transaction
//! boundary: every mutating method reads, validates, and writes while
//! holding it, so multi-table updates are atomic and event ingestion for
//! one observation is serialized.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::accounting::TimeChargeCorrection;
use crate::db::checksum::event_checksum;
use crate::db::models::{
    AtomRecord, DatasetRecord, DigestCacheRecord, ExecutionEventRecord, StepRecord, VisitRecord,
};
use crate::db::repository::{
    AccountingRepository, DigestRepository, ErrorContext, ExecutionRepository,
    ObservationDefinition, ObservationRepository, RepositoryError, RepositoryResult,
};
use crate::execution::events::ExecutionEvent;
use crate::execution::recorder::{abandon_all, plan_transitions, TransitionError, TransitionPlan};
use crate::itc::ItcResult;
use crate::models::{
    AtomId, DatasetId, DatasetQaState, Observation, ObservationId, ProgramId, StepId, Timestamp,
    UserWorkflowState, VisitId,
};
use crate::sequence::ExecutionDigest;

/// In-memory local repository.
///
/// Cloning shares the underlying store, mirroring a pooled connection
/// handle.
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

#[derive(Default)]
struct LocalData {
    observations: Vec<Observation>,
    visits: Vec<VisitRecord>,
    atoms: Vec<AtomRecord>,
    steps: Vec<StepRecord>,
    datasets: Vec<DatasetRecord>,
    events: Vec<ExecutionEventRecord>,
    corrections: HashMap<VisitId, Vec<TimeChargeCorrection>>,
    digest_cache: HashMap<(ObservationId, String), ExecutionDigest>,
    itc_cache: HashMap<ObservationId, ItcResult>,

    // ID counters
    next_observation_id: u64,
    next_dataset_id: u64,
    next_event_id: u64,
    next_step_index: HashMap<ObservationId, u32>,

    // Connection health
    unhealthy: bool,
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> LocalRepository {
        LocalRepository::default()
    }

    /// Simulate connection failures in tests.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().unhealthy = !healthy;
    }

    /// Clear all data, keeping the health flag.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let unhealthy = data.unhealthy;
        *data = LocalData {
            unhealthy,
            ..Default::default()
        };
    }

    pub fn observation_count(&self) -> usize {
        self.data.read().observations.len()
    }

    fn check_health(data: &LocalData) -> RepositoryResult<()> {
        if data.unhealthy {
            return Err(RepositoryError::connection_with_context(
                "database is not healthy",
                ErrorContext::new("check_health").retryable(),
            ));
        }
        Ok(())
    }

    fn apply_plan(data: &mut LocalData, plan: &TransitionPlan) {
        for (atom_id, state) in &plan.atoms {
            if let Some(atom) = data.atoms.iter_mut().find(|a| a.id == *atom_id) {
                atom.execution_state = *state;
            }
        }
        for (step_id, state, completed_at) in &plan.steps {
            if let Some(step) = data.steps.iter_mut().find(|s| s.id == *step_id) {
                step.execution_state = *state;
                if completed_at.is_some() {
                    step.completed_at = *completed_at;
                }
            }
        }
    }
}

#[async_trait]
impl ObservationRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(!self.data.read().unhealthy)
    }

    async fn create_observation(
        &self,
        definition: ObservationDefinition,
    ) -> RepositoryResult<Observation> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.next_observation_id += 1;
        let id = ObservationId::new(data.next_observation_id);
        let observation = definition.into_observation(id);
        data.observations.push(observation.clone());
        Ok(observation)
    }

    async fn get_observation(&self, id: ObservationId) -> RepositoryResult<Option<Observation>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data.observations.iter().find(|o| o.id == id).cloned())
    }

    async fn list_observations(
        &self,
        program_id: ProgramId,
        limit: u32,
    ) -> RepositoryResult<Vec<Observation>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let mut observations: Vec<Observation> = data
            .observations
            .iter()
            .filter(|o| o.program_id == program_id)
            .cloned()
            .collect();
        observations.sort_by_key(|o| o.id);
        observations.truncate(limit as usize);
        Ok(observations)
    }

    async fn update_observation(&self, observation: &Observation) -> RepositoryResult<()> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        match data.observations.iter_mut().find(|o| o.id == observation.id) {
            Some(existing) => {
                *existing = observation.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found_with_context(
                "observation not found",
                ErrorContext::new("update_observation")
                    .with_entity("observation")
                    .with_entity_id(observation.id),
            )),
        }
    }

    async fn set_user_state(
        &self,
        id: ObservationId,
        state: Option<UserWorkflowState>,
    ) -> RepositoryResult<()> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        match data.observations.iter_mut().find(|o| o.id == id) {
            Some(observation) => {
                observation.user_state = state;
                Ok(())
            }
            None => Err(RepositoryError::not_found_with_context(
                "observation not found",
                ErrorContext::new("set_user_state")
                    .with_entity("observation")
                    .with_entity_id(id),
            )),
        }
    }
}

#[async_trait]
impl ExecutionRepository for LocalRepository {
    async fn insert_visit(&self, visit: VisitRecord) -> RepositoryResult<()> {
        let mut data = self.data.write();
        Self::check_health(&data)?;

        // a new visit abandons everything still running for the observation
        let atoms: Vec<AtomRecord> = data
            .atoms
            .iter()
            .filter(|a| a.observation_id == visit.observation_id)
            .cloned()
            .collect();
        let steps: Vec<StepRecord> = data
            .steps
            .iter()
            .filter(|s| s.observation_id == visit.observation_id)
            .cloned()
            .collect();
        let plan = abandon_all(&atoms, &steps);
        Self::apply_plan(&mut data, &plan);

        data.visits.push(visit);
        Ok(())
    }

    async fn get_visit(&self, id: VisitId) -> RepositoryResult<Option<VisitRecord>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data.visits.iter().find(|v| v.id == id).cloned())
    }

    async fn list_visits(
        &self,
        observation_id: ObservationId,
    ) -> RepositoryResult<Vec<VisitRecord>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let mut visits: Vec<VisitRecord> = data
            .visits
            .iter()
            .filter(|v| v.observation_id == observation_id)
            .cloned()
            .collect();
        visits.sort_by_key(|v| v.created_at);
        Ok(visits)
    }

    async fn insert_atom(&self, atom: AtomRecord) -> RepositoryResult<()> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        if data.visits.iter().all(|v| v.id != atom.visit_id) {
            return Err(RepositoryError::not_found_with_context(
                "visit not found",
                ErrorContext::new("insert_atom")
                    .with_entity("visit")
                    .with_entity_id(atom.visit_id),
            ));
        }
        data.atoms.push(atom);
        Ok(())
    }

    async fn get_atom(&self, id: AtomId) -> RepositoryResult<Option<AtomRecord>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data.atoms.iter().find(|a| a.id == id).cloned())
    }

    async fn list_atoms(
        &self,
        observation_id: ObservationId,
    ) -> RepositoryResult<Vec<AtomRecord>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data
            .atoms
            .iter()
            .filter(|a| a.observation_id == observation_id)
            .cloned()
            .collect())
    }

    async fn insert_step(&self, mut step: StepRecord) -> RepositoryResult<StepRecord> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        if data.atoms.iter().all(|a| a.id != step.atom_id) {
            return Err(RepositoryError::not_found_with_context(
                "atom not found",
                ErrorContext::new("insert_step")
                    .with_entity("atom")
                    .with_entity_id(step.atom_id),
            ));
        }
        let index = data
            .next_step_index
            .entry(step.observation_id)
            .or_insert(0);
        *index += 1;
        step.step_index = *index;
        data.steps.push(step.clone());
        Ok(step)
    }

    async fn get_step(&self, id: StepId) -> RepositoryResult<Option<StepRecord>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data.steps.iter().find(|s| s.id == id).cloned())
    }

    async fn list_steps(&self, observation_id: ObservationId) -> RepositoryResult<Vec<StepRecord>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let mut steps: Vec<StepRecord> = data
            .steps
            .iter()
            .filter(|s| s.observation_id == observation_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.step_index);
        Ok(steps)
    }

    async fn insert_dataset(&self, mut dataset: DatasetRecord) -> RepositoryResult<DatasetRecord> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        if data
            .datasets
            .iter()
            .any(|d| d.observation_id == dataset.observation_id && d.filename == dataset.filename)
        {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "dataset filename '{}' already recorded for observation {}",
                    dataset.filename, dataset.observation_id
                ),
                ErrorContext::new("insert_dataset")
                    .with_entity("dataset")
                    .with_details(format!("filename={}", dataset.filename)),
            ));
        }
        data.next_dataset_id += 1;
        dataset.id = DatasetId::new(data.next_dataset_id);
        data.datasets.push(dataset.clone());
        Ok(dataset)
    }

    async fn get_dataset(&self, id: DatasetId) -> RepositoryResult<Option<DatasetRecord>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data.datasets.iter().find(|d| d.id == id).cloned())
    }

    async fn list_datasets(&self, visit_id: VisitId) -> RepositoryResult<Vec<DatasetRecord>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        let mut datasets: Vec<DatasetRecord> = data
            .datasets
            .iter()
            .filter(|d| d.visit_id == visit_id)
            .cloned()
            .collect();
        datasets.sort_by_key(|d| d.filename);
        Ok(datasets)
    }

    async fn set_dataset_qa(
        &self,
        id: DatasetId,
        qa_state: Option<DatasetQaState>,
    ) -> RepositoryResult<()> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        let step_id = {
            let dataset = data.datasets.iter_mut().find(|d| d.id == id).ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    "dataset not found",
                    ErrorContext::new("set_dataset_qa")
                        .with_entity("dataset")
                        .with_entity_id(id),
                )
            })?;
            dataset.qa_state = qa_state;
            dataset.step_id
        };

        // refresh the owning step's rollup: worst state over its datasets
        let rollup = data
            .datasets
            .iter()
            .filter(|d| d.step_id == step_id)
            .filter_map(|d| d.qa_state)
            .max();
        if let Some(step) = data.steps.iter_mut().find(|s| s.id == step_id) {
            step.qa_state = rollup;
        }
        Ok(())
    }

    async fn record_event(
        &self,
        event: ExecutionEvent,
        received: Timestamp,
    ) -> RepositoryResult<ExecutionEventRecord> {
        let mut data = self.data.write();
        Self::check_health(&data)?;

        let visit = data
            .visits
            .iter()
            .find(|v| v.id == event.visit_id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    "visit not found",
                    ErrorContext::new("record_event")
                        .with_entity("visit")
                        .with_entity_id(event.visit_id),
                )
            })?;

        let checksum = event_checksum(&event);
        if let Some(existing) = data
            .events
            .iter()
            .find(|e| e.event.visit_id == event.visit_id && e.checksum == checksum)
        {
            // idempotent replay
            return Ok(existing.clone());
        }

        if let Some(last) = data
            .events
            .iter()
            .filter(|e| e.event.visit_id == event.visit_id)
            .last()
        {
            if event.timestamp <= last.event.timestamp {
                return Err(RepositoryError::validation_with_context(
                    format!(
                        "event timestamp {} is not after the visit's latest event {}",
                        event.timestamp, last.event.timestamp
                    ),
                    ErrorContext::new("record_event")
                        .with_entity("visit")
                        .with_entity_id(event.visit_id)
                        .with_details(format!("latest={}", last.event.timestamp)),
                ));
            }
        }

        let atoms: Vec<AtomRecord> = data
            .atoms
            .iter()
            .filter(|a| a.observation_id == visit.observation_id)
            .cloned()
            .collect();
        let steps: Vec<StepRecord> = data
            .steps
            .iter()
            .filter(|s| s.observation_id == visit.observation_id)
            .cloned()
            .collect();
        let plan = plan_transitions(&event, &atoms, &steps).map_err(|e| match e {
            TransitionError::AtomNotFound(id) => RepositoryError::not_found_with_context(
                "atom not found",
                ErrorContext::new("record_event")
                    .with_entity("atom")
                    .with_entity_id(id),
            ),
            TransitionError::StepNotFound(id) => RepositoryError::not_found_with_context(
                "step not found",
                ErrorContext::new("record_event")
                    .with_entity("step")
                    .with_entity_id(id),
            ),
        })?;
        Self::apply_plan(&mut data, &plan);

        data.next_event_id += 1;
        let record = ExecutionEventRecord {
            id: data.next_event_id,
            observation_id: visit.observation_id,
            event,
            received,
            checksum,
        };
        data.events.push(record.clone());
        Ok(record)
    }

    async fn list_events(
        &self,
        visit_id: VisitId,
    ) -> RepositoryResult<Vec<ExecutionEventRecord>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data
            .events
            .iter()
            .filter(|e| e.event.visit_id == visit_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccountingRepository for LocalRepository {
    async fn insert_correction(
        &self,
        visit_id: VisitId,
        correction: TimeChargeCorrection,
    ) -> RepositoryResult<()> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        if data.visits.iter().all(|v| v.id != visit_id) {
            return Err(RepositoryError::not_found_with_context(
                "visit not found",
                ErrorContext::new("insert_correction")
                    .with_entity("visit")
                    .with_entity_id(visit_id),
            ));
        }
        data.corrections.entry(visit_id).or_default().push(correction);
        Ok(())
    }

    async fn list_corrections(
        &self,
        visit_id: VisitId,
    ) -> RepositoryResult<Vec<TimeChargeCorrection>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data.corrections.get(&visit_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DigestRepository for LocalRepository {
    async fn get_cached_digest(
        &self,
        observation_id: ObservationId,
        hash: &str,
    ) -> RepositoryResult<Option<ExecutionDigest>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data
            .digest_cache
            .get(&(observation_id, hash.to_string()))
            .cloned())
    }

    async fn put_cached_digest(&self, record: DigestCacheRecord) -> RepositoryResult<()> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.digest_cache
            .insert((record.observation_id, record.hash), record.digest);
        Ok(())
    }

    async fn get_cached_itc(
        &self,
        observation_id: ObservationId,
    ) -> RepositoryResult<Option<ItcResult>> {
        let data = self.data.read();
        Self::check_health(&data)?;
        Ok(data.itc_cache.get(&observation_id).copied())
    }

    async fn put_cached_itc(
        &self,
        observation_id: ObservationId,
        result: ItcResult,
    ) -> RepositoryResult<()> {
        let mut data = self.data.write();
        Self::check_health(&data)?;
        data.itc_cache.insert(observation_id, result);
        Ok(())
    }
}
