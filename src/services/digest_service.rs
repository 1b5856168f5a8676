//! Execution digest service.
//!
//! Resolves generator inputs, consults the ITC (caching its answer),
//! computes the content-addressed digest, and serves the sliced execution
//! config. Digest computation is deterministic and idempotent, so the
//! single-flight map is an optimization only: a racing recompute produces
//! byte-identical output.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::db::models::DigestCacheRecord;
use crate::db::repository::FullRepository;
use crate::error::{OdbError, OdbResult};
use crate::itc::{ItcClient, ItcResult};
use crate::models::{
    AtomExecutionState, Observation, ObservationId, ProgramId, SequenceType,
};
use crate::sequence::{
    digest_hash, execution_sequence, fold_sequence, ExecutionDigest, ProtoExecutionConfig,
    SequenceGenerator, SetupTime, SmartGcalOracle, TimeEstimator, DEFAULT_FUTURE_LIMIT,
    MAX_FUTURE_LIMIT,
};
use crate::workflow::ExecutionState;

/// Serves digests and execution configs for observations.
pub struct DigestService {
    commit_hash: String,
    oracle: Arc<dyn SmartGcalOracle>,
    itc: Arc<dyn ItcClient>,
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DigestService {
    pub fn new(
        commit_hash: impl Into<String>,
        oracle: Arc<dyn SmartGcalOracle>,
        itc: Arc<dyn ItcClient>,
    ) -> DigestService {
        DigestService {
            commit_hash: commit_hash.into(),
            oracle,
            itc,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    async fn resolve_observation(
        &self,
        repo: &dyn FullRepository,
        program_id: ProgramId,
        observation_id: ObservationId,
    ) -> OdbResult<Observation> {
        let observation = repo
            .get_observation(observation_id)
            .await?
            .filter(|o| o.program_id == program_id)
            .ok_or_else(|| OdbError::observation_not_found(observation_id))?;
        Ok(observation)
    }

    /// The observation's ITC answer, from cache or the external service.
    async fn resolve_itc(
        &self,
        repo: &dyn FullRepository,
        observation: &Observation,
    ) -> OdbResult<ItcResult> {
        if let Some(cached) = repo.get_cached_itc(observation.id).await? {
            return Ok(cached);
        }
        let result = self.itc.integration_time(observation).await?;
        repo.put_cached_itc(observation.id, result).await?;
        Ok(result)
    }

    fn per_key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock();
        inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// The execution digest, computed at most once per input hash.
    pub async fn digest(
        &self,
        repo: &dyn FullRepository,
        program_id: ProgramId,
        observation_id: ObservationId,
    ) -> OdbResult<ExecutionDigest> {
        let observation = self
            .resolve_observation(repo, program_id, observation_id)
            .await?;
        let itc = self.resolve_itc(repo, &observation).await?;
        let generator = SequenceGenerator::for_observation(&observation, itc)?;

        let mode = observation
            .observing_mode
            .as_ref()
            .ok_or_else(|| OdbError::invalid_data(observation_id, "observation has no observing mode"))?;
        let hash = digest_hash(mode, &itc.science, &self.commit_hash);

        if let Some(cached) = repo.get_cached_digest(observation_id, &hash).await? {
            return Ok(cached);
        }

        // at most one concurrent computation per key
        let key = format!("{}:{}", observation_id, hash);
        let lock = self.per_key_lock(&key);
        let _guard = lock.lock().await;
        if let Some(cached) = repo.get_cached_digest(observation_id, &hash).await? {
            return Ok(cached);
        }

        let estimator = TimeEstimator::new();
        let acquisition =
            fold_sequence(generator.acquisition_atoms().into_iter().map(Ok), &estimator)?;
        let science = fold_sequence(
            generator.expanded_science_atoms(self.oracle.as_ref())?,
            &estimator,
        )?;

        let digest = ExecutionDigest {
            setup: SetupTime::standard(),
            acquisition,
            science,
        };
        repo.put_cached_digest(DigestCacheRecord {
            observation_id,
            hash,
            digest: digest.clone(),
        })
        .await?;
        tracing::debug!(observation = %observation_id, "execution digest computed");
        Ok(digest)
    }

    async fn completed_atoms(
        &self,
        repo: &dyn FullRepository,
        observation_id: ObservationId,
        sequence_type: SequenceType,
    ) -> OdbResult<u32> {
        Ok(repo
            .list_atoms(observation_id)
            .await?
            .into_iter()
            .filter(|a| {
                a.sequence_type == sequence_type
                    && a.execution_state == AtomExecutionState::Completed
            })
            .count() as u32)
    }

    /// The sliced execution config: static config plus the remaining atoms
    /// of both sequences, bounded by `future_limit`.
    pub async fn execution_config(
        &self,
        repo: &dyn FullRepository,
        program_id: ProgramId,
        observation_id: ObservationId,
        future_limit: Option<u32>,
    ) -> OdbResult<ProtoExecutionConfig> {
        let limit = future_limit.unwrap_or(DEFAULT_FUTURE_LIMIT);
        if limit > MAX_FUTURE_LIMIT {
            return Err(OdbError::invalid_argument(format!(
                "Future limit must range from 0 to {}, but was {}.",
                MAX_FUTURE_LIMIT, limit
            )));
        }

        let observation = self
            .resolve_observation(repo, program_id, observation_id)
            .await?;
        let itc = self.resolve_itc(repo, &observation).await?;
        let generator = SequenceGenerator::for_observation(&observation, itc)?;

        let completed_acq = self
            .completed_atoms(repo, observation_id, SequenceType::Acquisition)
            .await?;
        let completed_sci = self
            .completed_atoms(repo, observation_id, SequenceType::Science)
            .await?;

        let acquisition = execution_sequence(
            generator.acquisition_atoms().into_iter().map(Ok),
            completed_acq,
            limit,
        )?;
        let science = execution_sequence(
            generator.expanded_science_atoms(self.oracle.as_ref())?,
            completed_sci,
            limit,
        )?;

        Ok(ProtoExecutionConfig {
            static_config: generator.static_config(),
            acquisition,
            science,
        })
    }

    /// Execution progress for the workflow resolver.
    pub async fn execution_state(
        &self,
        repo: &dyn FullRepository,
        observation: &Observation,
    ) -> OdbResult<ExecutionState> {
        let visits = repo.list_visits(observation.id).await?;
        if visits.is_empty() {
            return Ok(ExecutionState::NotStarted);
        }

        let planned = match repo.get_cached_itc(observation.id).await? {
            Some(itc) => SequenceGenerator::for_observation(observation, itc)
                .and_then(|g| g.science_atom_count())
                .ok(),
            None => None,
        };
        let completed = self
            .completed_atoms(repo, observation.id, SequenceType::Science)
            .await?;

        match planned {
            Some(planned) if planned > 0 && completed >= planned => Ok(ExecutionState::Completed),
            _ => Ok(ExecutionState::Ongoing),
        }
    }
}
