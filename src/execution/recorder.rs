//! Execution recording.
//!
//! The recorder ingests real-time telescope events and persists the visit
//! → atom → step → dataset hierarchy with correct lifecycle transitions.
//! Transition planning is pure ([`plan_transitions`]); repositories apply a
//! plan atomically with the event insert. The service functions here wrap
//! authorization, existence checks, and estimate computation around the
//! repository calls.

use chrono::Utc;

use crate::db::models::{AtomRecord, DatasetRecord, ExecutionEventRecord, StepRecord, VisitRecord};
use crate::db::repository::FullRepository;
use crate::error::{OdbError, OdbResult};
use crate::models::{
    AtomExecutionState, AtomId, DatasetFilename, DatasetQaState, DynamicConfig, GmosStatic,
    Instrument, ObservationId, ObserveClass, SequenceType, StaticConfig, StepConfig,
    StepExecutionState, StepId, Timestamp, VisitId,
};
use crate::sequence::{EstimatorState, TimeEstimator};

use super::events::{AtomStage, ExecutionEvent, ExecutionEventPayload, StepStage};

/// Access role of the caller. Only staff and facility services may record
/// execution data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Pi,
    Staff,
    Service,
}

/// Identity attached to every mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user: String,
    pub role: Role,
}

impl Caller {
    pub fn staff(user: impl Into<String>) -> Caller {
        Caller {
            user: user.into(),
            role: Role::Staff,
        }
    }

    pub fn pi(user: impl Into<String>) -> Caller {
        Caller {
            user: user.into(),
            role: Role::Pi,
        }
    }

    pub fn can_record(&self) -> bool {
        matches!(self.role, Role::Staff | Role::Service)
    }
}

fn require_recording(caller: &Caller) -> OdbResult<()> {
    if caller.can_record() {
        Ok(())
    } else {
        Err(OdbError::not_authorized(format!(
            "user '{}' may not record execution data",
            caller.user
        )))
    }
}

/// State changes an event implies, to be applied in the same transaction
/// as the event insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionPlan {
    pub atoms: Vec<(AtomId, AtomExecutionState)>,
    pub steps: Vec<(StepId, StepExecutionState, Option<Timestamp>)>,
}

impl TransitionPlan {
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty() && self.steps.is_empty()
    }
}

/// Planner failure: the event references an unknown record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    AtomNotFound(AtomId),
    StepNotFound(StepId),
}

impl From<TransitionError> for OdbError {
    fn from(err: TransitionError) -> OdbError {
        match err {
            TransitionError::AtomNotFound(id) => OdbError::atom_not_found(id),
            TransitionError::StepNotFound(id) => OdbError::step_not_found(id),
        }
    }
}

/// Abandon every non-terminal atom and step. Used when a new visit begins.
pub fn abandon_all(atoms: &[AtomRecord], steps: &[StepRecord]) -> TransitionPlan {
    TransitionPlan {
        atoms: atoms
            .iter()
            .filter(|a| !a.execution_state.is_terminal())
            .map(|a| (a.id, AtomExecutionState::Abandoned))
            .collect(),
        steps: steps
            .iter()
            .filter(|s| !s.execution_state.is_terminal())
            .map(|s| (s.id, StepExecutionState::Abandoned, None))
            .collect(),
    }
}

/// Compute the transitions an event implies, given all atoms and steps of
/// the observation.
///
/// Starting an atom or a step abandons every other Ongoing atom or step of
/// the observation, so at most one of each is Ongoing at any instant.
/// Records already in a terminal state are left untouched.
pub fn plan_transitions(
    event: &ExecutionEvent,
    atoms: &[AtomRecord],
    steps: &[StepRecord],
) -> Result<TransitionPlan, TransitionError> {
    let mut plan = TransitionPlan::default();

    let find_atom = |id: AtomId| {
        atoms
            .iter()
            .find(|a| a.id == id)
            .ok_or(TransitionError::AtomNotFound(id))
    };
    let find_step = |id: StepId| {
        steps
            .iter()
            .find(|s| s.id == id)
            .ok_or(TransitionError::StepNotFound(id))
    };

    match event.payload {
        ExecutionEventPayload::Atom { stage, atom_id } => {
            let atom = find_atom(atom_id)?;
            match stage {
                AtomStage::StartAtom => {
                    if !atom.execution_state.is_terminal() {
                        plan.atoms.push((atom_id, AtomExecutionState::Ongoing));
                    }
                    for other in atoms {
                        if other.id != atom_id
                            && other.execution_state == AtomExecutionState::Ongoing
                        {
                            plan.atoms.push((other.id, AtomExecutionState::Abandoned));
                            for step in steps {
                                if step.atom_id == other.id
                                    && step.execution_state == StepExecutionState::Ongoing
                                {
                                    plan.steps.push((
                                        step.id,
                                        StepExecutionState::Abandoned,
                                        None,
                                    ));
                                }
                            }
                        }
                    }
                }
                AtomStage::EndAtom => {
                    if !atom.execution_state.is_terminal() {
                        plan.atoms.push((atom_id, AtomExecutionState::Completed));
                    }
                }
            }
        }
        ExecutionEventPayload::Step { stage, step_id } => {
            let step = find_step(step_id)?;
            match stage {
                StepStage::StartStep => {
                    if !step.execution_state.is_terminal() {
                        plan.steps.push((step_id, StepExecutionState::Ongoing, None));
                    }
                    for other in steps {
                        if other.id != step_id
                            && other.execution_state == StepExecutionState::Ongoing
                        {
                            plan.steps
                                .push((other.id, StepExecutionState::Abandoned, None));
                        }
                    }
                }
                StepStage::EndStep => {
                    if !step.execution_state.is_terminal() {
                        plan.steps.push((
                            step_id,
                            StepExecutionState::Completed,
                            Some(event.timestamp),
                        ));
                    }
                }
                StepStage::Abort => {
                    if !step.execution_state.is_terminal() {
                        plan.steps.push((step_id, StepExecutionState::Aborted, None));
                    }
                }
                StepStage::Stop => {
                    if !step.execution_state.is_terminal() {
                        plan.steps.push((step_id, StepExecutionState::Stopped, None));
                    }
                }
            }
        }
        ExecutionEventPayload::Dataset { step_id, .. } => {
            // dataset stages do not transition atoms or steps, but the step
            // must exist
            find_step(step_id)?;
        }
        ExecutionEventPayload::Slew { .. } | ExecutionEventPayload::Sequence { .. } => {}
    }

    Ok(plan)
}

fn static_config_for(instrument: Instrument) -> StaticConfig {
    match instrument {
        Instrument::GmosNorth => StaticConfig::GmosNorth(GmosStatic::default()),
        Instrument::GmosSouth => StaticConfig::GmosSouth(GmosStatic::default()),
    }
}

/// Insert a visit for an observation. All non-terminal atoms and steps of
/// the observation are abandoned in the same transaction.
pub async fn record_visit(
    repo: &dyn FullRepository,
    caller: &Caller,
    observation_id: ObservationId,
    instrument: Instrument,
) -> OdbResult<VisitRecord> {
    require_recording(caller)?;
    let observation = repo
        .get_observation(observation_id)
        .await?
        .ok_or_else(|| OdbError::observation_not_found(observation_id))?;
    if observation.instrument() != Some(instrument) {
        return Err(OdbError::invalid_argument(format!(
            "observation {} does not use {}",
            observation_id, instrument
        )));
    }

    let visit = VisitRecord {
        id: VisitId::random(),
        observation_id,
        instrument,
        site: instrument.site(),
        static_config: static_config_for(instrument),
        created_at: Timestamp::from_datetime(Utc::now()),
    };
    repo.insert_visit(visit.clone()).await?;
    tracing::info!(visit = %visit.id, observation = %observation_id, "visit recorded");
    Ok(visit)
}

/// Insert an atom under a visit.
pub async fn record_atom(
    repo: &dyn FullRepository,
    caller: &Caller,
    visit_id: VisitId,
    instrument: Instrument,
    step_count: u16,
    sequence_type: SequenceType,
    generated_id: Option<String>,
) -> OdbResult<AtomRecord> {
    require_recording(caller)?;
    let visit = repo
        .get_visit(visit_id)
        .await?
        .ok_or_else(|| OdbError::visit_not_found(visit_id))?;
    if visit.instrument != instrument {
        return Err(OdbError::invalid_argument(format!(
            "visit {} was recorded for {}",
            visit_id, visit.instrument
        )));
    }

    let atom = AtomRecord {
        id: AtomId::random(),
        visit_id,
        observation_id: visit.observation_id,
        instrument,
        sequence_type,
        step_count,
        execution_state: AtomExecutionState::NotStarted,
        generated_id,
    };
    repo.insert_atom(atom.clone()).await?;
    Ok(atom)
}

/// Estimator state after replaying the observation's recorded steps in
/// index order.
fn replay_estimator_state(steps: &[StepRecord]) -> Option<EstimatorState> {
    let mut state: Option<EstimatorState> = None;
    for record in steps {
        let proto = crate::sequence::ProtoStep::new(
            record.dynamic_config.clone(),
            record.step_config,
            record.observe_class,
        );
        state = Some(EstimatorState::advance(state.as_ref(), &proto));
    }
    state
}

/// Insert a step under an atom, computing its time estimate against the
/// observation's previously recorded step.
#[allow(clippy::too_many_arguments)]
pub async fn record_step(
    repo: &dyn FullRepository,
    caller: &Caller,
    atom_id: AtomId,
    instrument: Instrument,
    dynamic_config: DynamicConfig,
    step_config: StepConfig,
    observe_class: ObserveClass,
    generated_id: Option<String>,
) -> OdbResult<StepRecord> {
    require_recording(caller)?;
    let atom = repo
        .get_atom(atom_id)
        .await?
        .ok_or_else(|| OdbError::atom_not_found(atom_id))?;
    if atom.instrument != instrument {
        return Err(OdbError::invalid_argument(format!(
            "atom {} was recorded for {}",
            atom_id, atom.instrument
        )));
    }

    let previous = repo.list_steps(atom.observation_id).await?;
    let state = replay_estimator_state(&previous);
    let proto =
        crate::sequence::ProtoStep::new(dynamic_config.clone(), step_config, observe_class);
    let estimate = TimeEstimator::new().estimate(state.as_ref(), &proto);

    let step = StepRecord {
        id: StepId::random(),
        atom_id,
        visit_id: atom.visit_id,
        observation_id: atom.observation_id,
        instrument,
        step_index: 0, // assigned by the repository
        dynamic_config,
        step_config,
        observe_class,
        execution_state: StepExecutionState::NotStarted,
        generated_id,
        time_estimate: estimate.total(),
        completed_at: None,
        qa_state: None,
    };
    Ok(repo.insert_step(step).await?)
}

/// Insert a dataset under a step. Filenames are unique per observation.
pub async fn record_dataset(
    repo: &dyn FullRepository,
    caller: &Caller,
    step_id: StepId,
    filename: DatasetFilename,
    qa_state: Option<DatasetQaState>,
) -> OdbResult<DatasetRecord> {
    require_recording(caller)?;
    let step = repo
        .get_step(step_id)
        .await?
        .ok_or_else(|| OdbError::step_not_found(step_id))?;

    let dataset = DatasetRecord {
        id: crate::models::DatasetId::new(0), // minted by the repository
        step_id,
        atom_id: step.atom_id,
        visit_id: step.visit_id,
        observation_id: step.observation_id,
        filename,
        qa_state,
    };
    Ok(repo.insert_dataset(dataset).await?)
}

/// Set a dataset's QA state.
pub async fn set_dataset_qa(
    repo: &dyn FullRepository,
    caller: &Caller,
    dataset_id: crate::models::DatasetId,
    qa_state: Option<DatasetQaState>,
) -> OdbResult<()> {
    require_recording(caller)?;
    repo.get_dataset(dataset_id)
        .await?
        .ok_or(OdbError::NotFound {
            kind: crate::error::EntityKind::Dataset,
            id: dataset_id.to_string(),
        })?;
    repo.set_dataset_qa(dataset_id, qa_state).await?;
    Ok(())
}

/// Ingest one execution event.
///
/// Ingestion is idempotent in the event content; the caller retries freely.
pub async fn record_event(
    repo: &dyn FullRepository,
    caller: &Caller,
    event: ExecutionEvent,
) -> OdbResult<ExecutionEventRecord> {
    require_recording(caller)?;
    repo.get_visit(event.visit_id)
        .await?
        .ok_or_else(|| OdbError::visit_not_found(event.visit_id))?;

    // surface a precise not-found before the transactional apply
    match event.payload {
        ExecutionEventPayload::Atom { atom_id, .. } => {
            repo.get_atom(atom_id)
                .await?
                .ok_or_else(|| OdbError::atom_not_found(atom_id))?;
        }
        ExecutionEventPayload::Step { step_id, .. }
        | ExecutionEventPayload::Dataset { step_id, .. } => {
            repo.get_step(step_id)
                .await?
                .ok_or_else(|| OdbError::step_not_found(step_id))?;
        }
        ExecutionEventPayload::Slew { .. } | ExecutionEventPayload::Sequence { .. } => {}
    }

    let received = Timestamp::from_datetime(Utc::now());
    Ok(repo.record_event(event, received).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GmosCcdMode, GmosNorthDynamic, GmosRoi, TimeSpan};

    fn atom_record(id: AtomId, state: AtomExecutionState) -> AtomRecord {
        AtomRecord {
            id,
            visit_id: VisitId::random(),
            observation_id: ObservationId::new(1),
            instrument: Instrument::GmosNorth,
            sequence_type: SequenceType::Science,
            step_count: 2,
            execution_state: state,
            generated_id: None,
        }
    }

    fn step_record(id: StepId, atom_id: AtomId, state: StepExecutionState) -> StepRecord {
        StepRecord {
            id,
            atom_id,
            visit_id: VisitId::random(),
            observation_id: ObservationId::new(1),
            instrument: Instrument::GmosNorth,
            step_index: 1,
            dynamic_config: DynamicConfig::GmosNorth(GmosNorthDynamic {
                exposure: TimeSpan::from_seconds(10),
                ccd_mode: GmosCcdMode::default(),
                roi: GmosRoi::FullFrame,
                grating: None,
                filter: None,
                fpu: None,
            }),
            step_config: StepConfig::Bias,
            observe_class: ObserveClass::Science,
            execution_state: state,
            generated_id: None,
            time_estimate: TimeSpan::ZERO,
            completed_at: None,
            qa_state: None,
        }
    }

    fn at(seconds: i64) -> Timestamp {
        Timestamp::from_microseconds(seconds * 1_000_000).unwrap()
    }

    #[test]
    fn test_start_atom_abandons_other_ongoing() {
        let a1 = AtomId::random();
        let a2 = AtomId::random();
        let s1 = StepId::random();
        let atoms = vec![
            atom_record(a1, AtomExecutionState::Ongoing),
            atom_record(a2, AtomExecutionState::NotStarted),
        ];
        let steps = vec![step_record(s1, a1, StepExecutionState::Ongoing)];
        let event = ExecutionEvent {
            visit_id: VisitId::random(),
            timestamp: at(0),
            payload: ExecutionEventPayload::Atom {
                stage: AtomStage::StartAtom,
                atom_id: a2,
            },
        };

        let plan = plan_transitions(&event, &atoms, &steps).unwrap();
        assert!(plan.atoms.contains(&(a2, AtomExecutionState::Ongoing)));
        assert!(plan.atoms.contains(&(a1, AtomExecutionState::Abandoned)));
        assert!(plan
            .steps
            .contains(&(s1, StepExecutionState::Abandoned, None)));
    }

    #[test]
    fn test_end_step_records_completion_time() {
        let a1 = AtomId::random();
        let s1 = StepId::random();
        let atoms = vec![atom_record(a1, AtomExecutionState::Ongoing)];
        let steps = vec![step_record(s1, a1, StepExecutionState::Ongoing)];
        let event = ExecutionEvent {
            visit_id: VisitId::random(),
            timestamp: at(42),
            payload: ExecutionEventPayload::Step {
                stage: StepStage::EndStep,
                step_id: s1,
            },
        };

        let plan = plan_transitions(&event, &atoms, &steps).unwrap();
        assert_eq!(
            plan.steps,
            vec![(s1, StepExecutionState::Completed, Some(at(42)))]
        );
    }

    #[test]
    fn test_terminal_states_are_left_alone() {
        let a1 = AtomId::random();
        let atoms = vec![atom_record(a1, AtomExecutionState::Completed)];
        let event = ExecutionEvent {
            visit_id: VisitId::random(),
            timestamp: at(0),
            payload: ExecutionEventPayload::Atom {
                stage: AtomStage::EndAtom,
                atom_id: a1,
            },
        };
        let plan = plan_transitions(&event, &atoms, &[]).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_unknown_atom_is_an_error() {
        let event = ExecutionEvent {
            visit_id: VisitId::random(),
            timestamp: at(0),
            payload: ExecutionEventPayload::Atom {
                stage: AtomStage::StartAtom,
                atom_id: AtomId::random(),
            },
        };
        assert!(matches!(
            plan_transitions(&event, &[], &[]),
            Err(TransitionError::AtomNotFound(_))
        ));
    }

    #[test]
    fn test_abandon_all_skips_terminal() {
        let a1 = AtomId::random();
        let a2 = AtomId::random();
        let atoms = vec![
            atom_record(a1, AtomExecutionState::Ongoing),
            atom_record(a2, AtomExecutionState::Completed),
        ];
        let plan = abandon_all(&atoms, &[]);
        assert_eq!(plan.atoms, vec![(a1, AtomExecutionState::Abandoned)]);
    }
}
