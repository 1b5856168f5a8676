//! Observation lifecycle services: CRUD, cloning, validation, workflow
//! resolution, and time-charge corrections.

use crate::accounting::{invoice_for_visit, AccountingConfig, TimeChargeCorrection, TimeChargeInvoice};
use crate::db::models::VisitRecord;
use crate::db::repository::{FullRepository, ObservationDefinition};
use crate::error::{OdbError, OdbResult};
use crate::execution::recorder::Caller;
use crate::models::{Observation, ObservationId, ProgramId, VisitId};
use crate::workflow::{
    resolve, transition_override, ObservationWorkflow, ValidationErrorCode, WorkflowInputs,
    WorkflowState,
};

use super::digest_service::DigestService;

/// Maximum number of observations returned by a listing.
pub const MAX_LIST_LIMIT: u32 = 1000;

pub async fn create_observation(
    repo: &dyn FullRepository,
    definition: ObservationDefinition,
) -> OdbResult<Observation> {
    if definition.title.trim().is_empty() {
        return Err(OdbError::invalid_argument("Observation title must not be empty"));
    }
    Ok(repo.create_observation(definition).await?)
}

pub async fn get_observation(
    repo: &dyn FullRepository,
    id: ObservationId,
) -> OdbResult<Observation> {
    repo.get_observation(id)
        .await?
        .ok_or_else(|| OdbError::observation_not_found(id))
}

pub async fn list_observations(
    repo: &dyn FullRepository,
    program_id: ProgramId,
    limit: Option<u32>,
) -> OdbResult<Vec<Observation>> {
    let limit = limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT);
    Ok(repo.list_observations(program_id, limit).await?)
}

pub async fn update_observation(
    repo: &dyn FullRepository,
    observation: &Observation,
) -> OdbResult<Observation> {
    repo.get_observation(observation.id)
        .await?
        .ok_or_else(|| OdbError::observation_not_found(observation.id))?;
    repo.update_observation(observation).await?;
    Ok(observation.clone())
}

/// Clone an observation's definition under a fresh id. Execution history
/// stays with the original; the clone starts unexecuted.
pub async fn clone_observation(
    repo: &dyn FullRepository,
    id: ObservationId,
) -> OdbResult<Observation> {
    let source = get_observation(repo, id).await?;
    let definition: ObservationDefinition = source.into();
    Ok(repo.create_observation(definition).await?)
}

/// Current validation errors of an observation definition.
pub fn validate(observation: &Observation) -> Vec<ValidationErrorCode> {
    let mut errors = Vec::new();
    if observation.observing_mode.is_none() {
        errors.push(ValidationErrorCode::Configuration);
    }
    if observation.science_requirements.wavelength.is_none()
        && observation.calibration_role.is_none()
    {
        errors.push(ValidationErrorCode::Itc);
    }
    if observation.science_band.is_none() && observation.calibration_role.is_none() {
        errors.push(ValidationErrorCode::CallForProposals);
    }
    errors
}

async fn workflow_inputs(
    repo: &dyn FullRepository,
    digests: &DigestService,
    observation: &Observation,
) -> OdbResult<WorkflowInputs> {
    let execution = digests.execution_state(repo, observation).await?;
    Ok(WorkflowInputs {
        validation_errors: validate(observation),
        execution,
        user_state: observation.user_state,
        is_calibration: observation.is_calibration(),
        // time allocation is out of scope; a science band stands in for an
        // accepted proposal
        proposal_accepted: observation.science_band.is_some(),
    })
}

/// The observation's current workflow state and legal transitions.
pub async fn workflow(
    repo: &dyn FullRepository,
    digests: &DigestService,
    id: ObservationId,
) -> OdbResult<ObservationWorkflow> {
    let observation = get_observation(repo, id).await?;
    let inputs = workflow_inputs(repo, digests, &observation).await?;
    Ok(resolve(&inputs))
}

/// Apply a user-requested workflow transition.
pub async fn request_transition(
    repo: &dyn FullRepository,
    digests: &DigestService,
    id: ObservationId,
    target: WorkflowState,
) -> OdbResult<ObservationWorkflow> {
    let observation = get_observation(repo, id).await?;
    let inputs = workflow_inputs(repo, digests, &observation).await?;
    let override_state = transition_override(&inputs, target)?;
    repo.set_user_state(id, override_state).await?;

    let refreshed = get_observation(repo, id).await?;
    let inputs = workflow_inputs(repo, digests, &refreshed).await?;
    Ok(resolve(&inputs))
}

/// Record a manual time-charge correction against a visit.
pub async fn add_time_charge_correction(
    repo: &dyn FullRepository,
    caller: &Caller,
    visit_id: VisitId,
    correction: TimeChargeCorrection,
    config: &AccountingConfig,
) -> OdbResult<TimeChargeInvoice> {
    if !caller.can_record() {
        return Err(OdbError::not_authorized(format!(
            "user '{}' may not correct time charges",
            caller.user
        )));
    }
    let correction = correction.validated()?;
    repo.get_visit(visit_id)
        .await?
        .ok_or_else(|| OdbError::visit_not_found(visit_id))?;
    repo.insert_correction(visit_id, correction).await?;
    invoice_for_visit(repo, visit_id, config).await
}

/// Every visit of an observation with its invoice.
pub async fn visits_with_invoices(
    repo: &dyn FullRepository,
    observation_id: ObservationId,
    config: &AccountingConfig,
) -> OdbResult<Vec<(VisitRecord, TimeChargeInvoice)>> {
    get_observation(repo, observation_id).await?;
    let visits = repo.list_visits(observation_id).await?;
    let mut result = Vec::with_capacity(visits.len());
    for visit in visits {
        let invoice = invoice_for_visit(repo, visit.id, config).await?;
        result.push((visit, invoice));
    }
    Ok(result)
}
