//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::dto::*;
use super::error::AppError;
use super::state::AppState;
use crate::accounting::TimeChargeCorrection;
use crate::error::OdbError;
use crate::execution::events::{ExecutionEvent, ExecutionEventPayload};
use crate::execution::recorder::{self, Caller, Role};
use crate::models::{
    AtomId, DatasetId, Observation, ObservationId, StepId, VisitId,
};
use crate::sequence::{ExecutionDigest, ProtoExecutionConfig};
use crate::services::observation_service;
use crate::workflow::ObservationWorkflow;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Resolve the caller from the bearer token. Authentication proper lives
/// in the SSO front end; the token here already names the principal and
/// its role.
fn caller(headers: &HeaderMap) -> Result<Caller, AppError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError(OdbError::not_authorized("missing bearer token")))?;

    let caller = match token.split_once('-') {
        Some(("staff", user)) => Caller {
            user: user.to_string(),
            role: Role::Staff,
        },
        Some(("service", user)) => Caller {
            user: user.to_string(),
            role: Role::Service,
        },
        _ => Caller {
            user: token.to_string(),
            role: Role::Pi,
        },
    };
    Ok(caller)
}

fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError(OdbError::invalid_argument(format!("'{}' is not a valid {} id", raw, what))))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Observation CRUD
// =============================================================================

/// POST /v1/observations
pub async fn create_observation(
    State(state): State<AppState>,
    Json(request): Json<CreateObservationRequest>,
) -> Result<(StatusCode, Json<Observation>), AppError> {
    let observation =
        observation_service::create_observation(state.repository.as_ref(), request.into()).await?;
    Ok((StatusCode::CREATED, Json(observation)))
}

/// GET /v1/observations/{id}
pub async fn get_observation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Observation> {
    let id: ObservationId = parse_id(&id, "observation")?;
    let observation =
        observation_service::get_observation(state.repository.as_ref(), id).await?;
    Ok(Json(observation))
}

/// GET /v1/observations?program=p-1&limit=50
pub async fn list_observations(
    State(state): State<AppState>,
    Query(query): Query<ObservationListQuery>,
) -> HandlerResult<ObservationListResponse> {
    let observations = observation_service::list_observations(
        state.repository.as_ref(),
        query.program,
        query.limit,
    )
    .await?;
    let total = observations.len();
    Ok(Json(ObservationListResponse {
        observations,
        total,
    }))
}

/// PATCH /v1/observations/{id}
pub async fn update_observation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateObservationRequest>,
) -> HandlerResult<Observation> {
    let id: ObservationId = parse_id(&id, "observation")?;
    let mut observation =
        observation_service::get_observation(state.repository.as_ref(), id).await?;

    if let Some(title) = request.title {
        observation.title = title;
    }
    if let Some(constraint_set) = request.constraint_set {
        observation.constraint_set = constraint_set;
    }
    if let Some(pos_angle_constraint) = request.pos_angle_constraint {
        observation.pos_angle_constraint = pos_angle_constraint;
    }
    if let Some(base_coordinates) = request.base_coordinates {
        observation.base_coordinates = Some(base_coordinates);
    }
    if let Some(observing_mode) = request.observing_mode {
        observation.observing_mode = Some(observing_mode);
    }
    if let Some(science_requirements) = request.science_requirements {
        observation.science_requirements = science_requirements;
    }
    if let Some(science_band) = request.science_band {
        observation.science_band = Some(science_band);
    }

    let updated =
        observation_service::update_observation(state.repository.as_ref(), &observation).await?;
    Ok(Json(updated))
}

/// POST /v1/observations/{id}/clone
pub async fn clone_observation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Observation>), AppError> {
    let id: ObservationId = parse_id(&id, "observation")?;
    let clone = observation_service::clone_observation(state.repository.as_ref(), id).await?;
    Ok((StatusCode::CREATED, Json(clone)))
}

// =============================================================================
// Execution digest and config
// =============================================================================

/// GET /v1/observations/{id}/execution/digest
pub async fn get_digest(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<ExecutionDigest> {
    let id: ObservationId = parse_id(&id, "observation")?;
    let observation =
        observation_service::get_observation(state.repository.as_ref(), id).await?;
    let digest = state
        .digests
        .digest(state.repository.as_ref(), observation.program_id, id)
        .await?;
    Ok(Json(digest))
}

/// GET /v1/observations/{id}/execution/config?future_limit=25
pub async fn get_execution_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ConfigQuery>,
) -> HandlerResult<ProtoExecutionConfig> {
    let id: ObservationId = parse_id(&id, "observation")?;
    let observation =
        observation_service::get_observation(state.repository.as_ref(), id).await?;
    let config = state
        .digests
        .execution_config(
            state.repository.as_ref(),
            observation.program_id,
            id,
            query.future_limit,
        )
        .await?;
    Ok(Json(config))
}

/// GET /v1/observations/{id}/execution/visits
pub async fn get_visits(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Vec<VisitWithInvoice>> {
    let id: ObservationId = parse_id(&id, "observation")?;
    let visits = observation_service::visits_with_invoices(
        state.repository.as_ref(),
        id,
        &state.accounting,
    )
    .await?;
    Ok(Json(
        visits
            .into_iter()
            .map(|(visit, time_charge_invoice)| VisitWithInvoice {
                visit,
                time_charge_invoice,
            })
            .collect(),
    ))
}

// =============================================================================
// Workflow
// =============================================================================

/// GET /v1/observations/{id}/workflow
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<ObservationWorkflow> {
    let id: ObservationId = parse_id(&id, "observation")?;
    let workflow =
        observation_service::workflow(state.repository.as_ref(), &state.digests, id).await?;
    Ok(Json(workflow))
}

/// POST /v1/observations/{id}/workflow
pub async fn post_transition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> HandlerResult<ObservationWorkflow> {
    let id: ObservationId = parse_id(&id, "observation")?;
    let workflow = observation_service::request_transition(
        state.repository.as_ref(),
        &state.digests,
        id,
        request.state,
    )
    .await?;
    Ok(Json(workflow))
}

// =============================================================================
// Recording: visits, atoms, steps, datasets
// =============================================================================

/// POST /v1/visits
pub async fn record_visit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RecordVisitRequest>,
) -> Result<(StatusCode, Json<crate::db::models::VisitRecord>), AppError> {
    let caller = caller(&headers)?;
    let visit = recorder::record_visit(
        state.repository.as_ref(),
        &caller,
        request.observation_id,
        request.instrument,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

/// POST /v1/visits/{id}/atoms
pub async fn record_atom(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<RecordAtomRequest>,
) -> Result<(StatusCode, Json<crate::db::models::AtomRecord>), AppError> {
    let caller = caller(&headers)?;
    let visit_id: VisitId = parse_id(&id, "visit")?;
    let atom = recorder::record_atom(
        state.repository.as_ref(),
        &caller,
        visit_id,
        request.instrument,
        request.step_count,
        request.sequence_type,
        request.generated_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(atom)))
}

/// POST /v1/atoms/{id}/steps
pub async fn record_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<RecordStepRequest>,
) -> Result<(StatusCode, Json<crate::db::models::StepRecord>), AppError> {
    let caller = caller(&headers)?;
    let atom_id: AtomId = parse_id(&id, "atom")?;
    let step = recorder::record_step(
        state.repository.as_ref(),
        &caller,
        atom_id,
        request.instrument,
        request.dynamic_config,
        request.step_config,
        request.observe_class,
        request.generated_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(step)))
}

/// POST /v1/steps/{id}/datasets
pub async fn record_dataset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<RecordDatasetRequest>,
) -> Result<(StatusCode, Json<crate::db::models::DatasetRecord>), AppError> {
    let caller = caller(&headers)?;
    let step_id: StepId = parse_id(&id, "step")?;
    let dataset = recorder::record_dataset(
        state.repository.as_ref(),
        &caller,
        step_id,
        request.filename,
        request.qa_state,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(dataset)))
}

/// PATCH /v1/datasets/{id}
pub async fn set_dataset_qa(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<SetDatasetQaRequest>,
) -> Result<StatusCode, AppError> {
    let caller = caller(&headers)?;
    let dataset_id: DatasetId = parse_id(&id, "dataset")?;
    recorder::set_dataset_qa(
        state.repository.as_ref(),
        &caller,
        dataset_id,
        request.qa_state,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Event ingestion, one endpoint per event kind
// =============================================================================

async fn ingest(
    state: &AppState,
    headers: &HeaderMap,
    event: ExecutionEvent,
) -> Result<(StatusCode, Json<crate::db::models::ExecutionEventRecord>), AppError> {
    let caller = caller(headers)?;
    let record = recorder::record_event(state.repository.as_ref(), &caller, event).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /v1/events/slew
pub async fn post_slew_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SlewEventRequest>,
) -> Result<(StatusCode, Json<crate::db::models::ExecutionEventRecord>), AppError> {
    let event = ExecutionEvent {
        visit_id: request.visit_id,
        timestamp: request.timestamp,
        payload: ExecutionEventPayload::Slew {
            stage: request.stage,
        },
    };
    ingest(&state, &headers, event).await
}

/// POST /v1/events/sequence
pub async fn post_sequence_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SequenceEventRequest>,
) -> Result<(StatusCode, Json<crate::db::models::ExecutionEventRecord>), AppError> {
    let event = ExecutionEvent {
        visit_id: request.visit_id,
        timestamp: request.timestamp,
        payload: ExecutionEventPayload::Sequence {
            command: request.command,
        },
    };
    ingest(&state, &headers, event).await
}

/// POST /v1/events/atom
pub async fn post_atom_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AtomEventRequest>,
) -> Result<(StatusCode, Json<crate::db::models::ExecutionEventRecord>), AppError> {
    let event = ExecutionEvent {
        visit_id: request.visit_id,
        timestamp: request.timestamp,
        payload: ExecutionEventPayload::Atom {
            stage: request.stage,
            atom_id: request.atom_id,
        },
    };
    ingest(&state, &headers, event).await
}

/// POST /v1/events/step
pub async fn post_step_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StepEventRequest>,
) -> Result<(StatusCode, Json<crate::db::models::ExecutionEventRecord>), AppError> {
    let event = ExecutionEvent {
        visit_id: request.visit_id,
        timestamp: request.timestamp,
        payload: ExecutionEventPayload::Step {
            stage: request.stage,
            step_id: request.step_id,
        },
    };
    ingest(&state, &headers, event).await
}

/// POST /v1/events/dataset
pub async fn post_dataset_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DatasetEventRequest>,
) -> Result<(StatusCode, Json<crate::db::models::ExecutionEventRecord>), AppError> {
    let event = ExecutionEvent {
        visit_id: request.visit_id,
        timestamp: request.timestamp,
        payload: ExecutionEventPayload::Dataset {
            stage: request.stage,
            dataset_id: request.dataset_id,
            step_id: request.step_id,
        },
    };
    ingest(&state, &headers, event).await
}

// =============================================================================
// Time charge corrections
// =============================================================================

/// POST /v1/visits/{id}/corrections
pub async fn post_correction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<CorrectionRequest>,
) -> HandlerResult<crate::accounting::TimeChargeInvoice> {
    let caller = caller(&headers)?;
    let visit_id: VisitId = parse_id(&id, "visit")?;
    let correction = TimeChargeCorrection {
        charge_class: request.charge_class,
        op: request.op,
        amount: request.amount,
        user: caller.user.clone(),
        comment: request.comment,
    };
    let invoice = observation_service::add_time_charge_correction(
        state.repository.as_ref(),
        &caller,
        visit_id,
        correction,
        &state.accounting,
    )
    .await?;
    Ok(Json(invoice))
}
