//! Data transfer objects for the REST API.

use serde::{Deserialize, Serialize};

use crate::accounting::{CorrectionOp, TimeChargeInvoice};
use crate::db::models::VisitRecord;
use crate::db::repository::ObservationDefinition;
use crate::execution::events::{
    AtomStage, DatasetStage, SequenceCommand, SlewStage, StepStage,
};
use crate::models::{
    AtomId, CalibrationRole, ChargeClass, ConstraintSet, Coordinates, DatasetFilename, DatasetId,
    DatasetQaState, DynamicConfig, Instrument, ObservationId, ObserveClass, ObservingMode,
    PosAngleConstraint, ProgramId, ScienceBand, ScienceRequirements, SequenceType, StepConfig,
    StepId, TimeSpan, Timestamp, UserWorkflowState, VisitId,
};
use crate::workflow::WorkflowState;

/// GET /health response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// POST /v1/observations request body.
#[derive(Debug, Deserialize)]
pub struct CreateObservationRequest {
    pub program_id: ProgramId,
    pub title: String,
    #[serde(default)]
    pub constraint_set: Option<ConstraintSet>,
    #[serde(default)]
    pub pos_angle_constraint: Option<PosAngleConstraint>,
    #[serde(default)]
    pub base_coordinates: Option<Coordinates>,
    #[serde(default)]
    pub observing_mode: Option<ObservingMode>,
    #[serde(default)]
    pub science_requirements: Option<ScienceRequirements>,
    #[serde(default)]
    pub science_band: Option<ScienceBand>,
    #[serde(default)]
    pub user_state: Option<UserWorkflowState>,
    #[serde(default)]
    pub calibration_role: Option<CalibrationRole>,
}

impl From<CreateObservationRequest> for ObservationDefinition {
    fn from(req: CreateObservationRequest) -> ObservationDefinition {
        ObservationDefinition {
            program_id: req.program_id,
            title: req.title,
            constraint_set: req.constraint_set.unwrap_or_default(),
            pos_angle_constraint: req.pos_angle_constraint.unwrap_or_default(),
            base_coordinates: req.base_coordinates,
            observing_mode: req.observing_mode,
            science_requirements: req.science_requirements.unwrap_or_default(),
            science_band: req.science_band,
            user_state: req.user_state,
            calibration_role: req.calibration_role,
        }
    }
}

/// PATCH /v1/observations/{id} request body; absent fields are unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateObservationRequest {
    pub title: Option<String>,
    pub constraint_set: Option<ConstraintSet>,
    pub pos_angle_constraint: Option<PosAngleConstraint>,
    pub base_coordinates: Option<Coordinates>,
    pub observing_mode: Option<ObservingMode>,
    pub science_requirements: Option<ScienceRequirements>,
    pub science_band: Option<ScienceBand>,
}

/// GET /v1/observations query parameters.
#[derive(Debug, Deserialize)]
pub struct ObservationListQuery {
    pub program: ProgramId,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// GET …/execution/config query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigQuery {
    #[serde(default)]
    pub future_limit: Option<u32>,
}

/// POST /v1/visits request body.
#[derive(Debug, Deserialize)]
pub struct RecordVisitRequest {
    pub observation_id: ObservationId,
    pub instrument: Instrument,
}

/// POST /v1/visits/{id}/atoms request body.
#[derive(Debug, Deserialize)]
pub struct RecordAtomRequest {
    pub instrument: Instrument,
    pub step_count: u16,
    pub sequence_type: SequenceType,
    #[serde(default)]
    pub generated_id: Option<String>,
}

/// POST /v1/atoms/{id}/steps request body.
#[derive(Debug, Deserialize)]
pub struct RecordStepRequest {
    pub instrument: Instrument,
    pub dynamic_config: DynamicConfig,
    pub step_config: StepConfig,
    pub observe_class: ObserveClass,
    #[serde(default)]
    pub generated_id: Option<String>,
}

/// POST /v1/steps/{id}/datasets request body.
#[derive(Debug, Deserialize)]
pub struct RecordDatasetRequest {
    pub filename: DatasetFilename,
    #[serde(default)]
    pub qa_state: Option<DatasetQaState>,
}

/// PATCH /v1/datasets/{id} request body.
#[derive(Debug, Deserialize)]
pub struct SetDatasetQaRequest {
    pub qa_state: Option<DatasetQaState>,
}

/// POST /v1/events/slew request body.
#[derive(Debug, Deserialize)]
pub struct SlewEventRequest {
    pub visit_id: VisitId,
    pub timestamp: Timestamp,
    pub stage: SlewStage,
}

/// POST /v1/events/sequence request body.
#[derive(Debug, Deserialize)]
pub struct SequenceEventRequest {
    pub visit_id: VisitId,
    pub timestamp: Timestamp,
    pub command: SequenceCommand,
}

/// POST /v1/events/atom request body.
#[derive(Debug, Deserialize)]
pub struct AtomEventRequest {
    pub visit_id: VisitId,
    pub timestamp: Timestamp,
    pub stage: AtomStage,
    pub atom_id: AtomId,
}

/// POST /v1/events/step request body.
#[derive(Debug, Deserialize)]
pub struct StepEventRequest {
    pub visit_id: VisitId,
    pub timestamp: Timestamp,
    pub stage: StepStage,
    pub step_id: StepId,
}

/// POST /v1/events/dataset request body.
#[derive(Debug, Deserialize)]
pub struct DatasetEventRequest {
    pub visit_id: VisitId,
    pub timestamp: Timestamp,
    pub stage: DatasetStage,
    pub dataset_id: DatasetId,
    pub step_id: StepId,
}

/// POST /v1/visits/{id}/corrections request body.
#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    pub charge_class: ChargeClass,
    pub op: CorrectionOp,
    /// Correction amount in microseconds, at most 365 days.
    pub amount: TimeSpan,
    #[serde(default)]
    pub comment: Option<String>,
}

/// POST /v1/observations/{id}/workflow request body.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub state: WorkflowState,
}

/// One visit with its time charge invoice.
#[derive(Debug, Serialize)]
pub struct VisitWithInvoice {
    #[serde(flatten)]
    pub visit: VisitRecord,
    pub time_charge_invoice: TimeChargeInvoice,
}

/// GET /v1/observations response.
#[derive(Debug, Serialize)]
pub struct ObservationListResponse {
    pub observations: Vec<crate::models::Observation>,
    pub total: usize,
}
