//! Observation CRUD operations.

use async_trait::async_trait;

use crate::models::{
    CalibrationRole, ConstraintSet, Coordinates, Observation, ObservationId, ObservingMode,
    PosAngleConstraint, ProgramId, ScienceBand, ScienceRequirements, UserWorkflowState,
};

use super::error::RepositoryResult;

/// Everything that defines an observation except its identity. The
/// repository mints the id on creation.
#[derive(Debug, Clone)]
pub struct ObservationDefinition {
    pub program_id: ProgramId,
    pub title: String,
    pub constraint_set: ConstraintSet,
    pub pos_angle_constraint: PosAngleConstraint,
    pub base_coordinates: Option<Coordinates>,
    pub observing_mode: Option<ObservingMode>,
    pub science_requirements: ScienceRequirements,
    pub science_band: Option<ScienceBand>,
    pub user_state: Option<UserWorkflowState>,
    pub calibration_role: Option<CalibrationRole>,
}

impl ObservationDefinition {
    pub fn into_observation(self, id: ObservationId) -> Observation {
        Observation {
            id,
            program_id: self.program_id,
            title: self.title,
            constraint_set: self.constraint_set,
            pos_angle_constraint: self.pos_angle_constraint,
            base_coordinates: self.base_coordinates,
            observing_mode: self.observing_mode,
            science_requirements: self.science_requirements,
            science_band: self.science_band,
            user_state: self.user_state,
            calibration_role: self.calibration_role,
        }
    }
}

impl From<Observation> for ObservationDefinition {
    fn from(o: Observation) -> ObservationDefinition {
        ObservationDefinition {
            program_id: o.program_id,
            title: o.title,
            constraint_set: o.constraint_set,
            pos_angle_constraint: o.pos_angle_constraint,
            base_coordinates: o.base_coordinates,
            observing_mode: o.observing_mode,
            science_requirements: o.science_requirements,
            science_band: o.science_band,
            user_state: o.user_state,
            calibration_role: o.calibration_role,
        }
    }
}

#[async_trait]
pub trait ObservationRepository: Send + Sync {
    /// Verify the backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Create an observation, minting its id.
    async fn create_observation(
        &self,
        definition: ObservationDefinition,
    ) -> RepositoryResult<Observation>;

    async fn get_observation(&self, id: ObservationId) -> RepositoryResult<Option<Observation>>;

    /// Observations of a program, ordered by id, up to `limit`.
    async fn list_observations(
        &self,
        program_id: ProgramId,
        limit: u32,
    ) -> RepositoryResult<Vec<Observation>>;

    /// Replace an existing observation's definition.
    async fn update_observation(&self, observation: &Observation) -> RepositoryResult<()>;

    /// Set or clear the user workflow override.
    async fn set_user_state(
        &self,
        id: ObservationId,
        state: Option<UserWorkflowState>,
    ) -> RepositoryResult<()>;
}
