//! Observation workflow resolution.
//!
//! Combines validation results, execution state, and the user's override
//! into the observation's current workflow state and the transitions a
//! user may legally request from it.

use serde::{Deserialize, Serialize};

use crate::error::{OdbError, OdbResult};
use crate::models::UserWorkflowState;

/// Validation failure codes, ordered by severity: the least code present
/// determines the validation state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorCode {
    CallForProposals,
    Configuration,
    Itc,
    ConfigurationRequestUnavailable,
    ConfigurationRequestNotRequested,
    ConfigurationRequestDenied,
    ConfigurationRequestPending,
}

/// Validation outcome folded from the error codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationState {
    Undefined,
    Unapproved,
    Defined,
}

impl ValidationState {
    /// Fold the current error codes; no errors means the observation is
    /// fully defined.
    pub fn from_errors(errors: &[ValidationErrorCode]) -> ValidationState {
        match errors.iter().min() {
            None => ValidationState::Defined,
            Some(
                ValidationErrorCode::CallForProposals
                | ValidationErrorCode::Configuration
                | ValidationErrorCode::Itc,
            ) => ValidationState::Undefined,
            Some(_) => ValidationState::Unapproved,
        }
    }

    fn workflow_state(&self) -> WorkflowState {
        match self {
            ValidationState::Undefined => WorkflowState::Undefined,
            ValidationState::Unapproved => WorkflowState::Unapproved,
            ValidationState::Defined => WorkflowState::Defined,
        }
    }
}

/// Execution progress as reported by the recorder.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    NotStarted,
    Ongoing,
    Completed,
}

/// Current workflow state of an observation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Inactive,
    Undefined,
    Unapproved,
    Defined,
    Ready,
    Ongoing,
    Completed,
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowState::Inactive => "inactive",
            WorkflowState::Undefined => "undefined",
            WorkflowState::Unapproved => "unapproved",
            WorkflowState::Defined => "defined",
            WorkflowState::Ready => "ready",
            WorkflowState::Ongoing => "ongoing",
            WorkflowState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Everything the resolver needs to know about one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInputs {
    pub validation_errors: Vec<ValidationErrorCode>,
    pub execution: ExecutionState,
    pub user_state: Option<UserWorkflowState>,
    pub is_calibration: bool,
    pub proposal_accepted: bool,
}

impl WorkflowInputs {
    /// Calibrations are implicitly ready.
    fn effective_user_state(&self) -> Option<UserWorkflowState> {
        if self.is_calibration {
            Some(UserWorkflowState::Ready)
        } else {
            self.user_state
        }
    }

    /// The state the observation would be in with no user override.
    fn base_state(&self) -> WorkflowState {
        match self.execution {
            ExecutionState::Completed => WorkflowState::Completed,
            ExecutionState::Ongoing => WorkflowState::Ongoing,
            ExecutionState::NotStarted => {
                ValidationState::from_errors(&self.validation_errors).workflow_state()
            }
        }
    }
}

/// Resolved workflow: the current state plus the transitions a user may
/// request from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationWorkflow {
    pub state: WorkflowState,
    pub validation_errors: Vec<ValidationErrorCode>,
    pub allowed_transitions: Vec<WorkflowState>,
}

/// Compute the current workflow state.
pub fn workflow_state(inputs: &WorkflowInputs) -> WorkflowState {
    if inputs.execution == ExecutionState::Completed {
        return WorkflowState::Completed;
    }
    match inputs.effective_user_state() {
        Some(UserWorkflowState::Inactive) => WorkflowState::Inactive,
        user => {
            if inputs.execution == ExecutionState::Ongoing {
                WorkflowState::Ongoing
            } else {
                match user {
                    Some(UserWorkflowState::Ready) => WorkflowState::Ready,
                    Some(UserWorkflowState::Inactive) => WorkflowState::Inactive,
                    None => ValidationState::from_errors(&inputs.validation_errors)
                        .workflow_state(),
                }
            }
        }
    }
}

/// Legal transitions from the current state. Calibration observations
/// expose none.
pub fn allowed_transitions(inputs: &WorkflowInputs) -> Vec<WorkflowState> {
    if inputs.is_calibration {
        return Vec::new();
    }
    let validation = ValidationState::from_errors(&inputs.validation_errors).workflow_state();
    match workflow_state(inputs) {
        WorkflowState::Inactive => vec![match inputs.execution {
            ExecutionState::Ongoing => WorkflowState::Ongoing,
            ExecutionState::NotStarted | ExecutionState::Completed => validation,
        }],
        WorkflowState::Undefined => vec![WorkflowState::Inactive],
        WorkflowState::Unapproved => vec![WorkflowState::Inactive],
        WorkflowState::Defined => {
            let mut targets = vec![WorkflowState::Inactive];
            if inputs.proposal_accepted {
                targets.push(WorkflowState::Ready);
            }
            targets
        }
        WorkflowState::Ready => vec![WorkflowState::Inactive, validation],
        WorkflowState::Ongoing => vec![WorkflowState::Inactive],
        WorkflowState::Completed => Vec::new(),
    }
}

/// Resolve state and transitions together.
pub fn resolve(inputs: &WorkflowInputs) -> ObservationWorkflow {
    ObservationWorkflow {
        state: workflow_state(inputs),
        validation_errors: inputs.validation_errors.clone(),
        allowed_transitions: allowed_transitions(inputs),
    }
}

/// The user-state override that realizes a requested transition, or an
/// error when the transition is illegal from the current state.
pub fn transition_override(
    inputs: &WorkflowInputs,
    target: WorkflowState,
) -> OdbResult<Option<UserWorkflowState>> {
    let current = workflow_state(inputs);
    if !allowed_transitions(inputs).contains(&target) {
        return Err(OdbError::InvalidWorkflowTransition {
            from: current.to_string(),
            to: target.to_string(),
        });
    }
    Ok(match target {
        WorkflowState::Inactive => Some(UserWorkflowState::Inactive),
        WorkflowState::Ready => Some(UserWorkflowState::Ready),
        // returning to the computed state clears the override
        WorkflowState::Undefined
        | WorkflowState::Unapproved
        | WorkflowState::Defined
        | WorkflowState::Ongoing
        | WorkflowState::Completed => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> WorkflowInputs {
        WorkflowInputs {
            validation_errors: Vec::new(),
            execution: ExecutionState::NotStarted,
            user_state: None,
            is_calibration: false,
            proposal_accepted: true,
        }
    }

    #[test]
    fn test_validation_folds_by_least_code() {
        let errors = vec![
            ValidationErrorCode::ConfigurationRequestPending,
            ValidationErrorCode::Configuration,
        ];
        assert_eq!(
            ValidationState::from_errors(&errors),
            ValidationState::Undefined
        );
        assert_eq!(
            ValidationState::from_errors(&[ValidationErrorCode::ConfigurationRequestDenied]),
            ValidationState::Unapproved
        );
        assert_eq!(ValidationState::from_errors(&[]), ValidationState::Defined);
    }

    #[test]
    fn test_completed_execution_wins() {
        let mut i = inputs();
        i.execution = ExecutionState::Completed;
        i.user_state = Some(UserWorkflowState::Inactive);
        assert_eq!(workflow_state(&i), WorkflowState::Completed);
        assert!(allowed_transitions(&i).is_empty());
    }

    #[test]
    fn test_inactive_override_beats_ongoing() {
        let mut i = inputs();
        i.execution = ExecutionState::Ongoing;
        i.user_state = Some(UserWorkflowState::Inactive);
        assert_eq!(workflow_state(&i), WorkflowState::Inactive);
        assert_eq!(allowed_transitions(&i), vec![WorkflowState::Ongoing]);
    }

    #[test]
    fn test_defined_offers_ready_only_when_accepted() {
        let mut i = inputs();
        assert_eq!(workflow_state(&i), WorkflowState::Defined);
        assert_eq!(
            allowed_transitions(&i),
            vec![WorkflowState::Inactive, WorkflowState::Ready]
        );
        i.proposal_accepted = false;
        assert_eq!(allowed_transitions(&i), vec![WorkflowState::Inactive]);
    }

    #[test]
    fn test_transitions_exclude_current_state() {
        for execution in [
            ExecutionState::NotStarted,
            ExecutionState::Ongoing,
            ExecutionState::Completed,
        ] {
            for user_state in [None, Some(UserWorkflowState::Inactive), Some(UserWorkflowState::Ready)] {
                let i = WorkflowInputs {
                    validation_errors: Vec::new(),
                    execution,
                    user_state,
                    is_calibration: false,
                    proposal_accepted: true,
                };
                let current = workflow_state(&i);
                assert!(
                    !allowed_transitions(&i).contains(&current),
                    "transitions from {:?} include itself",
                    current
                );
            }
        }
    }

    #[test]
    fn test_calibrations_are_ready_with_no_transitions() {
        let mut i = inputs();
        i.is_calibration = true;
        assert_eq!(workflow_state(&i), WorkflowState::Ready);
        assert!(allowed_transitions(&i).is_empty());
    }

    #[test]
    fn test_illegal_transition_is_rejected() {
        let i = inputs();
        let err = transition_override(&i, WorkflowState::Ongoing).unwrap_err();
        assert!(matches!(err, OdbError::InvalidWorkflowTransition { .. }));
    }

    #[test]
    fn test_ready_can_return_to_validation_state() {
        let mut i = inputs();
        i.user_state = Some(UserWorkflowState::Ready);
        assert_eq!(workflow_state(&i), WorkflowState::Ready);
        assert_eq!(
            allowed_transitions(&i),
            vec![WorkflowState::Inactive, WorkflowState::Defined]
        );
        assert_eq!(transition_override(&i, WorkflowState::Defined).unwrap(), None);
    }
}
