//! Observation workflow state and transitions.

pub mod resolver;

pub use resolver::{
    allowed_transitions, resolve, transition_override, workflow_state, ExecutionState,
    ObservationWorkflow, ValidationErrorCode, ValidationState, WorkflowInputs, WorkflowState,
};
