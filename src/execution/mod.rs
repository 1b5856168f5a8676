//! Execution recording: events, lifecycle transitions, and the recorder
//! service.

pub mod events;
pub mod recorder;

pub use events::{
    AtomStage, DatasetStage, ExecutionEvent, ExecutionEventPayload, SequenceCommand, SlewStage,
    StepStage,
};
pub use recorder::{abandon_all, plan_transitions, Caller, Role, TransitionError, TransitionPlan};
