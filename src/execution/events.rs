//! Execution events.
//!
//! The telescope reports progress through a small vocabulary of events.
//! Every event carries the visit it belongs to and a timestamp that is
//! strictly monotonic within that visit.

use serde::{Deserialize, Serialize};

use crate::models::{AtomId, DatasetId, StepId, Timestamp, VisitId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlewStage {
    StartSlew,
    EndSlew,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceCommand {
    Start,
    Stop,
    Abort,
    Pause,
    Continue,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AtomStage {
    StartAtom,
    EndAtom,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStage {
    StartStep,
    EndStep,
    Abort,
    Stop,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetStage {
    StartExpose,
    EndExpose,
    StartReadout,
    EndReadout,
    StartWrite,
    EndWrite,
}

/// Event payload, tagged by the level of the hierarchy it addresses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionEventPayload {
    Slew {
        stage: SlewStage,
    },
    Sequence {
        command: SequenceCommand,
    },
    Atom {
        stage: AtomStage,
        atom_id: AtomId,
    },
    Step {
        stage: StepStage,
        step_id: StepId,
    },
    Dataset {
        stage: DatasetStage,
        dataset_id: DatasetId,
        step_id: StepId,
    },
}

/// One event as received from the telescope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub visit_id: VisitId,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub payload: ExecutionEventPayload,
}

impl ExecutionEvent {
    /// The step this event addresses, when it addresses one.
    pub fn step_id(&self) -> Option<StepId> {
        match self.payload {
            ExecutionEventPayload::Step { step_id, .. } => Some(step_id),
            ExecutionEventPayload::Dataset { step_id, .. } => Some(step_id),
            ExecutionEventPayload::Slew { .. }
            | ExecutionEventPayload::Sequence { .. }
            | ExecutionEventPayload::Atom { .. } => None,
        }
    }
}
