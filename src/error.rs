//! Domain error taxonomy.
//!
//! Every fallible operation in the core returns [`OdbResult`]. Database
//! constraint violations are translated into this taxonomy at the edge of
//! the repository layer; unknown failures surface as `Internal` and are
//! logged by the caller.

use crate::models::ids::{AtomId, ObservationId, StepId, VisitId};
use crate::sequence::smartgcal::SmartGcalKey;

/// Result type for domain operations.
pub type OdbResult<T> = Result<T, OdbError>;

/// The kind of entity referenced by a [`OdbError::NotFound`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Program,
    Observation,
    Visit,
    Atom,
    Step,
    Dataset,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Program => "program",
            EntityKind::Observation => "observation",
            EntityKind::Visit => "visit",
            EntityKind::Atom => "atom",
            EntityKind::Step => "step",
            EntityKind::Dataset => "dataset",
        };
        f.write_str(name)
    }
}

/// Domain error type surfaced uniformly by all core operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OdbError {
    /// Caller lacks the required access; the mutation was aborted.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// A referenced entity is absent or not visible to the caller.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    /// The observation cannot be generated from its current definition.
    #[error("Could not generate sequence for {observation}: {message}")]
    InvalidData {
        observation: ObservationId,
        message: String,
    },

    /// Validated input was rejected.
    #[error("{0}")]
    InvalidArgument(String),

    /// Filename or reference collision.
    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    /// The user attempted an illegal workflow transition.
    #[error("Invalid workflow transition from {from} to {to}")]
    InvalidWorkflowTransition { from: String, to: String },

    /// A call to an external collaborator (ITC, catalog) failed.
    #[error("{service} error: {detail}")]
    ExternalServiceError { service: String, detail: String },

    /// The generator produced more atoms than can be indexed.
    #[error("The generated sequence is too long")]
    SequenceTooLong,

    /// No Smart GCAL definition matches the given instrument configuration.
    #[error("Missing Smart GCAL definition for {0}")]
    MissingSmartGcalDef(SmartGcalKey),

    /// Unexpected failure; details are logged, not surfaced.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OdbError {
    pub fn not_authorized(detail: impl Into<String>) -> Self {
        OdbError::NotAuthorized(detail.into())
    }

    pub fn observation_not_found(id: ObservationId) -> Self {
        OdbError::NotFound {
            kind: EntityKind::Observation,
            id: id.to_string(),
        }
    }

    pub fn visit_not_found(id: VisitId) -> Self {
        OdbError::NotFound {
            kind: EntityKind::Visit,
            id: id.to_string(),
        }
    }

    pub fn atom_not_found(id: AtomId) -> Self {
        OdbError::NotFound {
            kind: EntityKind::Atom,
            id: id.to_string(),
        }
    }

    pub fn step_not_found(id: StepId) -> Self {
        OdbError::NotFound {
            kind: EntityKind::Step,
            id: id.to_string(),
        }
    }

    pub fn invalid_data(observation: ObservationId, message: impl Into<String>) -> Self {
        OdbError::InvalidData {
            observation,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        OdbError::InvalidArgument(message.into())
    }

    pub fn external(service: impl Into<String>, detail: impl Into<String>) -> Self {
        OdbError::ExternalServiceError {
            service: service.into(),
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        OdbError::Internal(detail.into())
    }
}
