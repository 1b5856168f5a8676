//! Generator output vocabulary.
//!
//! The generator produces trees of proto atoms and proto steps: pure
//! values, not yet persisted, suitable both for digest folding and for
//! materializing the execution config served to clients.

use serde::{Deserialize, Serialize};

use crate::models::{DynamicConfig, ObserveClass, StepConfig};

/// One planned step: instrument configuration plus facility configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoStep<D> {
    pub config: D,
    pub step_config: StepConfig,
    pub observe_class: ObserveClass,
}

impl<D> ProtoStep<D> {
    pub fn new(config: D, step_config: StepConfig, observe_class: ObserveClass) -> ProtoStep<D> {
        ProtoStep {
            config,
            step_config,
            observe_class,
        }
    }

    pub fn map<E>(self, f: impl FnOnce(D) -> E) -> ProtoStep<E> {
        ProtoStep {
            config: f(self.config),
            step_config: self.step_config,
            observe_class: self.observe_class,
        }
    }
}

/// An indivisible group of planned steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoAtom<S> {
    /// Human-readable summary, e.g. `q -15.0″, λ 500.0 nm`.
    pub description: Option<String>,
    pub steps: Vec<S>,
}

impl<S> ProtoAtom<S> {
    pub fn new(description: Option<String>, steps: Vec<S>) -> ProtoAtom<S> {
        ProtoAtom { description, steps }
    }

    pub fn map<T>(self, f: impl FnMut(S) -> T) -> ProtoAtom<T> {
        ProtoAtom {
            description: self.description,
            steps: self.steps.into_iter().map(f).collect(),
        }
    }
}

/// A fully generated atom as consumed by the digest fold and the
/// execution-config surface.
pub type GeneratedAtom = ProtoAtom<ProtoStep<DynamicConfig>>;
