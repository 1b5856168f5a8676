//! Sequence generation core: proto atoms, Smart GCAL expansion, time
//! estimation, digest folding, and the sliced execution config served to
//! clients.

pub mod digest;
pub mod estimator;
pub mod generator;
pub mod proto;
pub mod smartgcal;

pub use digest::{digest_hash, fold_sequence, ExecutionDigest, SequenceDigest, SetupTime};
pub use estimator::{
    ConfigChangeEstimate, DetectorEstimate, EstimatorState, StepEstimate, TimeEstimate,
    TimeEstimator,
};
pub use generator::SequenceGenerator;
pub use proto::{GeneratedAtom, ProtoAtom, ProtoStep};
pub use smartgcal::{SmartGcalKey, SmartGcalOracle, SmartGcalValue, TableSmartGcalOracle};

use serde::{Deserialize, Serialize};

use crate::error::OdbResult;
use crate::models::StaticConfig;

/// Default number of future atoms returned by the execution config.
pub const DEFAULT_FUTURE_LIMIT: u32 = 25;

/// Upper bound on the requested future-atom count.
pub const MAX_FUTURE_LIMIT: u32 = 100;

/// One sequence's remaining atoms, sliced at the future limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSequence {
    pub next_atom: Option<GeneratedAtom>,
    pub possible_future: Vec<GeneratedAtom>,
    pub has_more: bool,
}

/// Materialized execution config for an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoExecutionConfig {
    pub static_config: StaticConfig,
    pub acquisition: ExecutionSequence,
    pub science: ExecutionSequence,
}

/// Slice the remainder of a sequence: skip what has executed, surface the
/// next atom, and materialize at most `future_limit` further atoms.
pub fn execution_sequence<I>(
    atoms: I,
    completed_atoms: u32,
    future_limit: u32,
) -> OdbResult<ExecutionSequence>
where
    I: IntoIterator<Item = OdbResult<GeneratedAtom>>,
{
    let mut remaining = atoms.into_iter().skip(completed_atoms as usize);

    let next_atom = remaining.next().transpose()?;
    let mut possible_future = Vec::with_capacity(future_limit as usize);
    let mut has_more = false;
    for atom in remaining {
        if possible_future.len() == future_limit as usize {
            has_more = true;
            break;
        }
        possible_future.push(atom?);
    }

    Ok(ExecutionSequence {
        next_atom,
        possible_future,
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DynamicConfig, GmosCcdMode, GmosNorthDynamic, GmosRoi, ObserveClass, StepConfig, TimeSpan,
    };

    fn atom(i: usize) -> GeneratedAtom {
        ProtoAtom::new(
            Some(format!("atom {}", i)),
            vec![ProtoStep::new(
                DynamicConfig::GmosNorth(GmosNorthDynamic {
                    exposure: TimeSpan::from_seconds(1),
                    ccd_mode: GmosCcdMode::default(),
                    roi: GmosRoi::FullFrame,
                    grating: None,
                    filter: None,
                    fpu: None,
                }),
                StepConfig::Bias,
                ObserveClass::DayCal,
            )],
        )
    }

    #[test]
    fn test_slices_next_and_future() {
        let atoms: Vec<OdbResult<GeneratedAtom>> = (0..10).map(|i| Ok(atom(i))).collect();
        let seq = execution_sequence(atoms, 2, 3).unwrap();
        assert_eq!(seq.next_atom.unwrap().description.as_deref(), Some("atom 2"));
        assert_eq!(seq.possible_future.len(), 3);
        assert!(seq.has_more);
    }

    #[test]
    fn test_exhausted_sequence() {
        let atoms: Vec<OdbResult<GeneratedAtom>> = (0..2).map(|i| Ok(atom(i))).collect();
        let seq = execution_sequence(atoms, 2, 5).unwrap();
        assert!(seq.next_atom.is_none());
        assert!(seq.possible_future.is_empty());
        assert!(!seq.has_more);
    }

    #[test]
    fn test_future_limit_zero() {
        let atoms: Vec<OdbResult<GeneratedAtom>> = (0..3).map(|i| Ok(atom(i))).collect();
        let seq = execution_sequence(atoms, 0, 0).unwrap();
        assert!(seq.next_atom.is_some());
        assert!(seq.possible_future.is_empty());
        assert!(seq.has_more);
    }
}
