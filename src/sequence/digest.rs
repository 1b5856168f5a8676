//! Execution digest: the summarized timing and shape of a generated
//! sequence, plus the content-addressed cache key.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::accounting::CategorizedTime;
use crate::error::{OdbError, OdbResult};
use crate::itc::IntegrationTime;
use crate::models::{ObserveClass, Offset, ObservingMode, TimeSpan};

use super::estimator::{EstimatorState, TimeEstimator};
use super::proto::GeneratedAtom;

/// Slew-and-configure cost of starting (or re-starting) a visit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupTime {
    pub full: TimeSpan,
    pub reacquisition: TimeSpan,
}

impl SetupTime {
    /// Facility standard: 16 minutes for a full setup, 5 to reacquire.
    pub fn standard() -> SetupTime {
        SetupTime {
            full: TimeSpan::from_seconds(960),
            reacquisition: TimeSpan::from_seconds(300),
        }
    }
}

/// Summary of one generated sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDigest {
    /// Most demanding observe class appearing in the sequence.
    pub observe_class: ObserveClass,
    pub planned_time: CategorizedTime,
    pub offsets: BTreeSet<Offset>,
    pub atom_count: u32,
}

impl Default for SequenceDigest {
    fn default() -> Self {
        SequenceDigest {
            observe_class: ObserveClass::DayCal,
            planned_time: CategorizedTime::new(),
            offsets: BTreeSet::new(),
            atom_count: 0,
        }
    }
}

/// Digest of a full observation: setup plus both sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDigest {
    pub setup: SetupTime,
    pub acquisition: SequenceDigest,
    pub science: SequenceDigest,
}

/// Fold a sequence of expanded atoms into its digest, threading the
/// estimator state across atom boundaries.
pub fn fold_sequence<I>(atoms: I, estimator: &TimeEstimator) -> OdbResult<SequenceDigest>
where
    I: IntoIterator<Item = OdbResult<GeneratedAtom>>,
{
    let mut digest = SequenceDigest::default();
    let mut state: Option<EstimatorState> = None;

    for atom in atoms {
        let atom = atom?;
        digest.atom_count = digest
            .atom_count
            .checked_add(1)
            .filter(|n| *n <= i32::MAX as u32)
            .ok_or(OdbError::SequenceTooLong)?;
        for step in &atom.steps {
            let estimate = estimator.estimate(state.as_ref(), step);
            digest
                .planned_time
                .add(step.observe_class.charge_class(), estimate.total());
            if let Some(offset) = step.step_config.offset() {
                digest.offsets.insert(offset);
            }
            digest.observe_class = digest.observe_class.min(step.observe_class);
            state = Some(EstimatorState::advance(state.as_ref(), step));
        }
    }

    Ok(digest)
}

/// Content-addressed cache key: MD5 over the little-endian concatenation
/// of the observing-mode fingerprint, the science exposure time in
/// microseconds (8 bytes), the exposure count (4 bytes), and the system
/// commit hash.
pub fn digest_hash(mode: &ObservingMode, science: &IntegrationTime, commit_hash: &str) -> String {
    let mut bytes = mode.fingerprint_bytes();
    bytes.extend_from_slice(&science.exposure_time.microseconds().to_le_bytes());
    bytes.extend_from_slice(&science.exposure_count.to_le_bytes());
    bytes.extend_from_slice(commit_hash.as_bytes());
    format!("{:x}", md5::compute(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itc::{IntegrationTime, ItcResult};
    use crate::models::{
        Angle, ChargeClass, ConstraintSet, GmosCcdMode, GmosNorthFpu, GmosNorthGrating,
        GmosNorthLongSlit, GmosRoi, Observation, ObservationId, PosAngleConstraint, ProgramId,
        ScienceRequirements, Wavelength,
    };
    use crate::sequence::generator::SequenceGenerator;
    use crate::sequence::smartgcal::TableSmartGcalOracle;

    fn mode() -> ObservingMode {
        ObservingMode::GmosNorthLongSlit(GmosNorthLongSlit {
            grating: GmosNorthGrating::R831G5302,
            filter: None,
            fpu: GmosNorthFpu::LongSlit050,
            central_wavelength: Wavelength::from_nanometers(500.0).unwrap(),
            explicit_offsets: None,
            explicit_wavelength_dithers: None,
            ccd_mode: GmosCcdMode::default(),
            roi: GmosRoi::CentralSpectrum,
        })
    }

    fn observation() -> Observation {
        Observation {
            id: ObservationId::new(7),
            program_id: ProgramId::new(1),
            title: "digest".into(),
            constraint_set: ConstraintSet::default(),
            pos_angle_constraint: PosAngleConstraint::default(),
            base_coordinates: None,
            observing_mode: Some(mode()),
            science_requirements: ScienceRequirements::default(),
            science_band: None,
            user_state: None,
            calibration_role: None,
        }
    }

    fn itc() -> ItcResult {
        ItcResult {
            science: IntegrationTime {
                exposure_time: TimeSpan::from_seconds(10),
                exposure_count: 6,
            },
            acquisition: IntegrationTime {
                exposure_time: TimeSpan::from_seconds(10),
                exposure_count: 1,
            },
        }
    }

    #[test]
    fn test_science_digest_planned_time() {
        let gen = SequenceGenerator::for_observation(&observation(), itc()).unwrap();
        let oracle = TableSmartGcalOracle::gmos_north_defaults();
        let digest = fold_sequence(
            gen.expanded_science_atoms(&oracle).unwrap(),
            &TimeEstimator::new(),
        )
        .unwrap();

        assert_eq!(digest.atom_count, 6);
        assert_eq!(digest.observe_class, ObserveClass::Science);
        assert_eq!(
            digest.planned_time.get(ChargeClass::Program),
            TimeSpan::from_milliseconds(411_600)
        );
        assert_eq!(
            digest.planned_time.get(ChargeClass::Partner),
            TimeSpan::from_milliseconds(357_600)
        );
        assert_eq!(digest.planned_time.get(ChargeClass::NonCharged), TimeSpan::ZERO);
        assert_eq!(
            digest.planned_time.total(),
            TimeSpan::from_milliseconds(769_200)
        );

        let offsets: Vec<Offset> = digest.offsets.iter().copied().collect();
        assert_eq!(
            offsets,
            vec![Offset::ZERO, Offset::in_q(Angle::from_arcseconds(15.0))]
        );
    }

    #[test]
    fn test_acquisition_digest_shape() {
        let gen = SequenceGenerator::for_observation(&observation(), itc()).unwrap();
        let digest = fold_sequence(
            gen.acquisition_atoms().into_iter().map(Ok),
            &TimeEstimator::new(),
        )
        .unwrap();
        assert_eq!(digest.atom_count, 1);
        assert_eq!(digest.observe_class, ObserveClass::Acquisition);
        assert_eq!(
            digest.planned_time.get(ChargeClass::Partner),
            TimeSpan::ZERO
        );
    }

    #[test]
    fn test_digest_hash_is_deterministic() {
        let a = digest_hash(&mode(), &itc().science, "abc123");
        let b = digest_hash(&mode(), &itc().science, "abc123");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_digest_hash_varies_with_inputs() {
        let base = digest_hash(&mode(), &itc().science, "abc123");
        assert_ne!(base, digest_hash(&mode(), &itc().science, "abc124"));
        let other_itc = IntegrationTime {
            exposure_time: TimeSpan::from_seconds(11),
            exposure_count: 6,
        };
        assert_ne!(base, digest_hash(&mode(), &other_itc, "abc123"));
    }
}
