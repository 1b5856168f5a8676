//! Sequence generation.
//!
//! Expands a declarative observing mode into lazy acquisition and science
//! sequences. Both sequences are pure functions of their inputs: atom `i`
//! is fully determined by the mode parameters and the ITC result, so the
//! sequences can be regenerated, sliced, and folded without buffering.

use crate::error::{OdbError, OdbResult};
use crate::itc::ItcResult;
use crate::models::{
    Angle, DynamicConfig, GmosCcdMode, GmosGratingConfig, GmosNorthDynamic, GmosNorthFilter,
    GmosNorthLongSlit, GmosRoi, GmosStatic, GuideState, Observation, ObservationId, ObserveClass,
    ObservingMode, Offset, SmartGcalType, StaticConfig, StepConfig, TimeSpan, Wavelength,
};

use super::proto::{GeneratedAtom, ProtoAtom, ProtoStep};
use super::smartgcal::{expand_atom, SmartGcalOracle};

/// Exposure for the through-slit image during acquisition.
const ACQ_SLIT_IMAGE_EXPOSURE: TimeSpan = TimeSpan::from_seconds(20);

/// Deterministic sequence generator for one observation.
#[derive(Debug)]
pub struct SequenceGenerator {
    observation_id: ObservationId,
    mode: GmosNorthLongSlit,
    itc: ItcResult,
}

impl SequenceGenerator {
    /// Build a generator, failing when the observation definition is
    /// insufficient.
    pub fn for_observation(
        observation: &Observation,
        itc: ItcResult,
    ) -> OdbResult<SequenceGenerator> {
        let mode = observation.observing_mode.clone().ok_or_else(|| {
            OdbError::invalid_data(observation.id, "observation has no observing mode")
        })?;
        if itc.science.exposure_count == 0 {
            return Err(OdbError::invalid_data(
                observation.id,
                "integration time calls for zero exposures",
            ));
        }
        let ObservingMode::GmosNorthLongSlit(mode) = mode;
        Ok(SequenceGenerator {
            observation_id: observation.id,
            mode,
            itc,
        })
    }

    pub fn observation_id(&self) -> ObservationId {
        self.observation_id
    }

    pub fn static_config(&self) -> StaticConfig {
        StaticConfig::GmosNorth(GmosStatic::default())
    }

    /// Number of science atoms after `take(n_exposures)`.
    pub fn science_atom_count(&self) -> OdbResult<u32> {
        let n = self.itc.science.exposure_count;
        if n > i32::MAX as u32 {
            return Err(OdbError::SequenceTooLong);
        }
        Ok(n)
    }

    fn science_wavelength(&self, index: u64) -> Wavelength {
        let dithers = self.mode.wavelength_dithers();
        let dither = dithers[(index % dithers.len() as u64) as usize];
        self.mode.central_wavelength.offset_by(dither)
    }

    fn science_offset(&self, index: u64) -> Offset {
        let offsets = self.mode.spatial_offsets();
        Offset::in_q(offsets[(index % offsets.len() as u64) as usize])
    }

    fn science_dynamic(&self, wavelength: Wavelength, exposure: TimeSpan) -> DynamicConfig {
        DynamicConfig::GmosNorth(GmosNorthDynamic {
            exposure,
            ccd_mode: self.mode.ccd_mode,
            roi: self.mode.roi,
            grating: Some(GmosGratingConfig {
                grating: self.mode.grating,
                wavelength,
            }),
            filter: self.mode.filter,
            fpu: Some(self.mode.fpu),
        })
    }

    /// Science atom at a deterministic index: one science exposure at the
    /// dither position paired with its Smart GCAL flat.
    pub fn science_atom(&self, index: u64) -> GeneratedAtom {
        let wavelength = self.science_wavelength(index);
        let offset = self.science_offset(index);
        let description = format!(
            "q {:.1}″, λ {}",
            offset.q.arcseconds().value(),
            wavelength
        );

        let science = ProtoStep::new(
            self.science_dynamic(wavelength, self.itc.science.exposure_time),
            StepConfig::Science {
                offset,
                guide_state: GuideState::Enabled,
            },
            ObserveClass::Science,
        );
        let flat = ProtoStep::new(
            self.science_dynamic(wavelength, TimeSpan::ZERO),
            StepConfig::SmartGcal {
                smart_gcal_type: SmartGcalType::Flat,
            },
            ObserveClass::NightCal,
        );

        ProtoAtom::new(Some(description), vec![science, flat])
    }

    /// The conceptually infinite science sequence.
    pub fn science_atoms(&self) -> impl Iterator<Item = GeneratedAtom> + '_ {
        (0u64..).map(move |i| self.science_atom(i))
    }

    /// Science sequence limited to the ITC exposure count, with Smart GCAL
    /// placeholders expanded.
    pub fn expanded_science_atoms<'a>(
        &'a self,
        oracle: &'a dyn SmartGcalOracle,
    ) -> OdbResult<impl Iterator<Item = OdbResult<GeneratedAtom>> + 'a> {
        let count = self.science_atom_count()?;
        Ok(self
            .science_atoms()
            .take(count as usize)
            .map(move |atom| expand_atom(atom, oracle)))
    }

    /// The acquisition sequence after `take(1)`: a single atom of three
    /// steps at declining regions of interest.
    pub fn acquisition_atoms(&self) -> Vec<GeneratedAtom> {
        let filter = self.mode.filter.or(Some(GmosNorthFilter::GPrime));
        let acq_exposure = self.itc.acquisition.exposure_time;
        let base_offset = Offset::in_q(Angle::ZERO);

        let image = ProtoStep::new(
            DynamicConfig::GmosNorth(GmosNorthDynamic {
                exposure: acq_exposure,
                ccd_mode: GmosCcdMode::default(),
                roi: GmosRoi::Ccd2,
                grating: None,
                filter,
                fpu: None,
            }),
            StepConfig::Science {
                offset: base_offset,
                guide_state: GuideState::Enabled,
            },
            ObserveClass::Acquisition,
        );
        let slit_image = ProtoStep::new(
            DynamicConfig::GmosNorth(GmosNorthDynamic {
                exposure: ACQ_SLIT_IMAGE_EXPOSURE,
                ccd_mode: GmosCcdMode::default(),
                roi: GmosRoi::CentralStamp,
                grating: None,
                filter,
                fpu: Some(self.mode.fpu),
            }),
            StepConfig::Science {
                offset: base_offset,
                guide_state: GuideState::Disabled,
            },
            ObserveClass::Acquisition,
        );
        let slit_verify = ProtoStep::new(
            DynamicConfig::GmosNorth(GmosNorthDynamic {
                exposure: acq_exposure.saturating_mul(4),
                ccd_mode: GmosCcdMode::default(),
                roi: GmosRoi::CentralStamp,
                grating: None,
                filter,
                fpu: Some(self.mode.fpu),
            }),
            StepConfig::Science {
                offset: base_offset,
                guide_state: GuideState::Enabled,
            },
            ObserveClass::Acquisition,
        );

        vec![ProtoAtom::new(
            Some("Initial acquisition".to_string()),
            vec![image, slit_image, slit_verify],
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itc::{IntegrationTime, ItcResult};
    use crate::models::{
        ConstraintSet, GmosNorthFpu, GmosNorthGrating, PosAngleConstraint, ProgramId,
        ScienceRequirements,
    };
    use crate::sequence::smartgcal::TableSmartGcalOracle;

    fn observation() -> Observation {
        Observation {
            id: ObservationId::new(1),
            program_id: ProgramId::new(1),
            title: "test".into(),
            constraint_set: ConstraintSet::default(),
            pos_angle_constraint: PosAngleConstraint::default(),
            base_coordinates: None,
            observing_mode: Some(ObservingMode::GmosNorthLongSlit(GmosNorthLongSlit {
                grating: GmosNorthGrating::R831G5302,
                filter: None,
                fpu: GmosNorthFpu::LongSlit050,
                central_wavelength: Wavelength::from_nanometers(500.0).unwrap(),
                explicit_offsets: None,
                explicit_wavelength_dithers: None,
                ccd_mode: GmosCcdMode::default(),
                roi: GmosRoi::CentralSpectrum,
            })),
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
    fn test_missing_mode_is_invalid_data() {
        let mut obs = observation();
        obs.observing_mode = None;
        let err = SequenceGenerator::for_observation(&obs, itc()).unwrap_err();
        assert!(matches!(err, OdbError::InvalidData { .. }));
    }

    #[test]
    fn test_science_cycles_dither_pattern() {
        let gen = SequenceGenerator::for_observation(&observation(), itc()).unwrap();
        // default spatial offsets alternate 0″ / 15″
        assert_eq!(gen.science_offset(0), Offset::ZERO);
        assert_eq!(gen.science_offset(1), Offset::in_q(Angle::from_arcseconds(15.0)));
        assert_eq!(gen.science_offset(2), Offset::ZERO);
        // default wavelength dithers cycle 0 / +5 nm / -5 nm
        assert_eq!(gen.science_wavelength(0).picometers(), 500_000);
        assert_eq!(gen.science_wavelength(1).picometers(), 505_000);
        assert_eq!(gen.science_wavelength(2).picometers(), 495_000);
        assert_eq!(gen.science_wavelength(3).picometers(), 500_000);
    }

    #[test]
    fn test_atom_description() {
        let gen = SequenceGenerator::for_observation(&observation(), itc()).unwrap();
        let atom = gen.science_atom(1);
        assert_eq!(atom.description.as_deref(), Some("q 15.0″, λ 505.0 nm"));
        assert_eq!(atom.steps.len(), 2);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let gen = SequenceGenerator::for_observation(&observation(), itc()).unwrap();
        assert_eq!(gen.science_atom(4), gen.science_atom(4));
    }

    #[test]
    fn test_take_applies_exposure_count() {
        let gen = SequenceGenerator::for_observation(&observation(), itc()).unwrap();
        let oracle = TableSmartGcalOracle::gmos_north_defaults();
        let atoms: Vec<_> = gen
            .expanded_science_atoms(&oracle)
            .unwrap()
            .collect::<OdbResult<_>>()
            .unwrap();
        assert_eq!(atoms.len(), 6);
        // expansion replaced every placeholder
        for atom in &atoms {
            assert!(atom
                .steps
                .iter()
                .all(|s| !matches!(s.step_config, StepConfig::SmartGcal { .. })));
        }
    }

    #[test]
    fn test_acquisition_is_one_atom_of_three_steps() {
        let gen = SequenceGenerator::for_observation(&observation(), itc()).unwrap();
        let atoms = gen.acquisition_atoms();
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].steps.len(), 3);
        assert!(atoms[0]
            .steps
            .iter()
            .all(|s| s.observe_class == ObserveClass::Acquisition));
    }
}
