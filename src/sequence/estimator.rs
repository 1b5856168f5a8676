//! Per-step time estimation.
//!
//! A step's cost is the selected configuration-change cost (the most
//! expensive applicable change) plus the detector cost (exposure, readout,
//! write). All arithmetic is integer microseconds so that equal inputs give
//! bit-equal estimates.

use serde::Serialize;

use crate::models::{
    ChargeClass, DynamicConfig, GmosAmpCount, GmosAmpReadMode, GmosCcdMode, GmosRoi, Offset,
    StepConfig, TimeSpan,
};

use super::proto::ProtoStep;

/// A single named cost at a charge class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeEstimate {
    pub name: &'static str,
    pub charge_class: ChargeClass,
    pub amount: TimeSpan,
}

/// All applicable configuration-change costs for a step, with the selected
/// (maximum) one. Ties select the earliest candidate in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigChangeEstimate {
    pub candidates: Vec<TimeEstimate>,
    pub selected: TimeEstimate,
}

/// Detector-side cost of one exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectorEstimate {
    pub exposure: TimeSpan,
    pub readout: TimeSpan,
    pub write: TimeSpan,
    pub charge_class: ChargeClass,
}

impl DetectorEstimate {
    pub fn total(&self) -> TimeSpan {
        self.exposure + self.readout + self.write
    }
}

/// Complete estimate for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepEstimate {
    pub config_change: Option<ConfigChangeEstimate>,
    pub detector: DetectorEstimate,
}

impl StepEstimate {
    pub fn total(&self) -> TimeSpan {
        let change = self
            .config_change
            .as_ref()
            .map(|c| c.selected.amount)
            .unwrap_or(TimeSpan::ZERO);
        change + self.detector.total()
    }
}

/// What the estimator remembers about the previously executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatorState {
    pub config: DynamicConfig,
    pub step_config: StepConfig,
    /// Effective telescope offset after the step; GCAL and detector steps
    /// leave the telescope in place.
    pub offset: Offset,
}

impl EstimatorState {
    /// State after executing `step` from `prev`.
    pub fn advance(prev: Option<&EstimatorState>, step: &ProtoStep<DynamicConfig>) -> EstimatorState {
        let carried = prev.map(|p| p.offset).unwrap_or(Offset::ZERO);
        EstimatorState {
            config: step.config.clone(),
            step_config: step.step_config,
            offset: step.step_config.offset().unwrap_or(carried),
        }
    }
}

const GRATING_CHANGE: TimeSpan = TimeSpan::from_seconds(90);
const FILTER_CHANGE: TimeSpan = TimeSpan::from_seconds(20);
const FPU_CHANGE: TimeSpan = TimeSpan::from_seconds(60);
const READOUT_MODE_CHANGE: TimeSpan = TimeSpan::from_seconds(30);
const SCIENCE_FOLD_MOVE: TimeSpan = TimeSpan::from_milliseconds(7_500);
const OFFSET_CONSTANT: TimeSpan = TimeSpan::from_seconds(7);
const DATASET_WRITE: TimeSpan = TimeSpan::from_seconds(10);

/// Linear offset-move model: a constant plus time proportional to distance.
fn offset_cost(distance: crate::models::Angle) -> TimeSpan {
    let uas = distance.microarcseconds().unsigned_abs();
    OFFSET_CONSTANT + TimeSpan::from_microseconds(uas * 2 / 15)
}

/// Full-frame 1×1 readout in microseconds.
fn readout_base_micros(mode: &GmosCcdMode) -> u64 {
    match (mode.amp_read_mode, mode.amp_count) {
        (GmosAmpReadMode::Slow, GmosAmpCount::Twelve) => 164_400_000,
        (GmosAmpReadMode::Slow, GmosAmpCount::Six) => 288_000_000,
        (GmosAmpReadMode::Slow, GmosAmpCount::Three) => 552_000_000,
        (GmosAmpReadMode::Fast, GmosAmpCount::Twelve) => 38_400_000,
        (GmosAmpReadMode::Fast, GmosAmpCount::Six) => 67_200_000,
        (GmosAmpReadMode::Fast, GmosAmpCount::Three) => 126_000_000,
    }
}

/// Fraction of the detector read for each region of interest.
fn roi_fraction(roi: GmosRoi) -> (u64, u64) {
    match roi {
        GmosRoi::FullFrame => (1, 1),
        GmosRoi::Ccd2 => (1, 3),
        GmosRoi::CentralSpectrum => (1, 2),
        GmosRoi::CentralStamp => (1, 20),
    }
}

/// Readout duration for a CCD mode and region of interest.
pub fn readout_time(mode: &GmosCcdMode, roi: GmosRoi) -> TimeSpan {
    let base = readout_base_micros(mode);
    let (num, den) = roi_fraction(roi);
    let bin = (mode.x_bin.count() as u64) * (mode.y_bin.count() as u64);
    TimeSpan::from_microseconds(base * num / (den * bin))
}

/// Deterministic per-step cost model.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeEstimator;

impl TimeEstimator {
    pub fn new() -> TimeEstimator {
        TimeEstimator
    }

    /// Estimate one step given the previous executed step, if any.
    pub fn estimate(
        &self,
        prev: Option<&EstimatorState>,
        step: &ProtoStep<DynamicConfig>,
    ) -> StepEstimate {
        let charge_class = step.observe_class.charge_class();
        let config_change = prev.and_then(|p| self.config_change(p, step, charge_class));
        let detector = self.detector(step, charge_class);
        StepEstimate {
            config_change,
            detector,
        }
    }

    fn config_change(
        &self,
        prev: &EstimatorState,
        step: &ProtoStep<DynamicConfig>,
        charge_class: ChargeClass,
    ) -> Option<ConfigChangeEstimate> {
        let mut candidates = Vec::new();
        let mut push = |name: &'static str, amount: TimeSpan| {
            candidates.push(TimeEstimate {
                name,
                charge_class,
                amount,
            });
        };

        let (DynamicConfig::GmosNorth(prev_cfg), DynamicConfig::GmosNorth(next_cfg)) =
            (&prev.config, &step.config);

        if prev_cfg.grating.map(|g| g.grating) != next_cfg.grating.map(|g| g.grating) {
            push("grating change", GRATING_CHANGE);
        }
        if prev_cfg.filter != next_cfg.filter {
            push("filter change", FILTER_CHANGE);
        }
        if prev_cfg.fpu != next_cfg.fpu {
            push("FPU change", FPU_CHANGE);
        }

        let next_offset = step.step_config.offset().unwrap_or(prev.offset);
        if next_offset != prev.offset {
            push("offset move", offset_cost(next_offset.distance(&prev.offset)));
        }

        if prev_cfg.ccd_mode != next_cfg.ccd_mode {
            push("readout mode change", READOUT_MODE_CHANGE);
        }
        if prev.step_config.uses_gcal() != step.step_config.uses_gcal() {
            push("science fold move", SCIENCE_FOLD_MOVE);
        }

        // max by amount; the earliest candidate wins ties
        let mut selected = candidates.first()?.clone();
        for candidate in &candidates[1..] {
            if candidate.amount > selected.amount {
                selected = candidate.clone();
            }
        }

        Some(ConfigChangeEstimate {
            candidates,
            selected,
        })
    }

    fn detector(&self, step: &ProtoStep<DynamicConfig>, charge_class: ChargeClass) -> DetectorEstimate {
        let DynamicConfig::GmosNorth(cfg) = &step.config;
        DetectorEstimate {
            exposure: cfg.exposure,
            readout: readout_time(&cfg.ccd_mode, cfg.roi),
            write: DATASET_WRITE,
            charge_class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Angle, GcalConfig, GcalDiffuser, GcalFilter, GcalLamp, GcalShutter, GmosGratingConfig,
        GmosNorthDynamic, GmosNorthGrating, GuideState, ObserveClass, Wavelength,
    };

    fn dynamic(exposure_s: u64) -> DynamicConfig {
        DynamicConfig::GmosNorth(GmosNorthDynamic {
            exposure: TimeSpan::from_seconds(exposure_s),
            ccd_mode: GmosCcdMode::default(),
            roi: GmosRoi::CentralSpectrum,
            grating: Some(GmosGratingConfig {
                grating: GmosNorthGrating::R831G5302,
                wavelength: Wavelength::from_nanometers(500.0).unwrap(),
            }),
            filter: None,
            fpu: None,
        })
    }

    fn science_step(q_arcsec: f64) -> ProtoStep<DynamicConfig> {
        ProtoStep::new(
            dynamic(10),
            StepConfig::Science {
                offset: Offset::in_q(Angle::from_arcseconds(q_arcsec)),
                guide_state: GuideState::Enabled,
            },
            ObserveClass::Science,
        )
    }

    fn flat_step() -> ProtoStep<DynamicConfig> {
        ProtoStep::new(
            dynamic(1),
            StepConfig::Gcal(GcalConfig {
                lamp: GcalLamp::QuartzHalogen100W,
                filter: GcalFilter::Gmos,
                diffuser: GcalDiffuser::Visible,
                shutter: GcalShutter::Open,
            }),
            ObserveClass::NightCal,
        )
    }

    #[test]
    fn test_default_science_readout() {
        assert_eq!(
            readout_time(&GmosCcdMode::default(), GmosRoi::CentralSpectrum),
            TimeSpan::from_milliseconds(41_100)
        );
    }

    #[test]
    fn test_first_step_has_no_config_change() {
        let est = TimeEstimator::new().estimate(None, &science_step(0.0));
        assert!(est.config_change.is_none());
        // 10 s exposure + 41.1 s readout + 10 s write
        assert_eq!(est.total(), TimeSpan::from_milliseconds(61_100));
    }

    #[test]
    fn test_flat_after_science_costs_the_fold() {
        let estimator = TimeEstimator::new();
        let state = EstimatorState::advance(None, &science_step(0.0));
        let est = estimator.estimate(Some(&state), &flat_step());
        let change = est.config_change.unwrap();
        assert_eq!(change.selected.name, "science fold move");
        assert_eq!(change.selected.amount, TimeSpan::from_milliseconds(7_500));
        assert_eq!(change.selected.charge_class, ChargeClass::Partner);
    }

    #[test]
    fn test_offset_move_dominates_fold_on_return_to_science() {
        let estimator = TimeEstimator::new();
        let s0 = EstimatorState::advance(None, &science_step(0.0));
        let s1 = EstimatorState::advance(Some(&s0), &flat_step());
        // telescope stayed at q=0 through the flat
        assert_eq!(s1.offset, Offset::ZERO);
        let est = estimator.estimate(Some(&s1), &science_step(15.0));
        let change = est.config_change.unwrap();
        assert_eq!(change.selected.name, "offset move");
        // 7 s constant + 15″ / 7.5″ per second
        assert_eq!(change.selected.amount, TimeSpan::from_seconds(9));
        assert_eq!(change.candidates.len(), 2);
    }

    #[test]
    fn test_equal_inputs_equal_outputs() {
        let estimator = TimeEstimator::new();
        let state = EstimatorState::advance(None, &science_step(0.0));
        let a = estimator.estimate(Some(&state), &flat_step());
        let b = estimator.estimate(Some(&state), &flat_step());
        assert_eq!(a, b);
    }
}
