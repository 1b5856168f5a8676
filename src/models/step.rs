//! Step configuration variants.
//!
//! Every step pairs one instrument configuration with exactly one
//! `StepConfig` describing what the rest of the facility does during the
//! exposure. Pattern matches on `StepConfig` are exhaustive everywhere;
//! there is no catch-all arm.

use serde::{Deserialize, Serialize};

use super::enums::{GuideState, SmartGcalType};
use super::quantities::Offset;

/// Calibration unit lamp selection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GcalLamp {
    IrGreyBodyLow,
    IrGreyBodyHigh,
    QuartzHalogen5W,
    QuartzHalogen100W,
    ArArc,
    ThArArc,
    CuArArc,
    XeArc,
}

impl GcalLamp {
    /// Arc lamps produce line spectra; continuum lamps produce flats.
    pub fn is_arc(&self) -> bool {
        matches!(
            self,
            GcalLamp::ArArc | GcalLamp::ThArArc | GcalLamp::CuArArc | GcalLamp::XeArc
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GcalFilter {
    None,
    Gmos,
    Nd10,
    Nd20,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GcalDiffuser {
    Ir,
    Visible,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GcalShutter {
    Open,
    Closed,
}

/// Full calibration unit configuration for a GCAL exposure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GcalConfig {
    pub lamp: GcalLamp,
    pub filter: GcalFilter,
    pub diffuser: GcalDiffuser,
    pub shutter: GcalShutter,
}

/// What the facility does during one step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepConfig {
    Bias,
    Dark,
    Gcal(GcalConfig),
    Science {
        offset: Offset,
        guide_state: GuideState,
    },
    /// Placeholder resolved against the Smart GCAL tables before execution.
    SmartGcal { smart_gcal_type: SmartGcalType },
}

impl StepConfig {
    /// Telescope offset in effect during the step. GCAL and detector-only
    /// steps leave the telescope where the previous science step put it.
    pub fn offset(&self) -> Option<Offset> {
        match self {
            StepConfig::Science { offset, .. } => Some(*offset),
            StepConfig::Bias | StepConfig::Dark | StepConfig::Gcal(_) | StepConfig::SmartGcal { .. } => {
                None
            }
        }
    }

    /// True when the step uses the calibration unit light path.
    pub fn uses_gcal(&self) -> bool {
        match self {
            StepConfig::Gcal(_) | StepConfig::SmartGcal { .. } => true,
            StepConfig::Bias | StepConfig::Dark | StepConfig::Science { .. } => false,
        }
    }
}
