//! Observation definition: constraints, position angle, science
//! requirements, and the declarative observing mode.

use serde::{Deserialize, Serialize};

use crate::error::{OdbError, OdbResult};

use super::enums::{CalibrationRole, ScienceBand};
use super::ids::{ObservationId, ProgramId};
use super::instrument::{Instrument, ObservingMode};
use super::quantities::{Angle, Coordinates, Site, Wavelength};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudExtinction {
    PointOne,
    PointThree,
    PointFive,
    OnePointZero,
    OnePointFive,
    TwoPointZero,
    ThreePointZero,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageQuality {
    PointOne,
    PointTwo,
    PointSix,
    OnePointZero,
    OnePointFive,
    TwoPointZero,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkyBackground {
    Darkest,
    Dark,
    Gray,
    Bright,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaterVapor {
    VeryDry,
    Dry,
    Median,
    Wet,
}

/// Elevation constraint, expressed either as an air-mass range or an
/// hour-angle range.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElevationRange {
    AirMass { min: f64, max: f64 },
    HourAngle { min_hours: f64, max_hours: f64 },
}

impl ElevationRange {
    pub const AIR_MASS_MIN: f64 = 1.0;
    pub const AIR_MASS_MAX: f64 = 3.0;
    pub const HOUR_ANGLE_MIN: f64 = -5.0;
    pub const HOUR_ANGLE_MAX: f64 = 5.0;

    pub fn air_mass(min: f64, max: f64) -> OdbResult<ElevationRange> {
        if !(Self::AIR_MASS_MIN..=Self::AIR_MASS_MAX).contains(&min)
            || !(Self::AIR_MASS_MIN..=Self::AIR_MASS_MAX).contains(&max)
        {
            return Err(OdbError::invalid_argument(format!(
                "Air mass must range from {} to {}",
                Self::AIR_MASS_MIN,
                Self::AIR_MASS_MAX
            )));
        }
        if min >= max {
            return Err(OdbError::invalid_argument(
                "Air mass minimum must be below the maximum",
            ));
        }
        Ok(ElevationRange::AirMass { min, max })
    }

    pub fn hour_angle(min_hours: f64, max_hours: f64) -> OdbResult<ElevationRange> {
        if !(Self::HOUR_ANGLE_MIN..=Self::HOUR_ANGLE_MAX).contains(&min_hours)
            || !(Self::HOUR_ANGLE_MIN..=Self::HOUR_ANGLE_MAX).contains(&max_hours)
        {
            return Err(OdbError::invalid_argument(format!(
                "Hour angle must range from {} to {} hours",
                Self::HOUR_ANGLE_MIN,
                Self::HOUR_ANGLE_MAX
            )));
        }
        if min_hours >= max_hours {
            return Err(OdbError::invalid_argument(
                "Hour angle minimum must be below the maximum",
            ));
        }
        Ok(ElevationRange::HourAngle { min_hours, max_hours })
    }
}

impl Default for ElevationRange {
    fn default() -> Self {
        ElevationRange::AirMass { min: 1.0, max: 2.0 }
    }
}

/// Observing conditions the observation requires.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub cloud_extinction: CloudExtinction,
    pub image_quality: ImageQuality,
    pub sky_background: SkyBackground,
    pub water_vapor: WaterVapor,
    pub elevation_range: ElevationRange,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        ConstraintSet {
            cloud_extinction: CloudExtinction::PointThree,
            image_quality: ImageQuality::PointSix,
            sky_background: SkyBackground::Gray,
            water_vapor: WaterVapor::Wet,
            elevation_range: ElevationRange::default(),
        }
    }
}

/// Position-angle constraint on the science field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PosAngleConstraint {
    Fixed { angle: Angle },
    AllowFlip { angle: Angle },
    AverageParallactic,
    ParallacticOverride { angle: Angle },
    Unbounded,
}

impl Default for PosAngleConstraint {
    fn default() -> Self {
        PosAngleConstraint::Fixed { angle: Angle::ZERO }
    }
}

/// Science requirements feeding the ITC call.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScienceRequirements {
    pub wavelength: Option<Wavelength>,
    pub signal_to_noise: Option<f64>,
    pub signal_to_noise_at: Option<Wavelength>,
}

/// User-settable workflow override.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserWorkflowState {
    Inactive,
    Ready,
}

/// A logical science request against a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: ObservationId,
    pub program_id: ProgramId,
    pub title: String,
    pub constraint_set: ConstraintSet,
    pub pos_angle_constraint: PosAngleConstraint,
    /// Explicit base position; when absent the target's coordinates apply.
    pub base_coordinates: Option<Coordinates>,
    pub observing_mode: Option<ObservingMode>,
    pub science_requirements: ScienceRequirements,
    pub science_band: Option<ScienceBand>,
    pub user_state: Option<UserWorkflowState>,
    pub calibration_role: Option<CalibrationRole>,
}

impl Observation {
    pub fn instrument(&self) -> Option<Instrument> {
        self.observing_mode.as_ref().map(ObservingMode::instrument)
    }

    pub fn site(&self) -> Option<Site> {
        self.instrument().map(|i| i.site())
    }

    pub fn is_calibration(&self) -> bool {
        self.calibration_role.is_some()
    }
}
