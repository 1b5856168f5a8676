//! Shared domain enumerations.

use serde::{Deserialize, Serialize};

/// Time category a step or interval is charged against.
///
/// The declaration order is the tie-break order used when selecting among
/// equal cost estimates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeClass {
    NonCharged,
    Partner,
    Program,
}

impl ChargeClass {
    pub const ALL: [ChargeClass; 3] = [
        ChargeClass::NonCharged,
        ChargeClass::Partner,
        ChargeClass::Program,
    ];
}

impl std::fmt::Display for ChargeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChargeClass::NonCharged => "non-charged",
            ChargeClass::Partner => "partner",
            ChargeClass::Program => "program",
        };
        f.write_str(name)
    }
}

/// Purpose of a step; drives its charge classification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObserveClass {
    Science,
    Acquisition,
    /// Nighttime calibration (flats, arcs) taken against partner time.
    NightCal,
    /// Daytime calibration, not charged.
    DayCal,
}

impl ObserveClass {
    pub fn charge_class(&self) -> ChargeClass {
        match self {
            ObserveClass::Science | ObserveClass::Acquisition => ChargeClass::Program,
            ObserveClass::NightCal => ChargeClass::Partner,
            ObserveClass::DayCal => ChargeClass::NonCharged,
        }
    }
}

/// Which of the two generated sequences an atom belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceType {
    Acquisition,
    Science,
}

/// Lifecycle of a recorded atom.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AtomExecutionState {
    NotStarted,
    Ongoing,
    Completed,
    Abandoned,
}

impl AtomExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AtomExecutionState::Completed | AtomExecutionState::Abandoned)
    }
}

/// Lifecycle of a recorded step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepExecutionState {
    NotStarted,
    Ongoing,
    Completed,
    Aborted,
    Stopped,
    Abandoned,
}

impl StepExecutionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            StepExecutionState::NotStarted | StepExecutionState::Ongoing
        )
    }
}

/// Quality assessment of a dataset.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetQaState {
    Pass,
    Usable,
    Fail,
}

/// Whether the telescope is guiding during a science exposure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuideState {
    Enabled,
    Disabled,
}

/// Calibration kind a Smart GCAL placeholder resolves to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmartGcalType {
    Arc,
    Flat,
}

impl std::fmt::Display for SmartGcalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmartGcalType::Arc => f.write_str("arc"),
            SmartGcalType::Flat => f.write_str("flat"),
        }
    }
}

/// Queue band assigned at time allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScienceBand {
    Band1,
    Band2,
    Band3,
    Band4,
}

/// Marks an observation as a calibration rather than science.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalibrationRole {
    Twilight,
    Photometric,
    SpectroPhotometric,
    Telluric,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_class_charges() {
        assert_eq!(ObserveClass::Science.charge_class(), ChargeClass::Program);
        assert_eq!(ObserveClass::Acquisition.charge_class(), ChargeClass::Program);
        assert_eq!(ObserveClass::NightCal.charge_class(), ChargeClass::Partner);
        assert_eq!(ObserveClass::DayCal.charge_class(), ChargeClass::NonCharged);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AtomExecutionState::Ongoing.is_terminal());
        assert!(AtomExecutionState::Abandoned.is_terminal());
        assert!(!StepExecutionState::NotStarted.is_terminal());
        assert!(StepExecutionState::Stopped.is_terminal());
    }

    #[test]
    fn test_charge_class_wire_form() {
        assert_eq!(
            serde_json::to_string(&ChargeClass::NonCharged).unwrap(),
            "\"NON_CHARGED\""
        );
    }
}
