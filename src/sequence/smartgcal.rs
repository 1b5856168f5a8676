//! Smart GCAL lookup.
//!
//! Smart GCAL placeholder steps name only a calibration type; the concrete
//! lamp, diffuser, shutter, and exposure time come from lookup tables keyed
//! by the instrument configuration. The oracle trait abstracts the table
//! source; the bundled table covers the GMOS North long-slit gratings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{OdbError, OdbResult};
use crate::models::{
    DynamicConfig, GcalConfig, GcalDiffuser, GcalFilter, GcalLamp, GcalShutter, GmosNorthGrating,
    Instrument, SmartGcalType, StepConfig,
};

use super::proto::{GeneratedAtom, ProtoStep};

/// Key into the Smart GCAL tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SmartGcalKey {
    pub instrument: Instrument,
    pub gcal_type: SmartGcalType,
    pub grating: Option<GmosNorthGrating>,
}

impl std::fmt::Display for SmartGcalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.grating {
            Some(g) => write!(f, "{} {} ({:?})", self.instrument, self.gcal_type, g),
            None => write!(f, "{} {} (no grating)", self.instrument, self.gcal_type),
        }
    }
}

/// One concrete calibration step from the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartGcalValue {
    pub gcal: GcalConfig,
    pub exposure: crate::models::TimeSpan,
}

/// Source of Smart GCAL definitions.
pub trait SmartGcalOracle: Send + Sync {
    /// Ordered calibration steps for a key, or `None` when no definition
    /// exists.
    fn lookup(&self, key: &SmartGcalKey) -> Option<Vec<SmartGcalValue>>;
}

/// In-memory Smart GCAL table.
pub struct TableSmartGcalOracle {
    entries: HashMap<SmartGcalKey, Vec<SmartGcalValue>>,
}

impl TableSmartGcalOracle {
    pub fn new(entries: HashMap<SmartGcalKey, Vec<SmartGcalValue>>) -> TableSmartGcalOracle {
        TableSmartGcalOracle { entries }
    }

    /// Table covering every GMOS North grating: a one-second quartz-halogen
    /// flat and a thirty-second CuAr arc per grating.
    pub fn gmos_north_defaults() -> TableSmartGcalOracle {
        use GmosNorthGrating::*;
        let mut entries = HashMap::new();
        for grating in [B1200G5301, R831G5302, B600G5307, R600G5304, R400G5305, B480G5309] {
            entries.insert(
                SmartGcalKey {
                    instrument: Instrument::GmosNorth,
                    gcal_type: SmartGcalType::Flat,
                    grating: Some(grating),
                },
                vec![SmartGcalValue {
                    gcal: GcalConfig {
                        lamp: GcalLamp::QuartzHalogen100W,
                        filter: GcalFilter::Gmos,
                        diffuser: GcalDiffuser::Visible,
                        shutter: GcalShutter::Open,
                    },
                    exposure: crate::models::TimeSpan::from_seconds(1),
                }],
            );
            entries.insert(
                SmartGcalKey {
                    instrument: Instrument::GmosNorth,
                    gcal_type: SmartGcalType::Arc,
                    grating: Some(grating),
                },
                vec![SmartGcalValue {
                    gcal: GcalConfig {
                        lamp: GcalLamp::CuArArc,
                        filter: GcalFilter::None,
                        diffuser: GcalDiffuser::Visible,
                        shutter: GcalShutter::Closed,
                    },
                    exposure: crate::models::TimeSpan::from_seconds(30),
                }],
            );
        }
        TableSmartGcalOracle::new(entries)
    }
}

impl SmartGcalOracle for TableSmartGcalOracle {
    fn lookup(&self, key: &SmartGcalKey) -> Option<Vec<SmartGcalValue>> {
        self.entries.get(key).cloned()
    }
}

fn key_for(step: &ProtoStep<DynamicConfig>, gcal_type: SmartGcalType) -> SmartGcalKey {
    let grating = match &step.config {
        DynamicConfig::GmosNorth(d) => d.grating.map(|g| g.grating),
    };
    SmartGcalKey {
        instrument: step.config.instrument(),
        gcal_type,
        grating,
    }
}

/// Replace a Smart GCAL placeholder with the concrete steps it resolves to;
/// other steps pass through unchanged.
pub fn expand_step(
    step: ProtoStep<DynamicConfig>,
    oracle: &dyn SmartGcalOracle,
) -> OdbResult<Vec<ProtoStep<DynamicConfig>>> {
    match step.step_config {
        StepConfig::SmartGcal { smart_gcal_type } => {
            let key = key_for(&step, smart_gcal_type);
            let values = oracle
                .lookup(&key)
                .ok_or(OdbError::MissingSmartGcalDef(key))?;
            Ok(values
                .into_iter()
                .map(|v| {
                    ProtoStep::new(
                        step.config.with_exposure(v.exposure),
                        StepConfig::Gcal(v.gcal),
                        step.observe_class,
                    )
                })
                .collect())
        }
        StepConfig::Bias
        | StepConfig::Dark
        | StepConfig::Gcal(_)
        | StepConfig::Science { .. } => Ok(vec![step]),
    }
}

/// Expand every Smart GCAL placeholder in an atom.
pub fn expand_atom(atom: GeneratedAtom, oracle: &dyn SmartGcalOracle) -> OdbResult<GeneratedAtom> {
    let mut steps = Vec::with_capacity(atom.steps.len());
    for step in atom.steps {
        steps.extend(expand_step(step, oracle)?);
    }
    Ok(GeneratedAtom::new(atom.description, steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        GmosCcdMode, GmosGratingConfig, GmosNorthDynamic, GmosRoi, ObserveClass, TimeSpan,
        Wavelength,
    };

    fn smart_flat_step() -> ProtoStep<DynamicConfig> {
        ProtoStep::new(
            DynamicConfig::GmosNorth(GmosNorthDynamic {
                exposure: TimeSpan::ZERO,
                ccd_mode: GmosCcdMode::default(),
                roi: GmosRoi::CentralSpectrum,
                grating: Some(GmosGratingConfig {
                    grating: GmosNorthGrating::R831G5302,
                    wavelength: Wavelength::from_nanometers(500.0).unwrap(),
                }),
                filter: None,
                fpu: None,
            }),
            StepConfig::SmartGcal {
                smart_gcal_type: SmartGcalType::Flat,
            },
            ObserveClass::NightCal,
        )
    }

    #[test]
    fn test_expands_flat_with_table_exposure() {
        let oracle = TableSmartGcalOracle::gmos_north_defaults();
        let expanded = expand_step(smart_flat_step(), &oracle).unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].config.exposure(), TimeSpan::from_seconds(1));
        assert!(matches!(expanded[0].step_config, StepConfig::Gcal(_)));
        assert_eq!(expanded[0].observe_class, ObserveClass::NightCal);
    }

    #[test]
    fn test_missing_definition_is_an_error() {
        let oracle = TableSmartGcalOracle::new(HashMap::new());
        let err = expand_step(smart_flat_step(), &oracle).unwrap_err();
        assert!(matches!(err, OdbError::MissingSmartGcalDef(_)));
    }

    #[test]
    fn test_non_placeholder_steps_pass_through() {
        let oracle = TableSmartGcalOracle::new(HashMap::new());
        let step = ProtoStep {
            step_config: StepConfig::Bias,
            ..smart_flat_step()
        };
        let expanded = expand_step(step, &oracle).unwrap();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].step_config, StepConfig::Bias);
    }
}
