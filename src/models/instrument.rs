//! GMOS instrument model: observing modes, static and per-step dynamic
//! configuration, and the canonical fingerprint bytes hashed into the
//! execution digest key.

use serde::{Deserialize, Serialize};

use super::quantities::{Angle, Site, Wavelength};
use super::time::TimeSpan;

/// Instruments known to the sequence generator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Instrument {
    GmosNorth,
    GmosSouth,
}

impl Instrument {
    pub fn site(&self) -> Site {
        match self {
            Instrument::GmosNorth => Site::Gn,
            Instrument::GmosSouth => Site::Gs,
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instrument::GmosNorth => f.write_str("GMOS-N"),
            Instrument::GmosSouth => f.write_str("GMOS-S"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GmosNorthGrating {
    B1200G5301,
    R831G5302,
    B600G5307,
    R600G5304,
    R400G5305,
    B480G5309,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GmosNorthFilter {
    GPrime,
    RPrime,
    IPrime,
    ZPrime,
    Gg455,
    Og515,
    Rg610,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GmosNorthFpu {
    LongSlit025,
    LongSlit050,
    LongSlit075,
    LongSlit100,
    LongSlit150,
    LongSlit200,
    LongSlit500,
}

impl GmosNorthFpu {
    /// Slit width on the sky.
    pub fn slit_width(&self) -> Angle {
        let mas = match self {
            GmosNorthFpu::LongSlit025 => 250,
            GmosNorthFpu::LongSlit050 => 500,
            GmosNorthFpu::LongSlit075 => 750,
            GmosNorthFpu::LongSlit100 => 1_000,
            GmosNorthFpu::LongSlit150 => 1_500,
            GmosNorthFpu::LongSlit200 => 2_000,
            GmosNorthFpu::LongSlit500 => 5_000,
        };
        Angle::from_milliarcseconds(mas)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GmosBinning {
    One,
    Two,
    Four,
}

impl GmosBinning {
    pub fn count(&self) -> u8 {
        match self {
            GmosBinning::One => 1,
            GmosBinning::Two => 2,
            GmosBinning::Four => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GmosAmpCount {
    Three,
    Six,
    Twelve,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GmosAmpReadMode {
    Slow,
    Fast,
}

/// Detector region of interest, in declining coverage order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GmosRoi {
    FullFrame,
    Ccd2,
    CentralSpectrum,
    CentralStamp,
}

/// CCD readout configuration shared by GMOS North and South.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GmosCcdMode {
    pub x_bin: GmosBinning,
    pub y_bin: GmosBinning,
    pub amp_count: GmosAmpCount,
    pub amp_read_mode: GmosAmpReadMode,
}

impl Default for GmosCcdMode {
    fn default() -> Self {
        GmosCcdMode {
            x_bin: GmosBinning::One,
            y_bin: GmosBinning::Two,
            amp_count: GmosAmpCount::Twelve,
            amp_read_mode: GmosAmpReadMode::Slow,
        }
    }
}

/// GMOS North long-slit observing mode parameters.
///
/// Spatial offsets and wavelength dithers fall back to instrument defaults
/// when not given explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmosNorthLongSlit {
    pub grating: GmosNorthGrating,
    pub filter: Option<GmosNorthFilter>,
    pub fpu: GmosNorthFpu,
    pub central_wavelength: Wavelength,
    /// Explicit q-axis spatial offsets, if configured.
    pub explicit_offsets: Option<Vec<Angle>>,
    /// Explicit wavelength dithers in picometers, if configured.
    pub explicit_wavelength_dithers: Option<Vec<i64>>,
    pub ccd_mode: GmosCcdMode,
    pub roi: GmosRoi,
}

impl GmosNorthLongSlit {
    /// Default spatial dither pattern: alternate between the base position
    /// and 15″ along the slit.
    pub const DEFAULT_OFFSETS_ARCSEC: [f64; 2] = [0.0, 15.0];

    /// Default wavelength dither pattern in picometers.
    pub const DEFAULT_DITHERS_PM: [i64; 3] = [0, 5_000, -5_000];

    pub fn spatial_offsets(&self) -> Vec<Angle> {
        match &self.explicit_offsets {
            Some(offsets) if !offsets.is_empty() => offsets.clone(),
            _ => Self::DEFAULT_OFFSETS_ARCSEC
                .iter()
                .map(|a| Angle::from_arcseconds(*a))
                .collect(),
        }
    }

    pub fn wavelength_dithers(&self) -> Vec<i64> {
        match &self.explicit_wavelength_dithers {
            Some(dithers) if !dithers.is_empty() => dithers.clone(),
            _ => Self::DEFAULT_DITHERS_PM.to_vec(),
        }
    }
}

/// Declarative observing mode of an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservingMode {
    GmosNorthLongSlit(GmosNorthLongSlit),
}

impl ObservingMode {
    pub fn instrument(&self) -> Instrument {
        match self {
            ObservingMode::GmosNorthLongSlit(_) => Instrument::GmosNorth,
        }
    }

    /// Canonical byte encoding of the mode, digested into the execution
    /// digest cache key. Field order and width are part of the wire format
    /// and must not change.
    pub fn fingerprint_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(64);
        match self {
            ObservingMode::GmosNorthLongSlit(m) => {
                bytes.push(0u8); // mode tag
                bytes.push(m.grating as u8);
                match m.filter {
                    None => bytes.push(0xff),
                    Some(f) => bytes.push(f as u8),
                }
                bytes.push(m.fpu as u8);
                bytes.extend_from_slice(&m.central_wavelength.picometers().to_le_bytes());
                let offsets = m.spatial_offsets();
                bytes.extend_from_slice(&(offsets.len() as u32).to_le_bytes());
                for o in &offsets {
                    bytes.extend_from_slice(&o.microarcseconds().to_le_bytes());
                }
                let dithers = m.wavelength_dithers();
                bytes.extend_from_slice(&(dithers.len() as u32).to_le_bytes());
                for d in &dithers {
                    bytes.extend_from_slice(&d.to_le_bytes());
                }
                bytes.push(m.ccd_mode.x_bin as u8);
                bytes.push(m.ccd_mode.y_bin as u8);
                bytes.push(m.ccd_mode.amp_count as u8);
                bytes.push(m.ccd_mode.amp_read_mode as u8);
                bytes.push(m.roi as u8);
            }
        }
        bytes
    }
}

/// GMOS nod-and-shuffle stage behavior.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GmosStageMode {
    #[default]
    FollowXy,
    NoFollow,
}

/// Static (per-visit) instrument configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GmosStatic {
    pub mos_pre_imaging: bool,
    pub stage_mode: GmosStageMode,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "instrument", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaticConfig {
    GmosNorth(GmosStatic),
    GmosSouth(GmosStatic),
}

impl StaticConfig {
    pub fn instrument(&self) -> Instrument {
        match self {
            StaticConfig::GmosNorth(_) => Instrument::GmosNorth,
            StaticConfig::GmosSouth(_) => Instrument::GmosSouth,
        }
    }
}

/// Grating setup for one step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmosGratingConfig {
    pub grating: GmosNorthGrating,
    pub wavelength: Wavelength,
}

/// Per-step instrument configuration produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmosNorthDynamic {
    pub exposure: TimeSpan,
    pub ccd_mode: GmosCcdMode,
    pub roi: GmosRoi,
    pub grating: Option<GmosGratingConfig>,
    pub filter: Option<GmosNorthFilter>,
    pub fpu: Option<GmosNorthFpu>,
}

/// Per-step instrument configuration, tagged by instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "instrument", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DynamicConfig {
    GmosNorth(GmosNorthDynamic),
}

impl DynamicConfig {
    pub fn instrument(&self) -> Instrument {
        match self {
            DynamicConfig::GmosNorth(_) => Instrument::GmosNorth,
        }
    }

    pub fn exposure(&self) -> TimeSpan {
        match self {
            DynamicConfig::GmosNorth(d) => d.exposure,
        }
    }

    pub fn with_exposure(&self, exposure: TimeSpan) -> DynamicConfig {
        match self {
            DynamicConfig::GmosNorth(d) => DynamicConfig::GmosNorth(GmosNorthDynamic {
                exposure,
                ..d.clone()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode() -> GmosNorthLongSlit {
        GmosNorthLongSlit {
            grating: GmosNorthGrating::R831G5302,
            filter: None,
            fpu: GmosNorthFpu::LongSlit050,
            central_wavelength: Wavelength::from_nanometers(500.0).unwrap(),
            explicit_offsets: None,
            explicit_wavelength_dithers: None,
            ccd_mode: GmosCcdMode::default(),
            roi: GmosRoi::FullFrame,
        }
    }

    #[test]
    fn test_default_offsets() {
        let offsets = mode().spatial_offsets();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[1], Angle::from_arcseconds(15.0));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let m = ObservingMode::GmosNorthLongSlit(mode());
        assert_eq!(m.fingerprint_bytes(), m.fingerprint_bytes());
    }

    #[test]
    fn test_fingerprint_distinguishes_modes() {
        let a = ObservingMode::GmosNorthLongSlit(mode());
        let mut other = mode();
        other.grating = GmosNorthGrating::B1200G5301;
        let b = ObservingMode::GmosNorthLongSlit(other);
        assert_ne!(a.fingerprint_bytes(), b.fingerprint_bytes());
    }

    #[test]
    fn test_explicit_offsets_override_default() {
        let mut m = mode();
        m.explicit_offsets = Some(vec![Angle::ZERO]);
        assert_eq!(m.spatial_offsets(), vec![Angle::ZERO]);
    }
}
