//! Angular and spectral quantities.
//!
//! Angles are stored as signed microarcseconds, wavelengths as positive
//! picometers. The `qtty` typed quantities are used at the boundaries where
//! trigonometry or unit conversion happens (twilight computation, display).

use qtty::{Arcseconds, Nanometers};
use serde::{Deserialize, Serialize};

/// Signed angle in microarcseconds.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Angle(i64);

impl Angle {
    pub const ZERO: Angle = Angle(0);

    pub const fn from_microarcseconds(uas: i64) -> Angle {
        Angle(uas)
    }

    pub const fn from_milliarcseconds(mas: i64) -> Angle {
        Angle(mas * 1_000)
    }

    pub fn from_arcseconds(arcsec: f64) -> Angle {
        Angle((arcsec * 1e6).round() as i64)
    }

    pub const fn microarcseconds(&self) -> i64 {
        self.0
    }

    pub fn milliarcseconds(&self) -> f64 {
        self.0 as f64 / 1e3
    }

    pub fn arcseconds(&self) -> Arcseconds {
        Arcseconds::new(self.0 as f64 / 1e6)
    }

    pub fn abs(&self) -> Angle {
        Angle(self.0.abs())
    }
}

/// Telescope offset (p, q) relative to the base position.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Offset {
    pub p: Angle,
    pub q: Angle,
}

impl Offset {
    pub const ZERO: Offset = Offset {
        p: Angle::ZERO,
        q: Angle::ZERO,
    };

    pub const fn new(p: Angle, q: Angle) -> Offset {
        Offset { p, q }
    }

    /// Pure q-axis offset, the common case for long-slit spatial dithers.
    pub const fn in_q(q: Angle) -> Offset {
        Offset {
            p: Angle::ZERO,
            q,
        }
    }

    /// Euclidean distance to another offset.
    pub fn distance(&self, other: &Offset) -> Angle {
        let dp = (self.p.0 - other.p.0) as f64;
        let dq = (self.q.0 - other.q.0) as f64;
        Angle((dp * dp + dq * dq).sqrt().round() as i64)
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "p {:.1}″, q {:.1}″",
            self.p.arcseconds().value(),
            self.q.arcseconds().value()
        )
    }
}

/// Positive wavelength in picometers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wavelength(u32);

impl Wavelength {
    pub fn from_picometers(pm: u32) -> Option<Wavelength> {
        (pm > 0).then_some(Wavelength(pm))
    }

    pub fn from_nanometers(nm: f64) -> Option<Wavelength> {
        if !nm.is_finite() || nm <= 0.0 {
            return None;
        }
        Wavelength::from_picometers((nm * 1e3).round() as u32)
    }

    pub const fn picometers(&self) -> u32 {
        self.0
    }

    pub fn nanometers(&self) -> Nanometers {
        Nanometers::new(self.0 as f64 / 1e3)
    }

    /// Shift by a signed picometer dither, clamped at 1 pm.
    pub fn offset_by(&self, dither_pm: i64) -> Wavelength {
        let shifted = (self.0 as i64).saturating_add(dither_pm);
        Wavelength(shifted.clamp(1, u32::MAX as i64) as u32)
    }
}

impl std::fmt::Display for Wavelength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} nm", self.nanometers().value())
    }
}

/// ICRS coordinates: RA wrapped to [0°, 360°), Dec clamped to ±90°.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    ra_uas: u64,
    dec_uas: i64,
}

const FULL_TURN_UAS: u64 = 360 * 3_600_000_000;
const QUARTER_TURN_UAS: i64 = 90 * 3_600_000_000;

impl Coordinates {
    pub fn from_degrees(ra_deg: f64, dec_deg: f64) -> Option<Coordinates> {
        if !ra_deg.is_finite() || !dec_deg.is_finite() || !(-90.0..=90.0).contains(&dec_deg) {
            return None;
        }
        let ra_uas = ((ra_deg.rem_euclid(360.0)) * 3.6e9).round() as u64 % FULL_TURN_UAS;
        let dec_uas = ((dec_deg * 3.6e9).round() as i64).clamp(-QUARTER_TURN_UAS, QUARTER_TURN_UAS);
        Some(Coordinates { ra_uas, dec_uas })
    }

    pub fn ra_degrees(&self) -> f64 {
        self.ra_uas as f64 / 3.6e9
    }

    pub fn dec_degrees(&self) -> f64 {
        self.dec_uas as f64 / 3.6e9
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RA {:.6}°, Dec {:+.6}°", self.ra_degrees(), self.dec_degrees())
    }
}

/// Geographic location (latitude, longitude, elevation).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeographicLocation {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
    /// Elevation in meters above sea level
    pub elevation_m: f64,
}

/// Observatory site.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Site {
    /// Gemini North, Maunakea.
    Gn,
    /// Gemini South, Cerro Pachón.
    Gs,
}

impl Site {
    pub fn location(&self) -> GeographicLocation {
        match self {
            Site::Gn => GeographicLocation {
                latitude: 19.8238,
                longitude: -155.4690,
                elevation_m: 4213.0,
            },
            Site::Gs => GeographicLocation {
                latitude: -30.2408,
                longitude: -70.7367,
                elevation_m: 2722.0,
            },
        }
    }

    /// Site letter used in dataset filenames.
    pub fn letter(&self) -> char {
        match self {
            Site::Gn => 'N',
            Site::Gs => 'S',
        }
    }

    pub fn from_letter(c: char) -> Option<Site> {
        match c {
            'N' => Some(Site::Gn),
            'S' => Some(Site::Gs),
            _ => None,
        }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Site::Gn => f.write_str("Gemini North"),
            Site::Gs => f.write_str("Gemini South"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_distance() {
        let a = Offset::in_q(Angle::from_arcseconds(15.0));
        let b = Offset::ZERO;
        assert_eq!(a.distance(&b).milliarcseconds(), 15_000.0);
    }

    #[test]
    fn test_offset_display() {
        let o = Offset::in_q(Angle::from_arcseconds(-15.0));
        assert_eq!(o.to_string(), "p 0.0″, q -15.0″");
    }

    #[test]
    fn test_wavelength_positive() {
        assert!(Wavelength::from_picometers(0).is_none());
        assert!(Wavelength::from_nanometers(-5.0).is_none());
        let w = Wavelength::from_nanometers(500.0).unwrap();
        assert_eq!(w.picometers(), 500_000);
        assert_eq!(w.to_string(), "500.0 nm");
    }

    #[test]
    fn test_wavelength_dither_clamps() {
        let w = Wavelength::from_picometers(10).unwrap();
        assert_eq!(w.offset_by(-100).picometers(), 1);
        assert_eq!(w.offset_by(5_000).picometers(), 5_010);
    }

    #[test]
    fn test_coordinates_wrap_and_clamp() {
        let c = Coordinates::from_degrees(370.0, 45.0).unwrap();
        assert!((c.ra_degrees() - 10.0).abs() < 1e-9);
        assert!(Coordinates::from_degrees(10.0, 91.0).is_none());
    }

    #[test]
    fn test_site_letters() {
        assert_eq!(Site::Gn.letter(), 'N');
        assert_eq!(Site::from_letter('S'), Some(Site::Gs));
        assert_eq!(Site::from_letter('X'), None);
    }
}
