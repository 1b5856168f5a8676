//! Twilight window computation.
//!
//! Computes the night window (evening twilight to morning twilight) for an
//! observatory site around a given instant, used by the daylight discount.
//! The solar position model is the NOAA low-accuracy formulation, good to
//! well under a minute of twilight-crossing time, which is ample for time
//! accounting.

use chrono::{Datelike, Timelike};
use qtty::Degrees;

use crate::models::{GeographicLocation, Site, Timestamp, TimestampInterval};

/// Which solar altitude bounds the night. Configured externally; nautical
/// is the facility default.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TwilightBound {
    Nautical,
    Astronomical,
}

impl TwilightBound {
    pub fn horizon_angle(&self) -> Degrees {
        match self {
            TwilightBound::Nautical => Degrees::new(-12.0),
            TwilightBound::Astronomical => Degrees::new(-18.0),
        }
    }
}

impl std::str::FromStr for TwilightBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nautical" => Ok(TwilightBound::Nautical),
            "astronomical" => Ok(TwilightBound::Astronomical),
            other => Err(format!("'{}' is not a twilight bound", other)),
        }
    }
}

/// Apparent solar altitude at an instant and location (NOAA approximation).
pub fn sun_altitude(t: Timestamp, location: &GeographicLocation) -> Degrees {
    let dt = t.datetime();
    let day_of_year = dt.ordinal() as f64;
    let hour = dt.hour() as f64
        + dt.minute() as f64 / 60.0
        + dt.second() as f64 / 3600.0
        + dt.nanosecond() as f64 / 3.6e12;

    // fractional year in radians
    let gamma = 2.0 * std::f64::consts::PI / 365.0 * (day_of_year - 1.0 + (hour - 12.0) / 24.0);

    // equation of time (minutes) and solar declination (radians)
    let eqtime = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());
    let decl = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    // true solar time in minutes, hour angle in degrees
    let time_offset = eqtime + 4.0 * location.longitude;
    let tst = hour * 60.0 + time_offset;
    let ha = Degrees::new(tst / 4.0 - 180.0);

    let lat = Degrees::new(location.latitude);
    let decl = Degrees::new(decl.to_degrees());
    let cos_zenith = lat.sin() * decl.sin() + lat.cos() * decl.cos() * ha.cos();
    Degrees::new(90.0 - cos_zenith.clamp(-1.0, 1.0).acos().to_degrees())
}

fn is_dark(t: Timestamp, location: &GeographicLocation, bound: TwilightBound) -> bool {
    sun_altitude(t, location).value() < bound.horizon_angle().value()
}

fn shift(t: Timestamp, seconds: i64) -> Option<Timestamp> {
    Timestamp::from_microseconds(t.microseconds().checked_add(seconds * 1_000_000)?)
}

/// Refine a dark/light transition between two bracketing samples down to
/// one microsecond.
fn refine_crossing(
    mut lo: Timestamp,
    mut hi: Timestamp,
    location: &GeographicLocation,
    bound: TwilightBound,
) -> Timestamp {
    let dark_at_lo = is_dark(lo, location, bound);
    while hi.microseconds() - lo.microseconds() > 1 {
        let mid =
            Timestamp::from_microseconds((lo.microseconds() + hi.microseconds()) / 2).unwrap_or(lo);
        if is_dark(mid, location, bound) == dark_at_lo {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    hi
}

const SCAN_STEP_SECONDS: i64 = 600;
const SCAN_HALF_RANGE_SECONDS: i64 = 36 * 3600;

/// The night window (twilight to twilight) nearest `around` for a site.
///
/// Returns `None` when the scan range contains no dark period (polar day at
/// extreme latitudes; not reachable for the supported sites).
pub fn night_window(
    site: Site,
    around: Timestamp,
    bound: TwilightBound,
) -> Option<TimestampInterval> {
    let location = site.location();

    // sample a three-night range, collecting dark segments
    let mut segments: Vec<(Timestamp, Timestamp)> = Vec::new();
    let mut open: Option<Timestamp> = None;
    let mut prev = shift(around, -SCAN_HALF_RANGE_SECONDS)?;
    let mut prev_dark = is_dark(prev, &location, bound);
    if prev_dark {
        open = Some(prev);
    }

    let mut offset = SCAN_STEP_SECONDS;
    while offset <= 2 * SCAN_HALF_RANGE_SECONDS {
        let t = shift(around, -SCAN_HALF_RANGE_SECONDS + offset)?;
        let dark = is_dark(t, &location, bound);
        if dark != prev_dark {
            let crossing = refine_crossing(prev, t, &location, bound);
            if dark {
                open = Some(crossing);
            } else if let Some(start) = open.take() {
                segments.push((start, crossing));
            }
        }
        prev = t;
        prev_dark = dark;
        offset += SCAN_STEP_SECONDS;
    }
    if let Some(start) = open {
        segments.push((start, prev));
    }

    // pick the segment containing `around`, else the nearest one
    segments
        .iter()
        .min_by_key(|(start, end)| {
            if *start <= around && around < *end {
                0i64
            } else if around < *start {
                start.microseconds() - around.microseconds()
            } else {
                around.microseconds() - end.microseconds()
            }
        })
        .map(|(start, end)| TimestampInterval::between(*start, *end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon_utc() -> Timestamp {
        // 2026-03-20 22:00 UTC is mid-evening in Hawaii
        Timestamp::parse("2026-03-20T22:00:00Z").unwrap()
    }

    #[test]
    fn test_sun_is_up_at_local_noon() {
        let location = Site::Gn.location();
        let alt = sun_altitude(noon_utc(), &location);
        assert!(alt.value() > 0.0, "expected daylight, got {:?}", alt);
    }

    #[test]
    fn test_night_window_is_dark_inside_and_light_outside() {
        let location = Site::Gn.location();
        let window = night_window(Site::Gn, noon_utc(), TwilightBound::Nautical).unwrap();
        assert!(window.duration().seconds() > 4.0 * 3600.0);
        assert!(window.duration().seconds() < 14.0 * 3600.0);

        let mid = Timestamp::from_microseconds(
            (window.start.microseconds() + window.end.microseconds()) / 2,
        )
        .unwrap();
        assert!(is_dark(mid, &location, TwilightBound::Nautical));

        let before = shift(window.start, -60).unwrap();
        assert!(!is_dark(before, &location, TwilightBound::Nautical));
        let after = shift(window.end, 60).unwrap();
        assert!(!is_dark(after, &location, TwilightBound::Nautical));
    }

    #[test]
    fn test_astronomical_night_is_shorter() {
        let nautical = night_window(Site::Gn, noon_utc(), TwilightBound::Nautical).unwrap();
        let astronomical =
            night_window(Site::Gn, noon_utc(), TwilightBound::Astronomical).unwrap();
        assert!(astronomical.duration() < nautical.duration());
        assert!(nautical.contains_interval(&astronomical));
    }

    #[test]
    fn test_window_is_deterministic() {
        let a = night_window(Site::Gs, noon_utc(), TwilightBound::Nautical).unwrap();
        let b = night_window(Site::Gs, noon_utc(), TwilightBound::Nautical).unwrap();
        assert_eq!(a, b);
    }
}
