//! Dataset filenames.
//!
//! One FITS file per step, named `[NS]YYYYMMDDS####.fits`: site letter,
//! local observing date, and a 1-based index within that site and date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::quantities::Site;

/// Parsed dataset filename.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetFilename {
    pub site: Site,
    pub date: NaiveDate,
    pub index: u16,
}

impl DatasetFilename {
    pub fn new(site: Site, date: NaiveDate, index: u16) -> Option<DatasetFilename> {
        (index > 0 && index <= 9999).then_some(DatasetFilename { site, date, index })
    }

    pub fn parse(s: &str) -> Result<DatasetFilename, String> {
        let err = || format!("'{}' is not a valid dataset filename", s);
        let stem = s.strip_suffix(".fits").ok_or_else(err)?;
        if stem.len() != 14 || !stem.is_ascii() {
            return Err(err());
        }
        let mut chars = stem.chars();
        let site = chars.next().and_then(Site::from_letter).ok_or_else(err)?;
        let date_part = &stem[1..9];
        if &stem[9..10] != "S" {
            return Err(err());
        }
        let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").map_err(|_| err())?;
        let index: u16 = stem[10..14].parse().map_err(|_| err())?;
        DatasetFilename::new(site, date, index).ok_or_else(err)
    }
}

impl std::fmt::Display for DatasetFilename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}S{:04}.fits",
            self.site.letter(),
            self.date.format("%Y%m%d"),
            self.index
        )
    }
}

impl std::str::FromStr for DatasetFilename {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetFilename::parse(s)
    }
}

impl Serialize for DatasetFilename {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DatasetFilename {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_filename_roundtrip() {
        let f = DatasetFilename::new(Site::Gn, date(2026, 3, 14), 42).unwrap();
        assert_eq!(f.to_string(), "N20260314S0042.fits");
        assert_eq!(DatasetFilename::parse("N20260314S0042.fits").unwrap(), f);
    }

    #[test]
    fn test_filename_rejects_malformed() {
        assert!(DatasetFilename::parse("X20260314S0042.fits").is_err());
        assert!(DatasetFilename::parse("N20260314S0042.fit").is_err());
        assert!(DatasetFilename::parse("N2026031S0042.fits").is_err());
        assert!(DatasetFilename::parse("N20260314T0042.fits").is_err());
        assert!(DatasetFilename::parse("N20260314S0000.fits").is_err());
    }

    #[test]
    fn test_filename_ordering() {
        let a = DatasetFilename::new(Site::Gn, date(2026, 3, 14), 1).unwrap();
        let b = DatasetFilename::new(Site::Gn, date(2026, 3, 14), 2).unwrap();
        let c = DatasetFilename::new(Site::Gn, date(2026, 3, 15), 1).unwrap();
        assert!(a < b && b < c);
    }
}
