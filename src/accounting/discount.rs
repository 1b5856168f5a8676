//! Discount entries produced by the time accounting engine.

use serde::{Deserialize, Serialize};

use crate::models::{Site, TimestampInterval};

use super::charge::CategorizedTime;

/// Why an interval was discounted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountCategory {
    /// Time outside the site's twilight window for the night.
    Daylight { site: Site },
    /// A visit that produced no datasets at all.
    NoData,
    /// Time spanning an atom whose dataset failed quality assessment.
    Qa,
}

/// One discounted interval with its per-class amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub interval: TimestampInterval,
    pub amounts: CategorizedTime,
    pub category: DiscountCategory,
    pub comment: String,
}
