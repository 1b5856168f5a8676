//! Charge bookkeeping: categorized time, corrections, and the invoice.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OdbError, OdbResult};
use crate::models::{ChargeClass, TimeSpan};

use super::discount::Discount;

/// Non-negative time per charge class, summed element-wise and saturating
/// at [`TimeSpan::MAX`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorizedTime(BTreeMap<ChargeClass, TimeSpan>);

impl CategorizedTime {
    pub const fn new() -> CategorizedTime {
        CategorizedTime(BTreeMap::new())
    }

    pub fn of(charge_class: ChargeClass, amount: TimeSpan) -> CategorizedTime {
        let mut ct = CategorizedTime::new();
        ct.add(charge_class, amount);
        ct
    }

    pub fn get(&self, charge_class: ChargeClass) -> TimeSpan {
        self.0.get(&charge_class).copied().unwrap_or(TimeSpan::ZERO)
    }

    pub fn add(&mut self, charge_class: ChargeClass, amount: TimeSpan) {
        let entry = self.0.entry(charge_class).or_insert(TimeSpan::ZERO);
        *entry = entry.saturating_add(amount);
    }

    /// Remove up to `amount` from a class, saturating at zero.
    pub fn subtract(&mut self, charge_class: ChargeClass, amount: TimeSpan) {
        let entry = self.0.entry(charge_class).or_insert(TimeSpan::ZERO);
        *entry = entry.saturating_sub(amount);
    }

    pub fn sum_with(&self, other: &CategorizedTime) -> CategorizedTime {
        let mut out = self.clone();
        for (class, amount) in &other.0 {
            out.add(*class, *amount);
        }
        out
    }

    pub fn total(&self) -> TimeSpan {
        self.0.values().copied().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChargeClass, TimeSpan)> + '_ {
        self.0.iter().map(|(c, t)| (*c, *t))
    }

    pub fn is_zero(&self) -> bool {
        self.0.values().all(TimeSpan::is_zero)
    }
}

impl FromIterator<(ChargeClass, TimeSpan)> for CategorizedTime {
    fn from_iter<I: IntoIterator<Item = (ChargeClass, TimeSpan)>>(iter: I) -> CategorizedTime {
        let mut ct = CategorizedTime::new();
        for (class, amount) in iter {
            ct.add(class, amount);
        }
        ct
    }
}

/// Direction of a manual time-charge correction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrectionOp {
    Add,
    Subtract,
}

/// A manual adjustment applied after discounts, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeChargeCorrection {
    pub charge_class: ChargeClass,
    pub op: CorrectionOp,
    pub amount: TimeSpan,
    pub user: String,
    pub comment: Option<String>,
}

impl TimeChargeCorrection {
    /// Individual corrections are capped at one year.
    pub const MAX_AMOUNT: TimeSpan = TimeSpan::from_days(365);

    pub fn validated(self) -> OdbResult<TimeChargeCorrection> {
        if self.amount > Self::MAX_AMOUNT {
            return Err(OdbError::invalid_argument(format!(
                "Time charge correction amount must not exceed 365 days, but was {}.",
                self.amount
            )));
        }
        Ok(self)
    }
}

/// Auditable per-visit charge summary.
///
/// `final_charge[c] = saturate(execution_time[c] − Σ discounts[c]
///  + Σ adds[c] − Σ subtracts[c])`, clamped to zero below and
/// [`TimeSpan::MAX`] above.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeChargeInvoice {
    pub execution_time: CategorizedTime,
    pub discounts: Vec<Discount>,
    pub corrections: Vec<TimeChargeCorrection>,
    pub final_charge: CategorizedTime,
}

impl TimeChargeInvoice {
    pub fn compute(
        execution_time: CategorizedTime,
        discounts: Vec<Discount>,
        corrections: Vec<TimeChargeCorrection>,
    ) -> TimeChargeInvoice {
        let mut final_charge = execution_time.clone();
        for discount in &discounts {
            for (class, amount) in discount.amounts.iter() {
                final_charge.subtract(class, amount);
            }
        }
        for correction in &corrections {
            match correction.op {
                CorrectionOp::Add => final_charge.add(correction.charge_class, correction.amount),
                CorrectionOp::Subtract => {
                    final_charge.subtract(correction.charge_class, correction.amount)
                }
            }
        }
        TimeChargeInvoice {
            execution_time,
            discounts,
            corrections,
            final_charge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorized_time_sums_elementwise() {
        let a = CategorizedTime::of(ChargeClass::Program, TimeSpan::from_seconds(10));
        let b = CategorizedTime::of(ChargeClass::Partner, TimeSpan::from_seconds(5));
        let sum = a.sum_with(&b);
        assert_eq!(sum.get(ChargeClass::Program), TimeSpan::from_seconds(10));
        assert_eq!(sum.get(ChargeClass::Partner), TimeSpan::from_seconds(5));
        assert_eq!(sum.total(), TimeSpan::from_seconds(15));
    }

    #[test]
    fn test_subtract_saturates_at_zero() {
        let mut ct = CategorizedTime::of(ChargeClass::Program, TimeSpan::from_seconds(10));
        ct.subtract(ChargeClass::Program, TimeSpan::from_seconds(11));
        assert_eq!(ct.get(ChargeClass::Program), TimeSpan::ZERO);
    }

    #[test]
    fn test_correction_cap() {
        let ok = TimeChargeCorrection {
            charge_class: ChargeClass::Program,
            op: CorrectionOp::Add,
            amount: TimeChargeCorrection::MAX_AMOUNT,
            user: "staff".into(),
            comment: None,
        };
        assert!(ok.validated().is_ok());

        let over = TimeChargeCorrection {
            charge_class: ChargeClass::Program,
            op: CorrectionOp::Add,
            amount: TimeChargeCorrection::MAX_AMOUNT + TimeSpan::from_seconds(1),
            user: "staff".into(),
            comment: None,
        };
        assert!(over.validated().is_err());
    }

    #[test]
    fn test_invoice_applies_corrections_in_order() {
        let exec = CategorizedTime::of(ChargeClass::Program, TimeSpan::from_seconds(10));
        let corrections = vec![
            TimeChargeCorrection {
                charge_class: ChargeClass::Program,
                op: CorrectionOp::Subtract,
                amount: TimeSpan::from_seconds(11),
                user: "staff".into(),
                comment: None,
            },
            TimeChargeCorrection {
                charge_class: ChargeClass::Program,
                op: CorrectionOp::Add,
                amount: TimeSpan::from_seconds(3),
                user: "staff".into(),
                comment: None,
            },
        ];
        let invoice = TimeChargeInvoice::compute(exec, Vec::new(), corrections);
        // 10 − 11 saturates to 0, then + 3
        assert_eq!(
            invoice.final_charge.get(ChargeClass::Program),
            TimeSpan::from_seconds(3)
        );
    }
}
