//! Time accounting: interval algebra, discounts, corrections, and the
//! per-visit invoice.

pub mod charge;
pub mod discount;
pub mod engine;
pub mod state;

pub use charge::{CategorizedTime, CorrectionOp, TimeChargeCorrection, TimeChargeInvoice};
pub use discount::{Discount, DiscountCategory};
pub use engine::{fold_events, invoice_for_visit, validate_event_order, AccountingConfig};
pub use state::{Context, StepContext, TimeAccountingState};
