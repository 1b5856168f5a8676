//! Time-charge correction storage.

use async_trait::async_trait;

use crate::accounting::TimeChargeCorrection;
use crate::models::VisitId;

use super::error::RepositoryResult;

#[async_trait]
pub trait AccountingRepository: Send + Sync {
    /// Append a correction for a visit. Corrections apply in insertion
    /// order.
    async fn insert_correction(
        &self,
        visit_id: VisitId,
        correction: TimeChargeCorrection,
    ) -> RepositoryResult<()>;

    async fn list_corrections(
        &self,
        visit_id: VisitId,
    ) -> RepositoryResult<Vec<TimeChargeCorrection>>;
}
