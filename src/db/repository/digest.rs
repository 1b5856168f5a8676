//! Execution digest and ITC result caches.

use async_trait::async_trait;

use crate::db::models::DigestCacheRecord;
use crate::itc::ItcResult;
use crate::models::ObservationId;
use crate::sequence::ExecutionDigest;

use super::error::RepositoryResult;

#[async_trait]
pub trait DigestRepository: Send + Sync {
    /// Cached digest for an observation and input hash, if present.
    async fn get_cached_digest(
        &self,
        observation_id: ObservationId,
        hash: &str,
    ) -> RepositoryResult<Option<ExecutionDigest>>;

    /// Store a computed digest. Racing writes of the same key are
    /// byte-identical, so last-write-wins is safe.
    async fn put_cached_digest(&self, record: DigestCacheRecord) -> RepositoryResult<()>;

    /// Cached ITC answer for an observation, if present.
    async fn get_cached_itc(
        &self,
        observation_id: ObservationId,
    ) -> RepositoryResult<Option<ItcResult>>;

    async fn put_cached_itc(
        &self,
        observation_id: ObservationId,
        result: ItcResult,
    ) -> RepositoryResult<()>;
}
