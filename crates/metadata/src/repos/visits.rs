//! Page visit log repository trait.

use crate::error::MetadataResult;
use crate::models::PageVisitRow;
use async_trait::async_trait;
use tally_core::NewPageVisit;
use time::OffsetDateTime;

/// Repository for the append-only visit log.
#[async_trait]
pub trait VisitRepo: Send + Sync {
    /// Append a visit. Input is validated against the column limits first.
    async fn record_visit(
        &self,
        visit: &NewPageVisit,
        visited_at: OffsetDateTime,
    ) -> MetadataResult<PageVisitRow>;

    /// Count visits, optionally restricted to one page.
    async fn count_visits(&self, page: Option<&str>) -> MetadataResult<u64>;

    /// Most recent visits first.
    async fn recent_visits(&self, limit: u32) -> MetadataResult<Vec<PageVisitRow>>;
}
