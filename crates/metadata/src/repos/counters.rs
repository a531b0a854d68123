//! Counter repository trait.

use crate::error::MetadataResult;
use crate::models::CounterRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for named counters.
///
/// Every mutating call runs in a single transaction and creates the row with
/// a count of zero when it does not exist yet, so the row always exists after
/// any call returns successfully.
#[async_trait]
pub trait CounterRepo: Send + Sync {
    /// Get a counter by name without creating it.
    async fn find_counter(&self, name: &str) -> MetadataResult<Option<CounterRow>>;

    /// Get a counter, creating it with a count of zero if absent.
    async fn get_or_create_counter(
        &self,
        name: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<CounterRow>;

    /// Add `amount` (which may be zero or negative) to a counter.
    async fn increment_counter(
        &self,
        name: &str,
        amount: i64,
        now: OffsetDateTime,
    ) -> MetadataResult<CounterRow>;

    /// Set a counter back to zero.
    ///
    /// A counter created by this call is returned as inserted, with
    /// `updated_at` unset.
    async fn reset_counter(&self, name: &str, now: OffsetDateTime) -> MetadataResult<CounterRow>;
}
