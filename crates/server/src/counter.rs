//! Counter service: the one named counter behind `/api/counter`.

use crate::metrics::{record_counter_error, record_counter_operation};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tally_metadata::models::CounterRow;
use tally_metadata::repos::CounterRepo;
use tally_metadata::{MetadataResult, MetadataStore};
use time::OffsetDateTime;

/// Increment applied when a request does not name one.
pub const DEFAULT_INCREMENT: i64 = 1;

/// Get-or-create, increment and reset for a single named counter.
///
/// Rows are never cached: every call reads and writes storage inside its own
/// transaction, and the row exists once any call has returned successfully.
#[derive(Clone)]
pub struct CounterService {
    metadata: Arc<dyn MetadataStore>,
    name: Arc<str>,
}

impl CounterService {
    pub fn new(metadata: Arc<dyn MetadataStore>, name: impl Into<Arc<str>>) -> Self {
        Self {
            metadata,
            name: name.into(),
        }
    }

    /// Name of the counter row this service operates on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current counter, created with a count of zero on first access.
    pub async fn get(&self) -> MetadataResult<CounterRow> {
        let now = OffsetDateTime::now_utc();
        self.observe("get", self.metadata.get_or_create_counter(&self.name, now))
            .await
    }

    /// Add `amount` to the counter. Zero and negative amounts are allowed.
    pub async fn increment(&self, amount: i64) -> MetadataResult<CounterRow> {
        let now = OffsetDateTime::now_utc();
        self.observe(
            "increment",
            self.metadata.increment_counter(&self.name, amount, now),
        )
        .await
    }

    /// Set the counter back to zero.
    pub async fn reset(&self) -> MetadataResult<CounterRow> {
        let now = OffsetDateTime::now_utc();
        self.observe("reset", self.metadata.reset_counter(&self.name, now))
            .await
    }

    async fn observe(
        &self,
        operation: &'static str,
        fut: impl Future<Output = MetadataResult<CounterRow>>,
    ) -> MetadataResult<CounterRow> {
        let started = Instant::now();
        match fut.await {
            Ok(row) => {
                record_counter_operation(operation, started.elapsed().as_secs_f64());
                tracing::debug!(
                    counter = %self.name,
                    operation,
                    count = row.count,
                    "Counter operation committed"
                );
                Ok(row)
            }
            Err(e) => {
                record_counter_error(operation);
                tracing::error!(
                    counter = %self.name,
                    operation,
                    error = %e,
                    "Counter operation failed"
                );
                Err(e)
            }
        }
    }
}
