//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;

// =============================================================================
// Counters
// =============================================================================

/// Named counter record.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CounterRow {
    pub id: i64,
    pub name: String,
    pub count: i64,
    pub created_at: OffsetDateTime,
    /// Unset until the first increment or reset of an existing row.
    pub updated_at: Option<OffsetDateTime>,
}

// =============================================================================
// Page visits
// =============================================================================

/// Append-only visit log entry.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PageVisitRow {
    pub id: i64,
    pub page: String,
    pub visitor_ip: Option<String>,
    pub user_agent: Option<String>,
    pub visited_at: OffsetDateTime,
}
