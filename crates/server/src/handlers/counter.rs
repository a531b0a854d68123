//! Counter endpoints.

use crate::counter::DEFAULT_INCREMENT;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tally_metadata::models::CounterRow;
use time::OffsetDateTime;

/// Counter response body.
#[derive(Debug, Serialize)]
pub struct CounterResponse {
    pub id: i64,
    pub name: String,
    pub count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<CounterRow> for CounterResponse {
    fn from(row: CounterRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            count: row.count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Increment request body. Every part is optional.
#[derive(Debug, Default, Deserialize)]
pub struct IncrementRequest {
    #[serde(default)]
    pub increment: Option<i64>,
}

impl IncrementRequest {
    /// Parse a request body. An empty or `null` body means "use the defaults".
    pub fn from_body(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice::<Option<Self>>(body)
            .map(Option::unwrap_or_default)
            .map_err(|e| ApiError::BadRequest(format!("invalid increment body: {e}")))
    }

    /// Amount to add, defaulting to 1.
    pub fn amount(&self) -> i64 {
        self.increment.unwrap_or(DEFAULT_INCREMENT)
    }
}

/// GET /api/counter
pub async fn get_counter(State(state): State<AppState>) -> ApiResult<Json<CounterResponse>> {
    let row = state.counter.get().await?;
    Ok(Json(row.into()))
}

/// POST /api/counter
///
/// Body: optional `{"increment": <int>}`, default 1.
pub async fn increment_counter(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<CounterResponse>> {
    let request = IncrementRequest::from_body(&body)?;
    let row = state.counter.increment(request.amount()).await?;
    Ok(Json(row.into()))
}

/// POST /api/counter/reset
pub async fn reset_counter(State(state): State<AppState>) -> ApiResult<Json<CounterResponse>> {
    let row = state.counter.reset().await?;
    Ok(Json(row.into()))
}
