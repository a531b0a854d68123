//! Health probe.

use crate::metrics::HEALTH_CHECK_FAILURES;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Database status reported when the round-trip succeeds.
pub const DATABASE_CONNECTED: &str = "connected";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    /// `"connected"` or `"error: <message>"`.
    pub database: String,
}

/// GET /health - Health check.
///
/// Always answers 200. A database failure is reported in the body so load
/// balancers keep routing to the process while operators see the cause.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.metadata.health_check().await {
        Ok(()) => DATABASE_CONNECTED.to_string(),
        Err(e) => {
            HEALTH_CHECK_FAILURES.inc();
            tracing::warn!(error = %e, "Health check could not reach the database");
            format!("error: {e}")
        }
    };

    Json(HealthResponse {
        status: "healthy",
        version: state.config.app.version.clone(),
        database,
    })
}
