use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::AppError;
use crate::response::{ApiResult, ok};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub db: DbHealth,
}

#[derive(Debug, Serialize)]
pub struct DbHealth {
    pub connected: bool,
    pub lead_count: i64,
}

fn count_leads(state: &AppState) -> crate::error::Result<i64> {
    let conn = state.db.get()?;
    queries::count_leads(&conn)
}

pub async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let lead_count =
        count_leads(&state).map_err(|e| AppError::Unavailable(format!("Unhealthy: {}", e)))?;

    Ok(ok(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        db: DbHealth {
            connected: true,
            lead_count,
        },
    }))
}
