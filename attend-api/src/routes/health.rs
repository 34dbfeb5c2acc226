//! Health check endpoint

use axum::{extract::State, Json};

use attend_store::AttendanceStore;

use crate::dto::HealthResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Health check endpoint (also exercises the store)
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let stats = state.store.get_stats().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        participants: stats.participants,
        activities: stats.activities,
        records: stats.records,
    }))
}
