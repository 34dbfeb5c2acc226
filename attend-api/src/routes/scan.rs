//! Scan submission endpoint

use axum::{extract::State, Json};
use tracing::info;

use attend_core::logging::operations;
use attend_core::{ActivityId, ScanOutcome};
use attend_store::AttendanceStore;

use crate::dto::{ScanRequest, ScanResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Resolve one scanned payload
///
/// Every outcome, including rejections and duplicate scans, is a 200 with
/// the outcome named in the body. Only storage faults produce an error;
/// such a read is not remembered by the debouncer, so the station can retry.
pub async fn submit_scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> ApiResult<Json<ScanResponse>> {
    if let Some(station_id) = req.station_id.as_deref() {
        if !state.debouncer.should_process(station_id, &req.payload) {
            return Ok(Json(ScanResponse::debounced()));
        }
    }

    let activity_id = ActivityId::new(req.activity_id);
    let outcome = match state.resolver.submit_scan(&req.payload, &activity_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(station_id) = req.station_id.as_deref() {
                state.debouncer.forget(station_id, &req.payload);
            }
            return Err(e.into());
        }
    };
    let name = participant_name(&state, &outcome).await?;

    info!(
        operation = operations::SCAN,
        activity_id = %activity_id,
        station_id = req.station_id.as_deref().unwrap_or("-"),
        outcome = outcome.kind(),
        "Scan resolved"
    );

    Ok(Json(ScanResponse::from_outcome(&outcome, &name)))
}

async fn participant_name(state: &AppState, outcome: &ScanOutcome) -> ApiResult<String> {
    let Some(record) = outcome.record() else {
        return Ok(String::new());
    };

    Ok(state
        .store
        .get_participant(&record.participant_id)
        .await?
        .map(|p| p.display_name())
        .unwrap_or_else(|| record.participant_id.to_string()))
}
