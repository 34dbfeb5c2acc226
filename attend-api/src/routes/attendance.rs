//! Attendance record endpoints

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use attend_core::logging::operations;
use attend_core::{
    ActivityId, AttendanceStats, AttendanceStatus, DateRange, OwnerId, ParticipantId, Period,
    RecordArchive, RecordId, RecordQuery,
};
use attend_store::AttendanceStore;

use crate::dto::{AttendanceQuery, DeleteResponse, ListResponse, RecordResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the administrative token
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// List records of the owner's activities, newest first
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<AttendanceQuery>,
) -> ApiResult<Json<ListResponse<RecordResponse>>> {
    let Some(record_query) = build_query(&state, &query).await? else {
        return Ok(Json(ListResponse::new(Vec::new())));
    };

    let records = state.store.list_records(&record_query).await?;
    Ok(Json(ListResponse::new(
        records.iter().map(RecordResponse::from).collect(),
    )))
}

/// Summary statistics over the same filters as the listing
pub async fn get_stats(
    State(state): State<AppState>,
    Query(mut query): Query<AttendanceQuery>,
) -> ApiResult<Json<AttendanceStats>> {
    query.limit = None;
    let Some(record_query) = build_query(&state, &query).await? else {
        return Ok(Json(AttendanceStats::from_counts(0, 0, 0)));
    };

    let records = state.store.list_records(&record_query).await?;
    Ok(Json(AttendanceStats::summarize(&records)))
}

/// Get record by ID
pub async fn get_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> ApiResult<Json<RecordResponse>> {
    let record = state
        .store
        .get_record(&RecordId::new(record_id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Record {} not found", record_id)))?;

    Ok(Json(RecordResponse::from(&record)))
}

/// Delete a record (administrative)
pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<DeleteResponse>> {
    authorize_admin(&state, &headers)?;

    let deleted = state
        .store
        .delete_record(&RecordId::new(record_id.clone()))
        .await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Record {} not found", record_id)));
    }

    info!(operation = operations::DELETE, record_id = %record_id, "Record deleted");

    Ok(Json(DeleteResponse {
        deleted,
        id: record_id,
    }))
}

// Helper functions

fn authorize_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::Unauthorized(
            "Administrative deletion is disabled".to_string(),
        ));
    };

    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    if bool::from(expected.as_bytes().ct_eq(provided)) {
        Ok(())
    } else {
        warn!(operation = operations::DELETE, "Rejected admin token");
        Err(ApiError::Unauthorized("Invalid admin token".to_string()))
    }
}

/// Translate listing parameters into a store query.
///
/// `None` means the result is empty without asking the store: no owner was
/// given, or the requested activity is not one of the owner's.
async fn build_query(state: &AppState, query: &AttendanceQuery) -> ApiResult<Option<RecordQuery>> {
    let Some(owner_id) = query.owner_id.as_deref().filter(|o| !o.is_empty()) else {
        return Ok(None);
    };

    let owned: Vec<ActivityId> = state
        .store
        .list_activities_by_owner(&OwnerId::new(owner_id))
        .await?
        .into_iter()
        .map(|a| a.activity_id)
        .collect();

    let activity_ids = match query.activity_id.as_deref() {
        Some(requested) => {
            let requested = ActivityId::new(requested);
            if !owned.contains(&requested) {
                return Ok(None);
            }
            vec![requested]
        }
        None => owned,
    };

    let status = query
        .status
        .as_deref()
        .map(|s| {
            AttendanceStatus::from_str(s)
                .ok_or_else(|| ApiError::Validation(format!("Invalid status: {}", s)))
        })
        .transpose()?;

    let period = query
        .period
        .as_deref()
        .map(|p| Period::from_str(p).ok_or_else(|| ApiError::Validation(format!("Invalid period: {}", p))))
        .transpose()?;

    let range = match (query.date, period) {
        (None, None) => None,
        (date, period) => {
            let policy = state.resolver.policy();
            let date = date.unwrap_or_else(|| policy.calendar_day(Utc::now()));
            Some(DateRange::for_period(
                period.unwrap_or(Period::Day),
                date,
                &policy.timezone(),
            ))
        }
    };

    Ok(Some(RecordQuery {
        activity_ids: Some(activity_ids),
        participant_id: query.participant_id.as_deref().map(ParticipantId::new),
        status,
        arrival_from: range.map(|r| r.start),
        arrival_to: range.map(|r| r.end),
        limit: query.limit,
    }))
}
