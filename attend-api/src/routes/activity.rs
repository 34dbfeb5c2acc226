//! Activity catalog endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveTime;

use attend_core::{parse_time_of_day, ActivityId, OwnerId};
use attend_store::{ActivityDraft, AttendanceStore};

use crate::dto::{ActivityRequest, ActivityResponse, DeleteResponse, ListResponse, OwnerQuery};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create an activity
pub async fn create_activity(
    State(state): State<AppState>,
    Json(req): Json<ActivityRequest>,
) -> ApiResult<Json<ActivityResponse>> {
    let activity = state.store.create_activity(to_draft(req)?).await?;
    Ok(Json(ActivityResponse::from(&activity)))
}

/// List an owner's activities; without an owner the list is empty
pub async fn list_activities(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<ListResponse<ActivityResponse>>> {
    let Some(owner_id) = query.owner_id.filter(|o| !o.is_empty()) else {
        return Ok(Json(ListResponse::new(Vec::new())));
    };

    let activities = state
        .store
        .list_activities_by_owner(&OwnerId::new(owner_id))
        .await?;
    Ok(Json(ListResponse::new(
        activities.iter().map(ActivityResponse::from).collect(),
    )))
}

/// Get activity by ID
pub async fn get_activity(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> ApiResult<Json<ActivityResponse>> {
    let activity = state
        .store
        .get_activity(&ActivityId::new(activity_id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Activity {} not found", activity_id)))?;

    Ok(Json(ActivityResponse::from(&activity)))
}

/// Update an activity
pub async fn update_activity(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
    Json(req): Json<ActivityRequest>,
) -> ApiResult<Json<ActivityResponse>> {
    let activity = state
        .store
        .update_activity(&ActivityId::new(activity_id), to_draft(req)?)
        .await?;
    Ok(Json(ActivityResponse::from(&activity)))
}

/// Delete an activity; its records are kept
pub async fn delete_activity(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = state
        .store
        .delete_activity(&ActivityId::new(activity_id.clone()))
        .await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Activity {} not found", activity_id)));
    }

    Ok(Json(DeleteResponse {
        deleted,
        id: activity_id,
    }))
}

// Helper functions

fn to_draft(req: ActivityRequest) -> ApiResult<ActivityDraft> {
    Ok(ActivityDraft {
        start_time: parse_time(&req.start_time, "start_time")?,
        end_time: parse_time(&req.end_time, "end_time")?,
        owner_id: OwnerId::new(req.owner_id),
        title: req.title,
        description: req.description,
        schedule_label: req.schedule_label,
        room: req.room,
        grace_period_minutes: req.grace_period_minutes,
        allows_departure_scan: req.allows_departure_scan,
    })
}

fn parse_time(value: &str, field: &str) -> ApiResult<NaiveTime> {
    parse_time_of_day(value)
        .ok_or_else(|| ApiError::Validation(format!("Invalid {}: {}", field, value)))
}
