//! API route handlers

pub mod activity;
pub mod attendance;
pub mod health;
pub mod participant;
pub mod scan;

pub use attendance::ADMIN_TOKEN_HEADER;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        // Scan endpoints
        .route("/api/v1/scans", post(scan::submit_scan))
        // Participant endpoints
        .route(
            "/api/v1/participants",
            post(participant::register_participant).get(participant::list_participants),
        )
        .route("/api/v1/participants/:participant_id", get(participant::get_participant))
        .route("/api/v1/participants/:participant_id/qr", get(participant::issue_qr))
        // Activity endpoints
        .route(
            "/api/v1/activities",
            post(activity::create_activity).get(activity::list_activities),
        )
        .route(
            "/api/v1/activities/:activity_id",
            get(activity::get_activity)
                .put(activity::update_activity)
                .delete(activity::delete_activity),
        )
        // Attendance endpoints
        .route("/api/v1/attendance", get(attendance::list_records))
        .route("/api/v1/attendance/stats", get(attendance::get_stats))
        .route(
            "/api/v1/attendance/:record_id",
            get(attendance::get_record).delete(attendance::delete_record),
        )
        // State
        .with_state(state)
}
