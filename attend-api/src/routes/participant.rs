//! Participant enrollment endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;

use attend_core::logging::operations;
use attend_core::{codec, OwnerId, ParticipantId};
use attend_store::{AttendanceStore, ParticipantRegistration};

use crate::dto::{
    ListResponse, OwnerQuery, ParticipantResponse, QrResponse, RegisterParticipantRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Enroll a participant
pub async fn register_participant(
    State(state): State<AppState>,
    Json(req): Json<RegisterParticipantRequest>,
) -> ApiResult<Json<ParticipantResponse>> {
    let registration = ParticipantRegistration {
        external_id: req.external_id,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        section: req.section,
        owner_id: req.owner_id.map(OwnerId::new),
    };

    let participant = state.store.register_participant(registration).await?;

    info!(
        operation = operations::ENROLL,
        participant_id = %participant.participant_id,
        external_id = %participant.external_id,
        "Participant enrolled"
    );

    Ok(Json(ParticipantResponse::from(&participant)))
}

/// List an owner's roster ordered by last name; without an owner the list is empty
pub async fn list_participants(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<ListResponse<ParticipantResponse>>> {
    let Some(owner_id) = query.owner_id.filter(|o| !o.is_empty()) else {
        return Ok(Json(ListResponse::new(Vec::new())));
    };

    let participants = state
        .store
        .list_participants_by_owner(&OwnerId::new(owner_id))
        .await?;
    Ok(Json(ListResponse::new(
        participants.iter().map(ParticipantResponse::from).collect(),
    )))
}

/// Get participant by ID
pub async fn get_participant(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> ApiResult<Json<ParticipantResponse>> {
    let participant = state
        .store
        .get_participant(&ParticipantId::new(participant_id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Participant {} not found", participant_id)))?;

    Ok(Json(ParticipantResponse::from(&participant)))
}

/// Issue a freshly signed payload for the participant's QR code
pub async fn issue_qr(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> ApiResult<Json<QrResponse>> {
    let participant = state
        .store
        .get_participant(&ParticipantId::new(participant_id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Participant {} not found", participant_id)))?;

    let payload = codec::issue(&participant.external_id, &participant.secret);

    info!(
        operation = operations::ISSUE,
        participant_id = %participant.participant_id,
        issued_at = payload.issued_at,
        "QR payload issued"
    );

    Ok(Json(QrResponse {
        participant_id: participant.participant_id.to_string(),
        external_id: participant.external_id.clone(),
        payload: codec::serialize(&payload),
        issued_at: payload.issued_at,
    }))
}
