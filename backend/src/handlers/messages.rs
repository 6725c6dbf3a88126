use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use super::matches::UserQuery;
use super::{ApiError, AppState};
use crate::services::{EngagementStatus, VideoCallStatus};

#[derive(Debug, Deserialize)]
pub struct MessageSentRequest {
    pub sender_id: Uuid,
}

/// Ingest point for the engagement monitor. Message content and delivery
/// live with the messaging collaborator; this endpoint only counts.
pub async fn message_sent(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<MessageSentRequest>,
) -> Result<Json<EngagementStatus>, ApiError> {
    let status = state.engine.on_message_sent(match_id, req.sender_id).await?;
    Ok(Json(status))
}

pub async fn video_call_status(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<VideoCallStatus>, ApiError> {
    let status = state
        .engine
        .video_call_status(match_id, query.user_id)
        .await?;
    Ok(Json(status))
}
