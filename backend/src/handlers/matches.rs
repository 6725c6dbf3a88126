use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::models::{Match, MatchFeedback};
use crate::services::DailyMatchOutcome;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DailyMatchRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DailyMatchResponse {
    #[serde(rename = "match")]
    pub match_record: Option<Match>,
    pub created: bool,
    pub message: String,
}

pub async fn daily_match(
    State(state): State<AppState>,
    Json(req): Json<DailyMatchRequest>,
) -> Result<Json<DailyMatchResponse>, ApiError> {
    let outcome = state.engine.assign_daily_match(req.user_id).await?;

    let response = match outcome {
        DailyMatchOutcome::Existing(record) => DailyMatchResponse {
            match_record: Some(record),
            created: false,
            message: "You already have an active match.".to_string(),
        },
        DailyMatchOutcome::Created(record) => DailyMatchResponse {
            match_record: Some(record),
            created: true,
            message: "New match found!".to_string(),
        },
        DailyMatchOutcome::NoMatchAvailable => DailyMatchResponse {
            match_record: None,
            created: false,
            message: "No compatible matches found today. Please check back later.".to_string(),
        },
    };

    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct CurrentMatchResponse {
    #[serde(rename = "match")]
    pub match_record: Match,
    pub partner_id: Uuid,
    pub message_count: i64,
    pub video_call_unlocked: bool,
}

pub async fn current_match(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CurrentMatchResponse>, ApiError> {
    let record = state
        .engine
        .current_match(query.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No active match found"))?;

    let partner_id = record
        .partner_of(query.user_id)
        .ok_or_else(|| ApiError::not_found("No active match found"))?;

    Ok(Json(CurrentMatchResponse {
        partner_id,
        message_count: record.message_count,
        video_call_unlocked: record.video_call_unlocked,
        match_record: record,
    }))
}

pub async fn match_history(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Match>>, ApiError> {
    let history = state.engine.match_history(query.user_id).await?;
    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PinResponse {
    #[serde(rename = "match")]
    pub match_record: Match,
    pub message: String,
}

pub async fn pin_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<PinRequest>,
) -> Result<Json<PinResponse>, ApiError> {
    let record = state.engine.pin(match_id, req.user_id).await?;
    let message = if record.status == crate::models::MatchStatus::Pinned {
        "Match pinned by both users!"
    } else {
        "You pinned this match!"
    };

    Ok(Json(PinResponse {
        match_record: record,
        message: message.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackPayload {
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnpinRequest {
    pub user_id: Uuid,
    pub feedback: Option<FeedbackPayload>,
}

#[derive(Debug, Serialize)]
pub struct UnpinResponse {
    pub message: String,
    pub frozen_until: DateTime<Utc>,
    pub partner_available_from: DateTime<Utc>,
}

pub async fn unpin_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<UnpinRequest>,
) -> Result<Json<UnpinResponse>, ApiError> {
    let feedback = req.feedback.map(|f| MatchFeedback {
        from_user: req.user_id,
        content: f.content,
        categories: f.categories,
    });

    let outcome = state.engine.unpin(match_id, req.user_id, feedback).await?;

    Ok(Json(UnpinResponse {
        message: "Match unpinned. You will be in reflection period for 24 hours.".to_string(),
        frozen_until: outcome.frozen_until,
        partner_available_from: outcome.partner_available_from,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub user_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<SubmitFeedbackRequest>,
) -> Result<Json<Match>, ApiError> {
    let record = state
        .engine
        .submit_feedback(match_id, req.user_id, req.content, req.categories)
        .await?;
    Ok(Json(record))
}

pub async fn match_feedback(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> Result<Json<MatchFeedback>, ApiError> {
    let feedback = state
        .engine
        .partner_feedback(match_id, query.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No feedback available"))?;
    Ok(Json(feedback))
}
