pub mod matches;
pub mod messages;

pub use matches::*;
pub use messages::*;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::db::StoreError;
use crate::error::EngineError;
use crate::services::MatchEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
}

/// JSON error body shared by every endpoint. Refusals carry the structured
/// detail (state, cooldown instants, match status) the client needs to
/// explain itself without re-deriving business rules.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_status: Option<String>,
}

impl ErrorBody {
    fn new(error: String, code: &'static str) -> Self {
        Self {
            error,
            code,
            state: None,
            frozen_until: None,
            available_from: None,
            match_status: None,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody::new(message.to_string(), "not_found"),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::UserNotFound(_) | EngineError::MatchNotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                body: ErrorBody::new(message, "not_found"),
            },
            EngineError::NotEligible {
                state,
                frozen_until,
                available_from,
            } => Self {
                status: StatusCode::CONFLICT,
                body: ErrorBody {
                    state: Some(state.to_string()),
                    frozen_until,
                    available_from,
                    ..ErrorBody::new(message, "not_eligible")
                },
            },
            EngineError::NotParticipant { .. } => Self {
                status: StatusCode::FORBIDDEN,
                body: ErrorBody::new(message, "not_participant"),
            },
            EngineError::InvalidTransition { status, .. } => Self {
                status: StatusCode::CONFLICT,
                body: ErrorBody {
                    match_status: Some(status.to_string()),
                    ..ErrorBody::new(message, "invalid_transition")
                },
            },
            EngineError::Contended => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: ErrorBody::new(message, "contended"),
            },
            EngineError::Store(StoreError::Conflict) => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: ErrorBody::new(message, "contended"),
            },
            EngineError::Store(store_err) => {
                tracing::error!("store failure: {store_err}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: ErrorBody::new("internal storage error".to_string(), "store_unavailable"),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
