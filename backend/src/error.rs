use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::{MatchStatus, UserState};

/// Refusals and failures surfaced by the match engine. Every variant carries
/// enough structure for a caller to explain itself to an end user without
/// re-deriving business rules. An empty candidate pool and the
/// already-matched short-circuit are successful outcomes, not errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("match {0} not found")]
    MatchNotFound(Uuid),

    #[error("user is not eligible for matching (current state: {state})")]
    NotEligible {
        state: UserState,
        frozen_until: Option<DateTime<Utc>>,
        available_from: Option<DateTime<Utc>>,
    },

    #[error("user {user_id} is not a participant in match {match_id}")]
    NotParticipant { match_id: Uuid, user_id: Uuid },

    #[error("cannot {action} a match that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: MatchStatus,
    },

    #[error("the operation lost a concurrent update race twice, try again")]
    Contended,

    #[error(transparent)]
    Store(#[from] StoreError),
}
