use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::matches::EndReason;

/// Discrete notifications emitted by the engine. Delivery (push channel,
/// polling, webhook) is a collaborator concern; the engine only publishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    MatchCreated {
        match_id: Uuid,
        users: [Uuid; 2],
        compatibility_score: u8,
    },
    MatchPinned {
        match_id: Uuid,
        users: [Uuid; 2],
    },
    MatchEnded {
        match_id: Uuid,
        users: [Uuid; 2],
        reason: EndReason,
        unpinned_by: Option<Uuid>,
        initiator_frozen_until: Option<DateTime<Utc>>,
        partner_available_from: Option<DateTime<Utc>>,
    },
    VideoCallUnlocked {
        match_id: Uuid,
        users: [Uuid; 2],
    },
}
