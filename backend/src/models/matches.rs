use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Pinned,
    Ended,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Active => "active",
            MatchStatus::Pinned => "pinned",
            MatchStatus::Ended => "ended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MatchStatus::Active),
            "pinned" => Some(MatchStatus::Pinned),
            "ended" => Some(MatchStatus::Ended),
            _ => None,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Unpin,
    Timeout,
    Admin,
    Mutual,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Unpin => "unpin",
            EndReason::Timeout => "timeout",
            EndReason::Admin => "admin",
            EndReason::Mutual => "mutual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpin" => Some(EndReason::Unpin),
            "timeout" => Some(EndReason::Timeout),
            "admin" => Some(EndReason::Admin),
            "mutual" => Some(EndReason::Mutual),
            _ => None,
        }
    }
}

/// Per-category sub-scores, each 0-100, rounded independently of the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityFactors {
    pub personality: u8,
    pub emotional_intelligence: u8,
    pub relationship_values: u8,
    pub life_goals: u8,
    pub communication_style: u8,
    pub interests: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFeedback {
    pub from_user: Uuid,
    pub content: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// A pairing between exactly two users. Created `active`, promoted to
/// `pinned` on mutual confirmation, terminal once `ended` (retained as
/// history, never deleted). Score and factors are frozen at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub users: [Uuid; 2],
    pub status: MatchStatus,
    pub compatibility_score: u8,
    pub compatibility_factors: CompatibilityFactors,
    pub pinned_by: Vec<Uuid>,
    pub message_count: i64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub video_call_unlocked: bool,
    pub end_reason: Option<EndReason>,
    pub unpinned_by: Option<Uuid>,
    pub feedback: Option<MatchFeedback>,
    pub created_at: DateTime<Utc>,
    pub pinned_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Match {
    /// The pair is stored smaller id first so the same two users always map
    /// to the same row shape.
    pub fn new(
        id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
        compatibility_score: u8,
        compatibility_factors: CompatibilityFactors,
        created_at: DateTime<Utc>,
    ) -> Self {
        let users = if user_a <= user_b {
            [user_a, user_b]
        } else {
            [user_b, user_a]
        };
        Self {
            id,
            users,
            status: MatchStatus::Active,
            compatibility_score,
            compatibility_factors,
            pinned_by: Vec::new(),
            message_count: 0,
            last_message_at: None,
            video_call_unlocked: false,
            end_reason: None,
            unpinned_by: None,
            feedback: None,
            created_at,
            pinned_at: None,
            ended_at: None,
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.users.contains(&user_id)
    }

    pub fn partner_of(&self, user_id: Uuid) -> Option<Uuid> {
        match self.users {
            [a, b] if a == user_id => Some(b),
            [a, b] if b == user_id => Some(a),
            _ => None,
        }
    }

    /// Active and pinned matches count against the one-match-per-user rule.
    pub fn is_open(&self) -> bool {
        matches!(self.status, MatchStatus::Active | MatchStatus::Pinned)
    }
}
