use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "non-binary")]
    NonBinary,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NonBinary => "non-binary",
            Gender::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "non-binary" => Some(Gender::NonBinary),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one state per user at any time. `Matched` and `Pinned` imply a
/// non-null `current_match_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserState {
    Available,
    Matched,
    Pinned,
    Frozen,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::Available => "available",
            UserState::Matched => "matched",
            UserState::Pinned => "pinned",
            UserState::Frozen => "frozen",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(UserState::Available),
            "matched" => Some(UserState::Matched),
            "pinned" => Some(UserState::Pinned),
            "frozen" => Some(UserState::Frozen),
            _ => None,
        }
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Trait values are on a 1-10 scale.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityTraits {
    pub openness: u8,
    pub conscientiousness: u8,
    pub extraversion: u8,
    pub agreeableness: u8,
    pub neuroticism: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalIntelligence {
    pub self_awareness: u8,
    pub empathy: u8,
    pub social_skills: u8,
    pub emotional_regulation: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipValues {
    pub commitment: u8,
    pub loyalty: u8,
    pub honesty: u8,
    pub communication: u8,
    pub independence: u8,
    pub affection: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeGoals {
    pub career: u8,
    pub family: u8,
    pub personal_growth: u8,
    pub adventure: u8,
    pub stability: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationStyle {
    pub directness: u8,
    pub conflict_resolution: u8,
    pub expressiveness: u8,
    pub listening: u8,
}

/// The six-category profile the scorer consumes. Owned by the external
/// profile store; treated as immutable for the duration of a scoring pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitProfile {
    pub personality: PersonalityTraits,
    pub emotional_intelligence: EmotionalIntelligence,
    pub relationship_values: RelationshipValues,
    pub life_goals: LifeGoals,
    pub communication_style: CommunicationStyle,
    pub interests: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTimestamps {
    pub available_since: Option<DateTime<Utc>>,
    pub frozen_until: Option<DateTime<Utc>>,
    pub last_matched: Option<DateTime<Utc>>,
    pub last_pinned: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub gender: Gender,
    pub interested_in: Vec<Gender>,
    pub traits: TraitProfile,
    pub state: UserState,
    pub state_timestamps: StateTimestamps,
    pub current_match_id: Option<Uuid>,
}

impl User {
    /// The state a reader should act on. Stored state is not flipped by a
    /// background timer, so an elapsed freeze still reads `frozen` until the
    /// user is next touched.
    pub fn effective_state(&self, now: DateTime<Utc>) -> UserState {
        if self.state == UserState::Frozen {
            match self.state_timestamps.frozen_until {
                Some(until) if until > now => UserState::Frozen,
                _ => UserState::Available,
            }
        } else {
            self.state
        }
    }

    /// Whether this user can enter candidate selection right now. A
    /// future-dated `available_since` (the post-unpin grace period) keeps an
    /// `available` user out of the pool.
    pub fn eligible_for_matching(&self, now: DateTime<Utc>) -> bool {
        self.state == UserState::Available
            && self
                .state_timestamps
                .available_since
                .is_none_or(|since| since <= now)
    }

    /// Mutual gender preference check, evaluated in both directions.
    pub fn mutually_interested(&self, other: &User) -> bool {
        self.interested_in.contains(&other.gender) && other.interested_in.contains(&self.gender)
    }
}
