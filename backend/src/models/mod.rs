pub mod events;
pub mod matches;
pub mod users;

pub use events::MatchEvent;
pub use matches::{CompatibilityFactors, EndReason, Match, MatchFeedback, MatchStatus};
pub use users::{
    CommunicationStyle, EmotionalIntelligence, Gender, LifeGoals, PersonalityTraits,
    RelationshipValues, StateTimestamps, TraitProfile, User, UserState,
};
