pub mod compatibility;
pub mod engagement;
pub mod events;
pub mod lifecycle;
pub mod matchmaker;

pub use compatibility::{Compatibility, TraitKind, best_candidate, score_pair};
pub use engagement::{EngagementStatus, VideoCallStatus};
pub use events::{EventSink, TracingEventSink};
pub use lifecycle::UnpinOutcome;
pub use matchmaker::DailyMatchOutcome;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::Store;
use crate::error::EngineError;
use crate::models::Match;
use crate::utils::Clock;

/// The match-assignment engine and lifecycle state machine. Owns no ambient
/// handles: the store, the event sink, and the clock are injected once at
/// process start.
pub struct MatchEngine {
    store: Arc<dyn Store>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl MatchEngine {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            events,
            clock,
        }
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The user's currently open (active or pinned) match, if any.
    pub async fn current_match(&self, user_id: Uuid) -> Result<Option<Match>, EngineError> {
        Ok(self.store.open_match_for(user_id).await?)
    }

    /// Ended matches for the user, newest first. Matches are never deleted.
    pub async fn match_history(&self, user_id: Uuid) -> Result<Vec<Match>, EngineError> {
        Ok(self.store.ended_matches_for(user_id).await?)
    }
}
