//! Pin / unpin transitions and the joint User x Match state machine.
//!
//! Pinning needs mutual confirmation: a single pin only records membership
//! in `pinned_by`. Unpinning is unilateral and asymmetric on purpose: the
//! initiator sits out a 24-hour reflection freeze while the other party gets
//! a 2-hour grace period before re-entering the pool. Every multi-record
//! mutation lands as one atomic commit.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::MatchEngine;
use crate::constants::{PARTNER_GRACE_HOURS, UNPIN_FREEZE_HOURS};
use crate::db::{Commit, StoreError, Versioned};
use crate::error::EngineError;
use crate::models::{
    EndReason, Match, MatchEvent, MatchFeedback, MatchStatus, UserState,
};

/// Result of a successful unpin, carrying the cooldown instants the caller
/// needs to explain the outcome to both users.
#[derive(Debug, Clone)]
pub struct UnpinOutcome {
    pub record: Match,
    pub frozen_until: DateTime<Utc>,
    pub partner_available_from: DateTime<Utc>,
}

impl MatchEngine {
    /// Record `user_id`'s pin on the match. Idempotent per user: a repeat
    /// pin neither double-adds membership nor changes status. When the
    /// second participant pins, the match and both users promote to
    /// `pinned` atomically.
    pub async fn pin(&self, match_id: Uuid, user_id: Uuid) -> Result<Match, EngineError> {
        for attempt in 0..2 {
            let now = self.now();
            let current = self.fetch_match(match_id).await?;
            ensure_participant(&current.record, user_id)?;
            if current.record.status != MatchStatus::Active {
                return Err(EngineError::InvalidTransition {
                    action: "pin",
                    status: current.record.status,
                });
            }
            if current.record.pinned_by.contains(&user_id) {
                return Ok(current.record);
            }

            let mut updated = current.record.clone();
            updated.pinned_by.push(user_id);
            let mutual = updated.pinned_by.len() == 2;

            let mut commit = Commit::new();
            if mutual {
                updated.status = MatchStatus::Pinned;
                updated.pinned_at = Some(now);
                for participant in updated.users {
                    let versioned = self
                        .store()
                        .user(participant)
                        .await?
                        .ok_or(EngineError::UserNotFound(participant))?;
                    let mut user = versioned.record;
                    user.state = UserState::Pinned;
                    user.state_timestamps.last_pinned = Some(now);
                    commit = commit.update_user(user, versioned.version);
                }
            }
            commit = commit.update_match(updated.clone(), current.version);

            match self.store().commit(commit).await {
                Ok(()) => {
                    if mutual {
                        tracing::info!(%match_id, "match pinned by both users");
                        self.events().publish(MatchEvent::MatchPinned {
                            match_id,
                            users: updated.users,
                        });
                    } else {
                        tracing::info!(%match_id, %user_id, "match pinned by one user");
                    }
                    return Ok(updated);
                }
                Err(StoreError::Conflict) if attempt == 0 => {
                    tracing::warn!(%match_id, "pin lost a write race, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(EngineError::Contended)
    }

    /// Unilaterally end the match. The acting user is frozen for 24 hours;
    /// the partner re-enters the pool after a 2-hour grace period. Optional
    /// feedback from the acting user is attached in the same commit. Fails
    /// without side effects on an already-ended match.
    pub async fn unpin(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        feedback: Option<MatchFeedback>,
    ) -> Result<UnpinOutcome, EngineError> {
        for attempt in 0..2 {
            let now = self.now();
            let current = self.fetch_match(match_id).await?;
            ensure_participant(&current.record, user_id)?;
            if !current.record.is_open() {
                return Err(EngineError::InvalidTransition {
                    action: "unpin",
                    status: current.record.status,
                });
            }
            let partner_id = current
                .record
                .partner_of(user_id)
                .ok_or(EngineError::NotParticipant { match_id, user_id })?;

            let frozen_until = now + Duration::hours(UNPIN_FREEZE_HOURS);
            let partner_available_from = now + Duration::hours(PARTNER_GRACE_HOURS);

            let mut updated = current.record.clone();
            updated.status = MatchStatus::Ended;
            updated.end_reason = Some(EndReason::Unpin);
            updated.unpinned_by = Some(user_id);
            updated.ended_at = Some(now);
            if feedback.is_some() {
                updated.feedback = feedback.clone();
            }

            let initiator = self
                .store()
                .user(user_id)
                .await?
                .ok_or(EngineError::UserNotFound(user_id))?;
            let mut initiator_record = initiator.record;
            initiator_record.state = UserState::Frozen;
            initiator_record.state_timestamps.frozen_until = Some(frozen_until);
            initiator_record.current_match_id = None;

            let partner = self
                .store()
                .user(partner_id)
                .await?
                .ok_or(EngineError::UserNotFound(partner_id))?;
            let mut partner_record = partner.record;
            partner_record.state = UserState::Available;
            partner_record.state_timestamps.available_since = Some(partner_available_from);
            partner_record.current_match_id = None;

            let commit = Commit::new()
                .update_user(initiator_record, initiator.version)
                .update_user(partner_record, partner.version)
                .update_match(updated.clone(), current.version);

            match self.store().commit(commit).await {
                Ok(()) => {
                    tracing::info!(%match_id, unpinned_by = %user_id, "match ended");
                    self.events().publish(MatchEvent::MatchEnded {
                        match_id,
                        users: updated.users,
                        reason: EndReason::Unpin,
                        unpinned_by: Some(user_id),
                        initiator_frozen_until: Some(frozen_until),
                        partner_available_from: Some(partner_available_from),
                    });
                    return Ok(UnpinOutcome {
                        record: updated,
                        frozen_until,
                        partner_available_from,
                    });
                }
                Err(StoreError::Conflict) if attempt == 0 => {
                    tracing::warn!(%match_id, "unpin lost a write race, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(EngineError::Contended)
    }

    /// Attach feedback to an ended match. Participant only. Re-submission
    /// overwrites: the stored record keeps the last write.
    pub async fn submit_feedback(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        content: String,
        categories: Vec<String>,
    ) -> Result<Match, EngineError> {
        for attempt in 0..2 {
            let current = self.fetch_match(match_id).await?;
            ensure_participant(&current.record, user_id)?;
            if current.record.status != MatchStatus::Ended {
                return Err(EngineError::InvalidTransition {
                    action: "submit feedback on",
                    status: current.record.status,
                });
            }

            let mut updated = current.record.clone();
            if updated.feedback.is_some() {
                tracing::warn!(%match_id, %user_id, "overwriting previously submitted feedback");
            }
            updated.feedback = Some(MatchFeedback {
                from_user: user_id,
                content: content.clone(),
                categories: categories.clone(),
            });

            match self
                .store()
                .commit(Commit::new().update_match(updated.clone(), current.version))
                .await
            {
                Ok(()) => return Ok(updated),
                Err(StoreError::Conflict) if attempt == 0 => {}
                Err(err) => return Err(err.into()),
            }
        }

        Err(EngineError::Contended)
    }

    /// Feedback the partner left on this match, if any. A user never reads
    /// back their own submission through this path.
    pub async fn partner_feedback(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MatchFeedback>, EngineError> {
        let current = self.fetch_match(match_id).await?;
        ensure_participant(&current.record, user_id)?;
        Ok(current
            .record
            .feedback
            .filter(|feedback| feedback.from_user != user_id))
    }

    pub(crate) async fn fetch_match(
        &self,
        match_id: Uuid,
    ) -> Result<Versioned<Match>, EngineError> {
        self.store()
            .match_record(match_id)
            .await?
            .ok_or(EngineError::MatchNotFound(match_id))
    }
}

fn ensure_participant(record: &Match, user_id: Uuid) -> Result<(), EngineError> {
    if record.involves(user_id) {
        Ok(())
    } else {
        Err(EngineError::NotParticipant {
            match_id: record.id,
            user_id,
        })
    }
}
