//! Daily match assignment.
//!
//! The hazard this module closes: two users requesting a match at the same
//! instant can each select the other (or a shared third user) as best
//! candidate. Selection runs outside any lock, but the commit re-validates
//! both participants through version CAS; whoever loses the race re-runs
//! candidate selection once against the fresh pool before giving up.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::MatchEngine;
use super::compatibility::best_candidate;
use crate::constants::ASSIGNMENT_ATTEMPTS;
use crate::db::{Commit, StoreError, Versioned};
use crate::error::EngineError;
use crate::models::{Match, MatchEvent, User, UserState};

/// Successful results of `assign_daily_match`. An existing open match and an
/// empty candidate pool are both legitimate outcomes, not errors.
#[derive(Debug, Clone)]
pub enum DailyMatchOutcome {
    /// Idempotent short-circuit: the user already has an open match.
    Existing(Match),
    Created(Match),
    NoMatchAvailable,
}

impl MatchEngine {
    /// Assign the single best available candidate to `user_id`, creating the
    /// match and flipping both users to `matched` in one atomic commit.
    pub async fn assign_daily_match(
        &self,
        user_id: Uuid,
    ) -> Result<DailyMatchOutcome, EngineError> {
        if let Some(existing) = self.store().open_match_for(user_id).await? {
            tracing::debug!(%user_id, match_id = %existing.id, "user already has an open match");
            return Ok(DailyMatchOutcome::Existing(existing));
        }

        let now = self.now();
        let mut seeker = self
            .store()
            .user(user_id)
            .await?
            .ok_or(EngineError::UserNotFound(user_id))?;

        seeker = self.thaw_if_elapsed(seeker, now).await?;

        if !seeker.record.eligible_for_matching(now) {
            return Err(not_eligible(&seeker.record, now));
        }

        for attempt in 0..ASSIGNMENT_ATTEMPTS {
            match self.select_and_commit(&seeker, now).await {
                Ok(outcome) => return Ok(outcome),
                Err(EngineError::Store(StoreError::Conflict))
                    if attempt + 1 < ASSIGNMENT_ATTEMPTS =>
                {
                    tracing::warn!(%user_id, "assignment commit conflicted, re-running selection");
                    // Another writer may have matched or frozen us meanwhile.
                    if let Some(existing) = self.store().open_match_for(user_id).await? {
                        return Ok(DailyMatchOutcome::Existing(existing));
                    }
                    seeker = self
                        .store()
                        .user(user_id)
                        .await?
                        .ok_or(EngineError::UserNotFound(user_id))?;
                    if !seeker.record.eligible_for_matching(now) {
                        return Err(not_eligible(&seeker.record, now));
                    }
                }
                Err(other) => return Err(other),
            }
        }

        Err(EngineError::Contended)
    }

    /// Lazy cooldown expiry: a frozen user whose freeze has elapsed is
    /// flipped back to available (persisted) before matching continues in
    /// the same call. A freeze still in force is reported, not mutated.
    async fn thaw_if_elapsed(
        &self,
        seeker: Versioned<User>,
        now: DateTime<Utc>,
    ) -> Result<Versioned<User>, EngineError> {
        if seeker.record.state != UserState::Frozen {
            return Ok(seeker);
        }
        if let Some(until) = seeker.record.state_timestamps.frozen_until {
            if until > now {
                return Err(EngineError::NotEligible {
                    state: UserState::Frozen,
                    frozen_until: Some(until),
                    available_from: None,
                });
            }
        }

        let mut thawed = seeker.record.clone();
        thawed.state = UserState::Available;
        thawed.state_timestamps.available_since = Some(now);
        thawed.state_timestamps.frozen_until = None;
        self.store()
            .commit(Commit::new().update_user(thawed.clone(), seeker.version))
            .await?;
        tracing::info!(user_id = %thawed.id, "freeze elapsed, user returned to available");

        Ok(Versioned {
            record: thawed,
            version: seeker.version + 1,
        })
    }

    async fn select_and_commit(
        &self,
        seeker: &Versioned<User>,
        now: DateTime<Utc>,
    ) -> Result<DailyMatchOutcome, EngineError> {
        let pool = self.store().find_eligible(&seeker.record, now).await?;
        if pool.is_empty() {
            tracing::info!(user_id = %seeker.record.id, "candidate pool is empty");
            return Ok(DailyMatchOutcome::NoMatchAvailable);
        }

        let (selected, compatibility) = match best_candidate(&seeker.record, &pool) {
            Some(best) => best,
            None => return Ok(DailyMatchOutcome::NoMatchAvailable),
        };

        // Re-read the candidate for a commit-time version; the pool row may
        // already be stale. A candidate that slipped away counts as a
        // conflict so the caller re-selects from the remaining pool.
        let candidate = self
            .store()
            .user(selected.id)
            .await?
            .filter(|v| v.record.eligible_for_matching(now))
            .ok_or(EngineError::Store(StoreError::Conflict))?;

        let record = Match::new(
            Uuid::new_v4(),
            seeker.record.id,
            candidate.record.id,
            compatibility.score,
            compatibility.factors,
            now,
        );

        let commit = Commit::new()
            .update_user(
                matched_user(&seeker.record, record.id, now),
                seeker.version,
            )
            .update_user(
                matched_user(&candidate.record, record.id, now),
                candidate.version,
            )
            .insert_match(record.clone());
        self.store().commit(commit).await?;

        tracing::info!(
            match_id = %record.id,
            user_a = %record.users[0],
            user_b = %record.users[1],
            score = record.compatibility_score,
            "match created"
        );
        self.events().publish(MatchEvent::MatchCreated {
            match_id: record.id,
            users: record.users,
            compatibility_score: record.compatibility_score,
        });

        Ok(DailyMatchOutcome::Created(record))
    }
}

fn matched_user(user: &User, match_id: Uuid, now: DateTime<Utc>) -> User {
    let mut updated = user.clone();
    updated.state = UserState::Matched;
    updated.state_timestamps.last_matched = Some(now);
    updated.current_match_id = Some(match_id);
    updated
}

fn not_eligible(user: &User, now: DateTime<Utc>) -> EngineError {
    EngineError::NotEligible {
        state: user.state,
        frozen_until: user.state_timestamps.frozen_until,
        available_from: user
            .state_timestamps
            .available_since
            .filter(|since| *since > now),
    }
}
