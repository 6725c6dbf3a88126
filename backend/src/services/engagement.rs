//! Message-volume tracking and the video-call unlock milestone.
//!
//! The milestone counts messages inside a trailing 48-hour window relative
//! to "now", not to match creation. The unlock flag is monotonic: once
//! flipped it never re-locks, even if the rate later drops. The windowed
//! recount is a snapshot read; a count that trails the latest write is fine
//! because every subsequent send re-evaluates the threshold.

use chrono::Duration;
use serde::Serialize;
use uuid::Uuid;

use super::MatchEngine;
use crate::constants::{ENGAGEMENT_WINDOW_HOURS, VIDEO_CALL_MESSAGE_THRESHOLD};
use crate::db::{Commit, StoreError};
use crate::error::EngineError;
use crate::models::{MatchEvent, MatchStatus};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngagementStatus {
    pub message_count: i64,
    pub windowed_count: i64,
    pub video_call_unlocked: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VideoCallStatus {
    pub video_call_unlocked: bool,
    pub windowed_count: i64,
    pub required_count: i64,
    pub remaining: i64,
}

impl MatchEngine {
    /// Register one message between the match participants: bump the total,
    /// stamp `last_message_at`, recount the trailing window, and flip the
    /// video-call unlock if the threshold is crossed. Deduplication of
    /// message writes is the transport's responsibility; an invocation that
    /// arrives with the threshold already crossed is harmless.
    pub async fn on_message_sent(
        &self,
        match_id: Uuid,
        sender_id: Uuid,
    ) -> Result<EngagementStatus, EngineError> {
        let now = self.now();
        {
            let current = self.fetch_match(match_id).await?;
            if !current.record.involves(sender_id) {
                return Err(EngineError::NotParticipant {
                    match_id,
                    user_id: sender_id,
                });
            }
            if !current.record.is_open() {
                return Err(EngineError::InvalidTransition {
                    action: "message",
                    status: current.record.status,
                });
            }
        }

        self.store().record_message(match_id, now).await?;
        let window_start = now - Duration::hours(ENGAGEMENT_WINDOW_HOURS);

        for attempt in 0..2 {
            let current = self.fetch_match(match_id).await?;
            let windowed_count = self
                .store()
                .count_messages_since(match_id, window_start)
                .await?;

            let mut updated = current.record.clone();
            updated.message_count += 1;
            updated.last_message_at = Some(now);
            let newly_unlocked =
                !updated.video_call_unlocked && windowed_count >= VIDEO_CALL_MESSAGE_THRESHOLD;
            if newly_unlocked {
                updated.video_call_unlocked = true;
            }

            match self
                .store()
                .commit(Commit::new().update_match(updated.clone(), current.version))
                .await
            {
                Ok(()) => {
                    if newly_unlocked {
                        tracing::info!(%match_id, windowed_count, "video calling unlocked");
                        self.events().publish(MatchEvent::VideoCallUnlocked {
                            match_id,
                            users: updated.users,
                        });
                    }
                    return Ok(EngagementStatus {
                        message_count: updated.message_count,
                        windowed_count,
                        video_call_unlocked: updated.video_call_unlocked,
                    });
                }
                Err(StoreError::Conflict) if attempt == 0 => {
                    // Both participants sent in the same instant; re-read and
                    // re-apply this message's increment.
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(EngineError::Contended)
    }

    /// Read-side probe for the unlock milestone. If the probe observes the
    /// threshold crossed before any send did, it performs the same one-way
    /// flip (best effort: a lost race here just defers the flip to the next
    /// message).
    pub async fn video_call_status(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<VideoCallStatus, EngineError> {
        let now = self.now();
        let current = self.fetch_match(match_id).await?;
        if !current.record.involves(user_id) {
            return Err(EngineError::NotParticipant { match_id, user_id });
        }

        let window_start = now - Duration::hours(ENGAGEMENT_WINDOW_HOURS);
        let windowed_count = self
            .store()
            .count_messages_since(match_id, window_start)
            .await?;

        let mut unlocked = current.record.video_call_unlocked;
        if !unlocked && windowed_count >= VIDEO_CALL_MESSAGE_THRESHOLD {
            let mut updated = current.record.clone();
            updated.video_call_unlocked = true;
            match self
                .store()
                .commit(Commit::new().update_match(updated.clone(), current.version))
                .await
            {
                Ok(()) => {
                    unlocked = true;
                    self.events().publish(MatchEvent::VideoCallUnlocked {
                        match_id,
                        users: updated.users,
                    });
                }
                Err(StoreError::Conflict) => {
                    // A concurrent send is about to flip it; report unlocked
                    // since the threshold is observably crossed.
                    unlocked = true;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(VideoCallStatus {
            video_call_unlocked: unlocked,
            windowed_count,
            required_count: VIDEO_CALL_MESSAGE_THRESHOLD,
            remaining: (VIDEO_CALL_MESSAGE_THRESHOLD - windowed_count).max(0),
        })
    }
}
