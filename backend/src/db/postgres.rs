use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{Commit, MatchWrite, Store, StoreError, Versioned};
use crate::models::{
    EndReason, Gender, Match, MatchFeedback, MatchStatus, StateTimestamps, TraitProfile, User,
    UserState,
};

const USER_COLUMNS: &str = "id, name, gender, interested_in, traits, state, available_since, \
     frozen_until, last_matched, last_pinned, current_match_id, version";

const MATCH_COLUMNS: &str = "id, user_a, user_b, status, compatibility_score, \
     compatibility_factors, pinned_by, message_count, last_message_at, video_call_unlocked, \
     end_reason, unpinned_by, feedback, created_at, pinned_at, ended_at, version";

/// Postgres-backed store. Enums are stored as TEXT, the trait bundle and
/// feedback as JSONB, and every row carries a `version` column bumped on
/// each write; `commit` runs all writes in one transaction and treats a
/// version mismatch on any of them as a conflict for the whole batch.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Seed helper for the `seed` binary; profile creation is otherwise
    /// owned by the external identity service.
    pub async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let traits = serde_json::to_value(&user.traits)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let interested_in: Vec<String> = user
            .interested_in
            .iter()
            .map(|g| g.as_str().to_string())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, gender, interested_in, traits, state,
                               available_since, frozen_until, last_matched, last_pinned,
                               current_match_id, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.gender.as_str())
        .bind(&interested_in)
        .bind(traits)
        .bind(user.state.as_str())
        .bind(user.state_timestamps.available_since)
        .bind(user.state_timestamps.frozen_until)
        .bind(user.state_timestamps.last_matched)
        .bind(user.state_timestamps.last_pinned)
        .bind(user.current_match_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn decode_gender(s: &str) -> Result<Gender, StoreError> {
    Gender::parse(s).ok_or_else(|| StoreError::Decode(format!("unknown gender '{s}'")))
}

fn decode_user(row: &PgRow) -> Result<Versioned<User>, StoreError> {
    let gender: String = row.try_get("gender")?;
    let interested_in: Vec<String> = row.try_get("interested_in")?;
    let state: String = row.try_get("state")?;
    let traits: serde_json::Value = row.try_get("traits")?;

    let user = User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        gender: decode_gender(&gender)?,
        interested_in: interested_in
            .iter()
            .map(|s| decode_gender(s))
            .collect::<Result<_, _>>()?,
        traits: serde_json::from_value::<TraitProfile>(traits)
            .map_err(|e| StoreError::Decode(e.to_string()))?,
        state: UserState::parse(&state)
            .ok_or_else(|| StoreError::Decode(format!("unknown user state '{state}'")))?,
        state_timestamps: StateTimestamps {
            available_since: row.try_get("available_since")?,
            frozen_until: row.try_get("frozen_until")?,
            last_matched: row.try_get("last_matched")?,
            last_pinned: row.try_get("last_pinned")?,
        },
        current_match_id: row.try_get("current_match_id")?,
    };

    Ok(Versioned {
        record: user,
        version: row.try_get("version")?,
    })
}

fn decode_match(row: &PgRow) -> Result<Versioned<Match>, StoreError> {
    let status: String = row.try_get("status")?;
    let end_reason: Option<String> = row.try_get("end_reason")?;
    let factors: serde_json::Value = row.try_get("compatibility_factors")?;
    let feedback: Option<serde_json::Value> = row.try_get("feedback")?;
    let score: i16 = row.try_get("compatibility_score")?;

    let record = Match {
        id: row.try_get("id")?,
        users: [row.try_get("user_a")?, row.try_get("user_b")?],
        status: MatchStatus::parse(&status)
            .ok_or_else(|| StoreError::Decode(format!("unknown match status '{status}'")))?,
        compatibility_score: u8::try_from(score)
            .map_err(|_| StoreError::Decode(format!("score {score} out of range")))?,
        compatibility_factors: serde_json::from_value(factors)
            .map_err(|e| StoreError::Decode(e.to_string()))?,
        pinned_by: row.try_get("pinned_by")?,
        message_count: row.try_get("message_count")?,
        last_message_at: row.try_get("last_message_at")?,
        video_call_unlocked: row.try_get("video_call_unlocked")?,
        end_reason: end_reason
            .map(|s| {
                EndReason::parse(&s)
                    .ok_or_else(|| StoreError::Decode(format!("unknown end reason '{s}'")))
            })
            .transpose()?,
        unpinned_by: row.try_get("unpinned_by")?,
        feedback: feedback
            .map(|v| {
                serde_json::from_value::<MatchFeedback>(v)
                    .map_err(|e| StoreError::Decode(e.to_string()))
            })
            .transpose()?,
        created_at: row.try_get("created_at")?,
        pinned_at: row.try_get("pinned_at")?,
        ended_at: row.try_get("ended_at")?,
    };

    Ok(Versioned {
        record,
        version: row.try_get("version")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn user(&self, id: Uuid) -> Result<Option<Versioned<User>>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_user).transpose()
    }

    async fn match_record(&self, id: Uuid) -> Result<Option<Versioned<Match>>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_match).transpose()
    }

    async fn open_match_for(&self, user_id: Uuid) -> Result<Option<Match>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {MATCH_COLUMNS} FROM matches
            WHERE (user_a = $1 OR user_b = $1)
            AND status IN ('active', 'pinned')
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(decode_match).transpose()?.map(|v| v.record))
    }

    async fn ended_matches_for(&self, user_id: Uuid) -> Result<Vec<Match>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MATCH_COLUMNS} FROM matches
            WHERE (user_a = $1 OR user_b = $1)
            AND status = 'ended'
            ORDER BY ended_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| decode_match(row).map(|v| v.record))
            .collect()
    }

    async fn find_eligible(
        &self,
        seeker: &User,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError> {
        let interested_in: Vec<String> = seeker
            .interested_in
            .iter()
            .map(|g| g.as_str().to_string())
            .collect();

        // ORDER BY keeps pool iteration stable so the scorer's first-seen
        // tie-break is deterministic.
        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE id != $1
            AND state = 'available'
            AND (available_since IS NULL OR available_since <= $2)
            AND gender = ANY($3)
            AND $4 = ANY(interested_in)
            ORDER BY id
            "#
        ))
        .bind(seeker.id)
        .bind(now)
        .bind(&interested_in)
        .bind(seeker.gender.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| decode_user(row).map(|v| v.record))
            .collect()
    }

    async fn record_message(
        &self,
        match_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO match_messages (match_id, sent_at) VALUES ($1, $2)")
            .bind(match_id)
            .bind(sent_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_messages_since(
        &self,
        match_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM match_messages WHERE match_id = $1 AND sent_at >= $2",
        )
        .bind(match_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn commit(&self, commit: Commit) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for write in &commit.users {
            let user = &write.user;
            let result = sqlx::query(
                r#"
                UPDATE users
                SET state = $1,
                    available_since = $2,
                    frozen_until = $3,
                    last_matched = $4,
                    last_pinned = $5,
                    current_match_id = $6,
                    version = version + 1,
                    updated_at = NOW()
                WHERE id = $7 AND version = $8
                "#,
            )
            .bind(user.state.as_str())
            .bind(user.state_timestamps.available_since)
            .bind(user.state_timestamps.frozen_until)
            .bind(user.state_timestamps.last_matched)
            .bind(user.state_timestamps.last_pinned)
            .bind(user.current_match_id)
            .bind(user.id)
            .bind(write.expected_version)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() != 1 {
                return Err(StoreError::Conflict);
            }
        }

        for write in &commit.matches {
            match write {
                MatchWrite::Insert(record) => {
                    let factors = serde_json::to_value(record.compatibility_factors)
                        .map_err(|e| StoreError::Decode(e.to_string()))?;
                    sqlx::query(
                        r#"
                        INSERT INTO matches (id, user_a, user_b, status, compatibility_score,
                                             compatibility_factors, pinned_by, message_count,
                                             video_call_unlocked, created_at, version)
                        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0)
                        "#,
                    )
                    .bind(record.id)
                    .bind(record.users[0])
                    .bind(record.users[1])
                    .bind(record.status.as_str())
                    .bind(i16::from(record.compatibility_score))
                    .bind(factors)
                    .bind(&record.pinned_by)
                    .bind(record.message_count)
                    .bind(record.video_call_unlocked)
                    .bind(record.created_at)
                    .execute(&mut *tx)
                    .await?;
                }
                MatchWrite::Update {
                    expected_version,
                    record,
                } => {
                    let feedback = record
                        .feedback
                        .as_ref()
                        .map(serde_json::to_value)
                        .transpose()
                        .map_err(|e| StoreError::Decode(e.to_string()))?;
                    let result = sqlx::query(
                        r#"
                        UPDATE matches
                        SET status = $1,
                            pinned_by = $2,
                            message_count = $3,
                            last_message_at = $4,
                            video_call_unlocked = $5,
                            end_reason = $6,
                            unpinned_by = $7,
                            feedback = $8,
                            pinned_at = $9,
                            ended_at = $10,
                            version = version + 1
                        WHERE id = $11 AND version = $12
                        "#,
                    )
                    .bind(record.status.as_str())
                    .bind(&record.pinned_by)
                    .bind(record.message_count)
                    .bind(record.last_message_at)
                    .bind(record.video_call_unlocked)
                    .bind(record.end_reason.map(|r| r.as_str()))
                    .bind(record.unpinned_by)
                    .bind(feedback)
                    .bind(record.pinned_at)
                    .bind(record.ended_at)
                    .bind(record.id)
                    .bind(expected_version)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() != 1 {
                        return Err(StoreError::Conflict);
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
