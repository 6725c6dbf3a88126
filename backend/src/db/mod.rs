pub mod connection;
pub mod memory;
pub mod migrations;
pub mod postgres;

pub use connection::{DatabaseConfig, get_db_pool};
pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Match, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record changed between read and commit. The caller re-runs its
    /// read-decide-write cycle.
    #[error("write conflict detected")]
    Conflict,

    #[error("corrupt record in store: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Decode(err.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// A record together with the version it was read at. Commits name the
/// version they observed; a mismatch at commit time means another writer
/// got there first.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub record: T,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct UserWrite {
    pub expected_version: i64,
    pub user: User,
}

#[derive(Debug, Clone)]
pub enum MatchWrite {
    Insert(Match),
    Update { expected_version: i64, record: Match },
}

/// A multi-record mutation applied all-or-nothing. Partial application is a
/// correctness violation, so the store either applies every write (bumping
/// each version) or rejects the whole batch with `Conflict`.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    pub users: Vec<UserWrite>,
    pub matches: Vec<MatchWrite>,
}

impl Commit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_user(mut self, user: User, expected_version: i64) -> Self {
        self.users.push(UserWrite {
            expected_version,
            user,
        });
        self
    }

    pub fn insert_match(mut self, record: Match) -> Self {
        self.matches.push(MatchWrite::Insert(record));
        self
    }

    pub fn update_match(mut self, record: Match, expected_version: i64) -> Self {
        self.matches.push(MatchWrite::Update {
            expected_version,
            record,
        });
        self
    }
}

/// Transactional record store the engine is constructed with. Implementors
/// must make `commit` atomic and version-checked; everything else is plain
/// reads (candidate pool freshness is best-effort, final correctness comes
/// from the commit).
#[async_trait]
pub trait Store: Send + Sync {
    async fn user(&self, id: Uuid) -> Result<Option<Versioned<User>>, StoreError>;

    async fn match_record(&self, id: Uuid) -> Result<Option<Versioned<Match>>, StoreError>;

    /// The user's match with status active or pinned, if any.
    async fn open_match_for(&self, user_id: Uuid) -> Result<Option<Match>, StoreError>;

    /// Ended matches, newest first.
    async fn ended_matches_for(&self, user_id: Uuid) -> Result<Vec<Match>, StoreError>;

    /// Candidate pool query: available users (grace period elapsed) that
    /// mutually satisfy gender preferences, excluding the seeker. Iteration
    /// order must be stable so the tie-break is deterministic.
    async fn find_eligible(&self, seeker: &User, now: DateTime<Utc>)
    -> Result<Vec<User>, StoreError>;

    /// Append one message timestamp to the match's message log.
    async fn record_message(&self, match_id: Uuid, sent_at: DateTime<Utc>)
    -> Result<(), StoreError>;

    /// Messages exchanged within the match since `since`. Snapshot read; may
    /// trail the latest write.
    async fn count_messages_since(
        &self,
        match_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    async fn commit(&self, commit: Commit) -> Result<(), StoreError>;
}
