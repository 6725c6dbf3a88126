use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Commit, MatchWrite, Store, StoreError, Versioned};
use crate::models::{Match, User};

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<Uuid, Versioned<User>>,
    matches: BTreeMap<Uuid, Versioned<Match>>,
    messages: BTreeMap<Uuid, Vec<DateTime<Utc>>>,
}

/// Versioned in-memory store. One mutex guards all three tables, which makes
/// every `commit` trivially atomic; version checks still run so the engine's
/// conflict handling is exercised the same way as against Postgres. BTreeMap
/// keys give the candidate pool a stable iteration order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user record at version 0. Not part of the `Store` contract;
    /// profile creation is owned externally.
    pub async fn add_user(&self, user: User) {
        let mut inner = self.inner.lock().await;
        inner.users.insert(
            user.id,
            Versioned {
                record: user,
                version: 0,
            },
        );
    }

    /// All matches currently active or pinned, for invariant checks.
    pub async fn open_matches(&self) -> Vec<Match> {
        let inner = self.inner.lock().await;
        inner
            .matches
            .values()
            .filter(|v| v.record.is_open())
            .map(|v| v.record.clone())
            .collect()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn user(&self, id: Uuid) -> Result<Option<Versioned<User>>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn match_record(&self, id: Uuid) -> Result<Option<Versioned<Match>>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.matches.get(&id).cloned())
    }

    async fn open_match_for(&self, user_id: Uuid) -> Result<Option<Match>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .matches
            .values()
            .find(|v| v.record.is_open() && v.record.involves(user_id))
            .map(|v| v.record.clone()))
    }

    async fn ended_matches_for(&self, user_id: Uuid) -> Result<Vec<Match>, StoreError> {
        let inner = self.inner.lock().await;
        let mut ended: Vec<Match> = inner
            .matches
            .values()
            .filter(|v| !v.record.is_open() && v.record.involves(user_id))
            .map(|v| v.record.clone())
            .collect();
        ended.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        Ok(ended)
    }

    async fn find_eligible(
        &self,
        seeker: &User,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .map(|v| &v.record)
            .filter(|u| {
                u.id != seeker.id && u.eligible_for_matching(now) && seeker.mutually_interested(u)
            })
            .cloned()
            .collect())
    }

    async fn record_message(
        &self,
        match_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.messages.entry(match_id).or_default().push(sent_at);
        Ok(())
    }

    async fn count_messages_since(
        &self,
        match_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .messages
            .get(&match_id)
            .map(|log| log.iter().filter(|t| **t >= since).count() as i64)
            .unwrap_or(0))
    }

    async fn commit(&self, commit: Commit) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;

        // Validate every expected version before touching anything.
        for write in &commit.users {
            match inner.users.get(&write.user.id) {
                Some(current) if current.version == write.expected_version => {}
                _ => return Err(StoreError::Conflict),
            }
        }
        for write in &commit.matches {
            match write {
                MatchWrite::Insert(record) => {
                    if inner.matches.contains_key(&record.id) {
                        return Err(StoreError::Conflict);
                    }
                }
                MatchWrite::Update {
                    expected_version,
                    record,
                } => match inner.matches.get(&record.id) {
                    Some(current) if current.version == *expected_version => {}
                    _ => return Err(StoreError::Conflict),
                },
            }
        }

        for write in commit.users {
            inner.users.insert(
                write.user.id,
                Versioned {
                    record: write.user,
                    version: write.expected_version + 1,
                },
            );
        }
        for write in commit.matches {
            match write {
                MatchWrite::Insert(record) => {
                    inner.matches.insert(
                        record.id,
                        Versioned {
                            record,
                            version: 0,
                        },
                    );
                }
                MatchWrite::Update {
                    expected_version,
                    record,
                } => {
                    inner.matches.insert(
                        record.id,
                        Versioned {
                            record,
                            version: expected_version + 1,
                        },
                    );
                }
            }
        }

        Ok(())
    }
}
