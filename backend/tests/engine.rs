//! End-to-end engine tests over the in-memory store with a manual clock.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use lonetown::db::{InMemoryStore, Store};
use lonetown::error::EngineError;
use lonetown::models::{
    CommunicationStyle, EmotionalIntelligence, Gender, LifeGoals, MatchEvent, MatchStatus,
    PersonalityTraits, RelationshipValues, StateTimestamps, TraitProfile, User, UserState,
};
use lonetown::services::{DailyMatchOutcome, EventSink, MatchEngine};
use lonetown::utils::ManualClock;

struct RecordingSink(Mutex<Vec<MatchEvent>>);

impl RecordingSink {
    fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    fn events(&self) -> Vec<MatchEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: MatchEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn flat_profile(value: u8) -> TraitProfile {
    TraitProfile {
        personality: PersonalityTraits {
            openness: value,
            conscientiousness: value,
            extraversion: value,
            agreeableness: value,
            neuroticism: value,
        },
        emotional_intelligence: EmotionalIntelligence {
            self_awareness: value,
            empathy: value,
            social_skills: value,
            emotional_regulation: value,
        },
        relationship_values: RelationshipValues {
            commitment: value,
            loyalty: value,
            honesty: value,
            communication: value,
            independence: value,
            affection: value,
        },
        life_goals: LifeGoals {
            career: value,
            family: value,
            personal_growth: value,
            adventure: value,
            stability: value,
        },
        communication_style: CommunicationStyle {
            directness: value,
            conflict_resolution: value,
            expressiveness: value,
            listening: value,
        },
        interests: Default::default(),
    }
}

fn make_user(n: u128, gender: Gender, interested_in: Vec<Gender>, trait_value: u8) -> User {
    User {
        id: Uuid::from_u128(n),
        name: format!("user-{n}"),
        gender,
        interested_in,
        traits: flat_profile(trait_value),
        state: UserState::Available,
        state_timestamps: StateTimestamps::default(),
        current_match_id: None,
    }
}

struct Harness {
    engine: Arc<MatchEngine>,
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
    sink: Arc<RecordingSink>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let sink = Arc::new(RecordingSink::new());
    let engine = Arc::new(MatchEngine::new(
        store.clone(),
        sink.clone(),
        clock.clone(),
    ));
    Harness {
        engine,
        store,
        clock,
        sink,
    }
}

async fn stored_user(store: &InMemoryStore, id: Uuid) -> User {
    store.user(id).await.unwrap().expect("user exists").record
}

fn created(outcome: DailyMatchOutcome) -> lonetown::models::Match {
    match outcome {
        DailyMatchOutcome::Created(record) => record,
        other => panic!("expected a newly created match, got {other:?}"),
    }
}

#[tokio::test]
async fn daily_match_pairs_best_candidate_and_flips_both_users() {
    let h = harness();
    h.store
        .add_user(make_user(1, Gender::Female, vec![Gender::Male], 5))
        .await;
    h.store
        .add_user(make_user(2, Gender::Male, vec![Gender::Female], 5))
        .await;
    // Weaker candidate: same genders, distant traits.
    h.store
        .add_user(make_user(3, Gender::Male, vec![Gender::Female], 1))
        .await;

    let record = created(h.engine.assign_daily_match(Uuid::from_u128(1)).await.unwrap());
    assert_eq!(record.status, MatchStatus::Active);
    assert_eq!(record.users, [Uuid::from_u128(1), Uuid::from_u128(2)]);
    // Flat-5 against flat-5 under the published weights.
    assert_eq!(record.compatibility_score, 74);

    for id in record.users {
        let user = stored_user(&h.store, id).await;
        assert_eq!(user.state, UserState::Matched);
        assert_eq!(user.current_match_id, Some(record.id));
        assert_eq!(user.state_timestamps.last_matched, Some(start_time()));
    }

    // Bystander untouched.
    let bystander = stored_user(&h.store, Uuid::from_u128(3)).await;
    assert_eq!(bystander.state, UserState::Available);
}

#[tokio::test]
async fn daily_match_is_idempotent_while_open() {
    let h = harness();
    h.store
        .add_user(make_user(1, Gender::Female, vec![Gender::Male], 5))
        .await;
    h.store
        .add_user(make_user(2, Gender::Male, vec![Gender::Female], 5))
        .await;

    let first = created(h.engine.assign_daily_match(Uuid::from_u128(1)).await.unwrap());
    let second = h.engine.assign_daily_match(Uuid::from_u128(1)).await.unwrap();
    let DailyMatchOutcome::Existing(existing) = second else {
        panic!("expected the existing match back");
    };
    assert_eq!(existing.id, first.id);

    // Partner's request short-circuits to the same match too.
    let partner = h.engine.assign_daily_match(Uuid::from_u128(2)).await.unwrap();
    let DailyMatchOutcome::Existing(existing) = partner else {
        panic!("expected the existing match back");
    };
    assert_eq!(existing.id, first.id);
}

#[tokio::test]
async fn empty_pool_is_a_result_not_an_error() {
    let h = harness();
    h.store
        .add_user(make_user(1, Gender::Female, vec![Gender::Male], 5))
        .await;
    // Same preferences as the seeker, so mutual interest fails both ways.
    h.store
        .add_user(make_user(2, Gender::Female, vec![Gender::Male], 5))
        .await;

    let outcome = h.engine.assign_daily_match(Uuid::from_u128(1)).await.unwrap();
    assert!(matches!(outcome, DailyMatchOutcome::NoMatchAvailable));
}

#[tokio::test]
async fn preference_filter_is_mutual() {
    let h = harness();
    h.store
        .add_user(make_user(1, Gender::Female, vec![Gender::Male], 5))
        .await;
    // Candidate matches the seeker's preference but not vice versa.
    h.store
        .add_user(make_user(2, Gender::Male, vec![Gender::NonBinary], 5))
        .await;
    // Candidate satisfying both directions.
    h.store
        .add_user(make_user(3, Gender::Male, vec![Gender::Female], 1))
        .await;

    let record = created(h.engine.assign_daily_match(Uuid::from_u128(1)).await.unwrap());
    assert_eq!(record.partner_of(Uuid::from_u128(1)), Some(Uuid::from_u128(3)));
}

#[tokio::test]
async fn frozen_user_is_refused_with_cooldown_detail() {
    let h = harness();
    let mut frozen = make_user(1, Gender::Female, vec![Gender::Male], 5);
    frozen.state = UserState::Frozen;
    let until = start_time() + Duration::hours(10);
    frozen.state_timestamps.frozen_until = Some(until);
    h.store.add_user(frozen).await;
    h.store
        .add_user(make_user(2, Gender::Male, vec![Gender::Female], 5))
        .await;

    let err = h.engine.assign_daily_match(Uuid::from_u128(1)).await.unwrap_err();
    match err {
        EngineError::NotEligible {
            state,
            frozen_until,
            ..
        } => {
            assert_eq!(state, UserState::Frozen);
            assert_eq!(frozen_until, Some(until));
        }
        other => panic!("expected NotEligible, got {other:?}"),
    }

    // The refusal must not mutate stored state.
    let stored = stored_user(&h.store, Uuid::from_u128(1)).await;
    assert_eq!(stored.state, UserState::Frozen);
}

#[tokio::test]
async fn elapsed_freeze_thaws_then_matches_in_one_call() {
    let h = harness();
    let mut frozen = make_user(1, Gender::Female, vec![Gender::Male], 5);
    frozen.state = UserState::Frozen;
    frozen.state_timestamps.frozen_until = Some(start_time() - Duration::hours(1));
    h.store.add_user(frozen).await;
    h.store
        .add_user(make_user(2, Gender::Male, vec![Gender::Female], 5))
        .await;

    let record = created(h.engine.assign_daily_match(Uuid::from_u128(1)).await.unwrap());
    let user = stored_user(&h.store, Uuid::from_u128(1)).await;
    assert_eq!(user.state, UserState::Matched);
    assert_eq!(user.current_match_id, Some(record.id));
    assert_eq!(user.state_timestamps.frozen_until, None);
    assert_eq!(user.state_timestamps.available_since, Some(start_time()));
}

#[tokio::test]
async fn pin_is_idempotent_and_promotes_on_mutual_confirmation() {
    let h = harness();
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);
    h.store.add_user(make_user(1, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(2, Gender::Male, vec![Gender::Female], 5)).await;
    let record = created(h.engine.assign_daily_match(a).await.unwrap());

    let after_first = h.engine.pin(record.id, a).await.unwrap();
    assert_eq!(after_first.status, MatchStatus::Active);
    assert_eq!(after_first.pinned_by, vec![a]);

    // Repeat pin: no double membership, no status change, no error.
    let repeat = h.engine.pin(record.id, a).await.unwrap();
    assert_eq!(repeat.pinned_by, vec![a]);
    assert_eq!(repeat.status, MatchStatus::Active);

    let promoted = h.engine.pin(record.id, b).await.unwrap();
    assert_eq!(promoted.status, MatchStatus::Pinned);
    assert_eq!(promoted.pinned_at, Some(start_time()));
    for id in [a, b] {
        let user = stored_user(&h.store, id).await;
        assert_eq!(user.state, UserState::Pinned);
        assert_eq!(user.state_timestamps.last_pinned, Some(start_time()));
    }

    // Pinning a pinned match is an invalid transition.
    let err = h.engine.pin(record.id, a).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            status: MatchStatus::Pinned,
            ..
        }
    ));
}

#[tokio::test]
async fn pin_by_non_participant_is_rejected_without_side_effects() {
    let h = harness();
    h.store.add_user(make_user(1, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(2, Gender::Male, vec![Gender::Female], 5)).await;
    h.store.add_user(make_user(3, Gender::Male, vec![Gender::Female], 5)).await;
    let record = created(h.engine.assign_daily_match(Uuid::from_u128(1)).await.unwrap());

    let stranger = record
        .partner_of(Uuid::from_u128(1))
        .map(|p| if p == Uuid::from_u128(2) { Uuid::from_u128(3) } else { Uuid::from_u128(2) })
        .unwrap();
    let err = h.engine.pin(record.id, stranger).await.unwrap_err();
    assert!(matches!(err, EngineError::NotParticipant { .. }));

    let unchanged = h.engine.current_match(Uuid::from_u128(1)).await.unwrap().unwrap();
    assert!(unchanged.pinned_by.is_empty());
}

#[tokio::test]
async fn unpin_applies_asymmetric_cooldowns() {
    let h = harness();
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);
    h.store.add_user(make_user(1, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(2, Gender::Male, vec![Gender::Female], 5)).await;
    let record = created(h.engine.assign_daily_match(a).await.unwrap());

    let outcome = h.engine.unpin(record.id, a, None).await.unwrap();
    assert_eq!(outcome.record.status, MatchStatus::Ended);
    assert_eq!(outcome.record.unpinned_by, Some(a));
    assert_eq!(outcome.frozen_until, start_time() + Duration::hours(24));
    assert_eq!(
        outcome.partner_available_from,
        start_time() + Duration::hours(2)
    );

    let initiator = stored_user(&h.store, a).await;
    assert_eq!(initiator.state, UserState::Frozen);
    assert_eq!(
        initiator.state_timestamps.frozen_until,
        Some(start_time() + Duration::hours(24))
    );
    assert_eq!(initiator.current_match_id, None);

    let partner = stored_user(&h.store, b).await;
    assert_eq!(partner.state, UserState::Available);
    assert_eq!(
        partner.state_timestamps.available_since,
        Some(start_time() + Duration::hours(2))
    );
    assert_eq!(partner.current_match_id, None);

    // Ended is terminal: a second unpin must fail without side effects.
    let err = h.engine.unpin(record.id, b, None).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            status: MatchStatus::Ended,
            ..
        }
    ));
}

#[tokio::test]
async fn grace_period_keeps_partner_out_of_the_pool() {
    let h = harness();
    let a = Uuid::from_u128(1);
    let c = Uuid::from_u128(3);
    h.store.add_user(make_user(1, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(2, Gender::Male, vec![Gender::Female], 5)).await;
    h.store.add_user(make_user(3, Gender::Female, vec![Gender::Male], 5)).await;

    let record = created(h.engine.assign_daily_match(a).await.unwrap());
    h.engine.unpin(record.id, a, None).await.unwrap();

    // Within the 2-hour grace period the freed partner is not matchable.
    let outcome = h.engine.assign_daily_match(c).await.unwrap();
    assert!(matches!(outcome, DailyMatchOutcome::NoMatchAvailable));

    h.clock.advance(Duration::hours(3));
    let record = created(h.engine.assign_daily_match(c).await.unwrap());
    assert_eq!(record.partner_of(c), Some(Uuid::from_u128(2)));
}

#[tokio::test]
async fn concurrent_assignments_never_share_a_user() {
    let h = harness();
    // Two seekers competing over the same two candidates; both prefer
    // the flat-5 candidate.
    h.store.add_user(make_user(1, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(2, Gender::Male, vec![Gender::Female], 5)).await;
    h.store.add_user(make_user(3, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(4, Gender::Male, vec![Gender::Female], 1)).await;

    let first = tokio::spawn({
        let engine = h.engine.clone();
        async move { engine.assign_daily_match(Uuid::from_u128(1)).await }
    });
    let second = tokio::spawn({
        let engine = h.engine.clone();
        async move { engine.assign_daily_match(Uuid::from_u128(3)).await }
    });

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert!(matches!(first, DailyMatchOutcome::Created(_)));
    assert!(matches!(second, DailyMatchOutcome::Created(_)));

    let open = h.store.open_matches().await;
    assert_eq!(open.len(), 2);
    let mut seen = Vec::new();
    for record in &open {
        for id in record.users {
            assert!(!seen.contains(&id), "user {id} appears in two open matches");
            seen.push(id);
        }
    }
}

#[tokio::test]
async fn video_call_unlocks_at_threshold_and_stays_unlocked() {
    let h = harness();
    let a = Uuid::from_u128(1);
    h.store.add_user(make_user(1, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(2, Gender::Male, vec![Gender::Female], 5)).await;
    let record = created(h.engine.assign_daily_match(a).await.unwrap());

    // Two early messages that will age out of the window later.
    for _ in 0..2 {
        h.engine.on_message_sent(record.id, a).await.unwrap();
    }
    h.clock.advance(Duration::hours(47));

    // Up to 99 messages inside the window: still locked.
    for _ in 0..97 {
        let status = h.engine.on_message_sent(record.id, a).await.unwrap();
        assert!(!status.video_call_unlocked);
    }

    let status = h.engine.on_message_sent(record.id, a).await.unwrap();
    assert_eq!(status.windowed_count, 100);
    assert!(status.video_call_unlocked);

    // The early messages fall out of the window; the flag never re-locks.
    h.clock.advance(Duration::hours(2));
    let status = h.engine.on_message_sent(record.id, a).await.unwrap();
    assert!(status.windowed_count < 100);
    assert!(status.video_call_unlocked);
    assert_eq!(status.message_count, 101);

    let probe = h.engine.video_call_status(record.id, a).await.unwrap();
    assert!(probe.video_call_unlocked);
}

#[tokio::test]
async fn messages_are_rejected_outside_an_open_match() {
    let h = harness();
    let a = Uuid::from_u128(1);
    h.store.add_user(make_user(1, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(2, Gender::Male, vec![Gender::Female], 5)).await;
    h.store.add_user(make_user(3, Gender::Male, vec![Gender::Female], 5)).await;
    let record = created(h.engine.assign_daily_match(a).await.unwrap());

    let stranger = if record.involves(Uuid::from_u128(2)) {
        Uuid::from_u128(3)
    } else {
        Uuid::from_u128(2)
    };
    let err = h.engine.on_message_sent(record.id, stranger).await.unwrap_err();
    assert!(matches!(err, EngineError::NotParticipant { .. }));

    h.engine.unpin(record.id, a, None).await.unwrap();
    let err = h.engine.on_message_sent(record.id, a).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn feedback_only_after_end_and_last_write_wins() {
    let h = harness();
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);
    h.store.add_user(make_user(1, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(2, Gender::Male, vec![Gender::Female], 5)).await;
    let record = created(h.engine.assign_daily_match(a).await.unwrap());

    let err = h
        .engine
        .submit_feedback(record.id, a, "too early".into(), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    h.engine.unpin(record.id, a, None).await.unwrap();

    h.engine
        .submit_feedback(record.id, a, "great conversations".into(), vec!["communication".into()])
        .await
        .unwrap();

    // The partner reads the feedback; the author does not see their own.
    let seen = h.engine.partner_feedback(record.id, b).await.unwrap().unwrap();
    assert_eq!(seen.from_user, a);
    assert_eq!(seen.content, "great conversations");
    assert!(h.engine.partner_feedback(record.id, a).await.unwrap().is_none());

    // Re-submission overwrites (documented last-write-wins policy).
    h.engine
        .submit_feedback(record.id, b, "wanted different things".into(), vec![])
        .await
        .unwrap();
    let seen = h.engine.partner_feedback(record.id, a).await.unwrap().unwrap();
    assert_eq!(seen.from_user, b);
    assert_eq!(seen.content, "wanted different things");
}

#[tokio::test]
async fn lifecycle_events_are_published_in_order() {
    let h = harness();
    let a = Uuid::from_u128(1);
    let b = Uuid::from_u128(2);
    h.store.add_user(make_user(1, Gender::Female, vec![Gender::Male], 5)).await;
    h.store.add_user(make_user(2, Gender::Male, vec![Gender::Female], 5)).await;

    let record = created(h.engine.assign_daily_match(a).await.unwrap());
    h.engine.pin(record.id, a).await.unwrap();
    h.engine.pin(record.id, b).await.unwrap();
    h.engine.unpin(record.id, b, None).await.unwrap();

    let events = h.sink.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events[0],
        MatchEvent::MatchCreated { match_id, compatibility_score: 74, .. } if match_id == record.id
    ));
    assert!(matches!(
        events[1],
        MatchEvent::MatchPinned { match_id, .. } if match_id == record.id
    ));
    assert!(matches!(
        events[2],
        MatchEvent::MatchEnded { unpinned_by: Some(initiator), .. } if initiator == b
    ));
}
