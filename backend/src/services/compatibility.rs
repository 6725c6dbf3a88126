//! Deep compatibility scoring.
//!
//! Each of the 24 scaled traits is designated at design time as either
//! similarity-scored (closer is better) or complementary-scored (opposites
//! attract). Category scores are unweighted means of their traits; the
//! interests category is the Jaccard index of the two interest sets. The six
//! categories combine through a fixed weight vector summing to 1.0.
//!
//! Sub-scores are rounded independently of the total, so the displayed total
//! can differ by +-1 from recomputing the weighted sum of the rounded
//! factors. That is an accepted display artifact.

use std::collections::BTreeSet;

use crate::constants::*;
use crate::models::{CompatibilityFactors, TraitProfile, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitKind {
    Similarity,
    Complementary,
}

use TraitKind::{Complementary, Similarity};

const PERSONALITY_KINDS: [TraitKind; 5] = [
    Similarity,    // openness
    Similarity,    // conscientiousness
    Complementary, // extraversion
    Similarity,    // agreeableness
    Complementary, // neuroticism
];

const EMOTIONAL_INTELLIGENCE_KINDS: [TraitKind; 4] = [
    Similarity, // self_awareness
    Similarity, // empathy
    Similarity, // social_skills
    Similarity, // emotional_regulation
];

const RELATIONSHIP_VALUES_KINDS: [TraitKind; 6] = [
    Similarity, // commitment
    Similarity, // loyalty
    Similarity, // honesty
    Similarity, // communication
    Similarity, // independence
    Similarity, // affection
];

const LIFE_GOALS_KINDS: [TraitKind; 5] = [
    Similarity,    // career
    Similarity,    // family
    Similarity,    // personal_growth
    Complementary, // adventure
    Complementary, // stability
];

const COMMUNICATION_STYLE_KINDS: [TraitKind; 4] = [
    Complementary, // directness
    Similarity,    // conflict_resolution
    Complementary, // expressiveness
    Similarity,    // listening
];

/// Result of scoring one pair: the weighted total and the per-category
/// breakdown, both on a 0-100 integer scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compatibility {
    pub score: u8,
    pub factors: CompatibilityFactors,
}

/// Affinity of a single trait pair on a 0-1 scale. Values are normalized
/// from the 1-10 questionnaire scale before comparison.
pub fn trait_affinity(a: u8, b: u8, kind: TraitKind) -> f64 {
    let normalize = |v: u8| ((f64::from(v) - 1.0) / 9.0).clamp(0.0, 1.0);
    let delta = (normalize(a) - normalize(b)).abs();
    match kind {
        TraitKind::Similarity => 1.0 - delta,
        TraitKind::Complementary => delta,
    }
}

fn category_affinity(a: &[u8], b: &[u8], kinds: &[TraitKind]) -> f64 {
    debug_assert_eq!(a.len(), kinds.len());
    debug_assert_eq!(b.len(), kinds.len());
    let total: f64 = a
        .iter()
        .zip(b)
        .zip(kinds)
        .map(|((&va, &vb), &kind)| trait_affinity(va, vb, kind))
        .sum();
    total / kinds.len() as f64
}

/// Jaccard index of the two interest sets; 0 when both are empty.
pub fn interests_affinity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn to_percent(affinity: f64) -> u8 {
    (affinity * 100.0).round() as u8
}

/// Score a pair of trait profiles. Pure; order of arguments does not matter.
pub fn score_pair(a: &TraitProfile, b: &TraitProfile) -> Compatibility {
    let personality = category_affinity(
        &[
            a.personality.openness,
            a.personality.conscientiousness,
            a.personality.extraversion,
            a.personality.agreeableness,
            a.personality.neuroticism,
        ],
        &[
            b.personality.openness,
            b.personality.conscientiousness,
            b.personality.extraversion,
            b.personality.agreeableness,
            b.personality.neuroticism,
        ],
        &PERSONALITY_KINDS,
    );

    let emotional_intelligence = category_affinity(
        &[
            a.emotional_intelligence.self_awareness,
            a.emotional_intelligence.empathy,
            a.emotional_intelligence.social_skills,
            a.emotional_intelligence.emotional_regulation,
        ],
        &[
            b.emotional_intelligence.self_awareness,
            b.emotional_intelligence.empathy,
            b.emotional_intelligence.social_skills,
            b.emotional_intelligence.emotional_regulation,
        ],
        &EMOTIONAL_INTELLIGENCE_KINDS,
    );

    let relationship_values = category_affinity(
        &[
            a.relationship_values.commitment,
            a.relationship_values.loyalty,
            a.relationship_values.honesty,
            a.relationship_values.communication,
            a.relationship_values.independence,
            a.relationship_values.affection,
        ],
        &[
            b.relationship_values.commitment,
            b.relationship_values.loyalty,
            b.relationship_values.honesty,
            b.relationship_values.communication,
            b.relationship_values.independence,
            b.relationship_values.affection,
        ],
        &RELATIONSHIP_VALUES_KINDS,
    );

    let life_goals = category_affinity(
        &[
            a.life_goals.career,
            a.life_goals.family,
            a.life_goals.personal_growth,
            a.life_goals.adventure,
            a.life_goals.stability,
        ],
        &[
            b.life_goals.career,
            b.life_goals.family,
            b.life_goals.personal_growth,
            b.life_goals.adventure,
            b.life_goals.stability,
        ],
        &LIFE_GOALS_KINDS,
    );

    let communication_style = category_affinity(
        &[
            a.communication_style.directness,
            a.communication_style.conflict_resolution,
            a.communication_style.expressiveness,
            a.communication_style.listening,
        ],
        &[
            b.communication_style.directness,
            b.communication_style.conflict_resolution,
            b.communication_style.expressiveness,
            b.communication_style.listening,
        ],
        &COMMUNICATION_STYLE_KINDS,
    );

    let interests = interests_affinity(&a.interests, &b.interests);

    let total = personality * WEIGHT_PERSONALITY
        + emotional_intelligence * WEIGHT_EMOTIONAL_INTELLIGENCE
        + relationship_values * WEIGHT_RELATIONSHIP_VALUES
        + life_goals * WEIGHT_LIFE_GOALS
        + communication_style * WEIGHT_COMMUNICATION_STYLE
        + interests * WEIGHT_INTERESTS;

    Compatibility {
        score: to_percent(total),
        factors: CompatibilityFactors {
            personality: to_percent(personality),
            emotional_intelligence: to_percent(emotional_intelligence),
            relationship_values: to_percent(relationship_values),
            life_goals: to_percent(life_goals),
            communication_style: to_percent(communication_style),
            interests: to_percent(interests),
        },
    }
}

/// Pick the candidate with the strictly highest total score. Ties keep the
/// first candidate seen in pool iteration order; this is an explicit,
/// low-stakes convention, not a fairness guarantee.
pub fn best_candidate<'a>(seeker: &User, pool: &'a [User]) -> Option<(&'a User, Compatibility)> {
    let mut best: Option<(&User, Compatibility)> = None;
    for candidate in pool {
        let compatibility = score_pair(&seeker.traits, &candidate.traits);
        match &best {
            Some((_, current)) if compatibility.score <= current.score => {}
            _ => best = Some((candidate, compatibility)),
        }
    }
    best
}
