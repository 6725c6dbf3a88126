// =============================================================================
// Lone Town Backend Constants
// =============================================================================
// This file contains all tunables used throughout the backend to enable
// easy adjustment from a single location.

// =============================================================================
// COMPATIBILITY WEIGHTS (must sum to 1.0)
// =============================================================================

pub const WEIGHT_PERSONALITY: f64 = 0.25;
pub const WEIGHT_EMOTIONAL_INTELLIGENCE: f64 = 0.20;
pub const WEIGHT_RELATIONSHIP_VALUES: f64 = 0.25;
pub const WEIGHT_LIFE_GOALS: f64 = 0.15;
pub const WEIGHT_COMMUNICATION_STYLE: f64 = 0.10;
pub const WEIGHT_INTERESTS: f64 = 0.05;

// =============================================================================
// TRAIT SCALE
// =============================================================================

/// Lowest value on the questionnaire scale
pub const TRAIT_SCALE_MIN: u8 = 1;

/// Highest value on the questionnaire scale
pub const TRAIT_SCALE_MAX: u8 = 10;

// =============================================================================
// LIFECYCLE COOLDOWNS
// =============================================================================

/// Reflection freeze applied to the user who unpins a match
pub const UNPIN_FREEZE_HOURS: i64 = 24;

/// Grace period before the other party re-enters the candidate pool
pub const PARTNER_GRACE_HOURS: i64 = 2;

// =============================================================================
// ENGAGEMENT / VIDEO CALL MILESTONE
// =============================================================================

/// Sliding window over which message volume is measured
pub const ENGAGEMENT_WINDOW_HOURS: i64 = 48;

/// Messages inside the window required to unlock video calling
pub const VIDEO_CALL_MESSAGE_THRESHOLD: i64 = 100;

// =============================================================================
// MATCHMAKER
// =============================================================================

/// Total attempts for an assignment that keeps losing its commit race
/// (one retry after the first conflict, per the recovery policy)
pub const ASSIGNMENT_ATTEMPTS: u32 = 2;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;
