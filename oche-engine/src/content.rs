//! Reference content and persisted record types owned by the external
//! platform; this crate only reads and writes them through the data service.

use crate::checkout;
use crate::segment::Segment;
use serde::{Deserialize, Serialize};

/// Drill family of a routine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    SingleSegment,
    DoubleSegment,
    TrebleSegment,
    Checkout,
}

impl RoutineKind {
    /// All kinds, in the order level requirements are fetched.
    pub const ALL: [Self; 4] = [
        Self::SingleSegment,
        Self::DoubleSegment,
        Self::TrebleSegment,
        Self::Checkout,
    ];

    /// Whether steps of this kind throw at a numeric checkout target.
    #[must_use]
    pub const fn is_checkout(self) -> bool {
        matches!(self, Self::Checkout)
    }
}

/// One ordered element of a routine.
///
/// `target` is a segment code for accuracy drills and a numeric string for
/// checkout drills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineStep {
    pub step_no: u32,
    pub target: String,
    pub kind: RoutineKind,
}

impl RoutineStep {
    /// The accuracy target as a typed segment, when it parses as one.
    #[must_use]
    pub fn target_segment(&self) -> Option<Segment> {
        Segment::parse(&self.target)
    }

    /// The checkout target value; malformed content degrades to 0.
    #[must_use]
    pub fn target_value(&self) -> u32 {
        checkout::parse_target(&self.target)
    }
}

/// An ordered, non-empty practice drill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<RoutineStep>,
}

impl Routine {
    /// Whether any step in the routine is a checkout drill.
    #[must_use]
    pub fn has_checkout_steps(&self) -> bool {
        self.steps.iter().any(|step| step.kind.is_checkout())
    }
}

/// Per-skill-decade configuration for one routine kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRequirement {
    pub decade: u32,
    pub kind: RoutineKind,
    /// Total darts thrown at one accuracy step.
    pub darts_per_attempt: u32,
    /// Hits required to pass the step at this level.
    pub target_hit_count: u32,
    /// Checkout attempts per step.
    pub attempt_count: u32,
    /// Darts allowed per checkout attempt.
    pub throws_per_checkout: u32,
}

impl LevelRequirement {
    /// Number of 3-dart visits needed to cover an accuracy step.
    #[must_use]
    pub const fn required_visits(&self) -> u32 {
        self.darts_per_attempt.div_ceil(3)
    }
}

/// A scheduled (or ad-hoc) training session as the calendar knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: String,
    pub name: String,
    pub routine_ids: Vec<String>,
    /// Present when the session originates from a schedule entry.
    #[serde(default)]
    pub schedule_id: Option<String>,
    /// Initial-assessment sessions score by straight hit rate and complete
    /// the player's assessment instead of progressing their rating.
    #[serde(default)]
    pub is_assessment: bool,
}

/// The slice of a player the engine needs; auth and roles live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub assessment_completed: bool,
    #[serde(default)]
    pub is_admin: bool,
}

/// One execution of a session by a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub player_id: String,
    pub session_id: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub session_score: Option<f64>,
}

/// Append-only record of a single thrown dart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DartRecord {
    pub player_id: String,
    pub run_id: String,
    pub routine_id: String,
    pub routine_no: u32,
    pub step_no: u32,
    /// Strictly increasing within a step (accuracy) or attempt (checkout).
    pub dart_no: u32,
    #[serde(default)]
    pub attempt_no: Option<u32>,
    /// Label of what the dart was aimed at; for checkout darts this is the
    /// recommended-segment lookup result, display-only.
    pub target: String,
    pub actual: Segment,
    pub hit: bool,
}

/// Per-step running aggregate for checkout steps: the expected-success
/// baseline written at run start, plus cumulative results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRunAggregate {
    pub run_id: String,
    pub routine_id: String,
    pub step_no: u32,
    pub expected_successes: f64,
    pub successes: u32,
    pub score: f64,
}

/// One routine's aggregate score within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineScoreRecord {
    pub run_id: String,
    pub routine_id: String,
    pub routine_no: u32,
    pub score: f64,
}
