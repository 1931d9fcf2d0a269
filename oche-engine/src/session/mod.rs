//! Training-run state machine: phase types and the orchestrator driving them.

use crate::content::{
    LevelRequirement, PlayerProfile, Routine, RoutineKind, RoutineStep, RunRecord, SessionEntry,
};
use crate::segment::Segment;
use crate::service::DataError;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod orchestrator;
pub use orchestrator::{SessionOrchestrator, StartOutcome};

/// Darts entered but not yet submitted; at most the step's allowance, and
/// for accuracy steps at most 3.
pub type Visit = SmallVec<[Segment; 3]>;

/// Resolved level requirements for every routine kind at one decade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelRequirements {
    pub single: LevelRequirement,
    pub double: LevelRequirement,
    pub treble: LevelRequirement,
    pub checkout: LevelRequirement,
}

impl LevelRequirements {
    /// Requirement row for a routine kind.
    #[must_use]
    pub const fn for_kind(&self, kind: RoutineKind) -> &LevelRequirement {
        match kind {
            RoutineKind::SingleSegment => &self.single,
            RoutineKind::DoubleSegment => &self.double,
            RoutineKind::TrebleSegment => &self.treble,
            RoutineKind::Checkout => &self.checkout,
        }
    }
}

/// Content and preconditions resolved by a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyState {
    pub session: SessionEntry,
    pub player: PlayerProfile,
    pub routines: Vec<Routine>,
    pub requirements: LevelRequirements,
    /// Skill decade the requirements were resolved for.
    pub decade: u32,
    /// An unfinished run of this session by this player, if one exists.
    pub resumable_run: Option<RunRecord>,
    /// Set when the player must complete their initial assessment before
    /// entering a regular training session.
    pub needs_assessment_redirect: bool,
}

/// Mutable position and accumulators of a run in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningState {
    pub session: SessionEntry,
    pub player: PlayerProfile,
    pub routines: Vec<Routine>,
    pub requirements: LevelRequirements,
    pub run: RunRecord,
    pub decade: u32,
    /// Index into `routines`; monotonically non-decreasing.
    pub routine_index: usize,
    /// Index into the current routine's steps; monotonically non-decreasing.
    pub step_index: usize,
    /// 1-based attempt counter for checkout steps.
    pub attempt_index: u32,
    pub visit: Visit,
    /// Leading darts of `visit` already stored by an interrupted
    /// submission; a retry resumes after them. Zero outside that window.
    pub persisted_darts: usize,
    /// Completed 3-dart visits within the current accuracy step.
    pub completed_visits: u32,
    /// Accuracy round scores of the current routine, keyed by step number.
    pub round_scores: BTreeMap<u32, Vec<f64>>,
    /// Scores of routines completed so far in this run, in routine order.
    pub routine_scores: Vec<f64>,
}

impl RunningState {
    /// The routine currently being played.
    #[must_use]
    pub fn current_routine(&self) -> &Routine {
        &self.routines[self.routine_index]
    }

    /// The step currently being played.
    #[must_use]
    pub fn current_step(&self) -> &RoutineStep {
        &self.current_routine().steps[self.step_index]
    }

    /// Level requirement for the current step's kind.
    #[must_use]
    pub fn current_requirement(&self) -> &LevelRequirement {
        self.requirements.for_kind(self.current_step().kind)
    }

    /// Darts the open visit may still accept. Checkout visits run to the
    /// full per-attempt allowance; accuracy visits cap at 3.
    #[must_use]
    pub fn visit_capacity(&self) -> usize {
        let requirement = self.current_requirement();
        let cap = if self.current_step().kind.is_checkout() {
            requirement.throws_per_checkout
        } else {
            3
        };
        cap as usize
    }
}

/// Final scores of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct EndedState {
    pub run_id: String,
    pub session_score: f64,
    /// Per-routine scores in routine order.
    pub routine_scores: Vec<f64>,
    pub schedule_id: Option<String>,
}

/// Tagged phase of one session screen; each variant carries only the fields
/// meaningful in that phase. `Invalid` and `Ended` are terminal for the run.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionGameState {
    Loading,
    Invalid { message: String },
    Ready(ReadyState),
    Running(RunningState),
    Ended(EndedState),
}

impl SessionGameState {
    /// Short tag for logging.
    #[must_use]
    pub const fn phase_name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Invalid { .. } => "invalid",
            Self::Ready(_) => "ready",
            Self::Running(_) => "running",
            Self::Ended(_) => "ended",
        }
    }
}

/// Where the host should navigate for "back" and "summary".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    SessionList,
    Schedule { schedule_id: String },
    RunSummary { run_id: String },
}

/// Errors surfaced to the host by orchestrator actions.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The player must complete their initial assessment first; the host
    /// should redirect to the assessment flow.
    #[error("initial assessment required before training sessions")]
    AssessmentRequired,
    /// The requested action is not valid in the current phase.
    #[error("action not available in the {0} phase")]
    WrongPhase(&'static str),
    /// The open visit already holds its full dart allowance.
    #[error("the visit is already full")]
    VisitFull,
    /// The visit cannot be submitted yet (wrong dart count, no early finish).
    #[error("the visit is not ready to submit")]
    IncompleteVisit,
    /// Part of the open visit was already stored by an interrupted
    /// submission; retry the submission instead of editing the visit.
    #[error("a partially stored visit can only be retried")]
    PendingSubmission,
    /// The submission does not match the current step's kind.
    #[error("the current step is a {0:?} step")]
    WrongStepKind(RoutineKind),
    /// A data-service call failed; the submission did not advance and may
    /// be retried.
    #[error(transparent)]
    Data(#[from] DataError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement(kind: RoutineKind) -> LevelRequirement {
        LevelRequirement {
            decade: 40,
            kind,
            darts_per_attempt: 9,
            target_hit_count: 3,
            attempt_count: 3,
            throws_per_checkout: 3,
        }
    }

    fn requirements() -> LevelRequirements {
        LevelRequirements {
            single: requirement(RoutineKind::SingleSegment),
            double: requirement(RoutineKind::DoubleSegment),
            treble: requirement(RoutineKind::TrebleSegment),
            checkout: LevelRequirement {
                throws_per_checkout: 6,
                ..requirement(RoutineKind::Checkout)
            },
        }
    }

    fn running(kind: RoutineKind, target: &str) -> RunningState {
        RunningState {
            session: SessionEntry {
                id: "sess-1".into(),
                name: "Tuesday trebles".into(),
                routine_ids: vec!["rt-1".into()],
                schedule_id: None,
                is_assessment: false,
            },
            player: PlayerProfile {
                id: "pl-1".into(),
                name: "Avery".into(),
                assessment_completed: true,
                is_admin: false,
            },
            routines: vec![Routine {
                id: "rt-1".into(),
                name: "Drill".into(),
                steps: vec![RoutineStep {
                    step_no: 1,
                    target: target.into(),
                    kind,
                }],
            }],
            requirements: requirements(),
            run: RunRecord {
                id: "run-1".into(),
                player_id: "pl-1".into(),
                session_id: "sess-1".into(),
                completed: false,
                session_score: None,
            },
            decade: 40,
            routine_index: 0,
            step_index: 0,
            attempt_index: 1,
            visit: Visit::new(),
            persisted_darts: 0,
            completed_visits: 0,
            round_scores: BTreeMap::new(),
            routine_scores: Vec::new(),
        }
    }

    #[test]
    fn accuracy_visits_cap_at_three_darts() {
        let state = running(RoutineKind::SingleSegment, "S20");
        assert_eq!(state.visit_capacity(), 3);
    }

    #[test]
    fn checkout_visits_run_to_the_attempt_allowance() {
        let state = running(RoutineKind::Checkout, "61");
        assert_eq!(state.visit_capacity(), 6);
    }

    #[test]
    fn requirements_select_by_kind() {
        let reqs = requirements();
        assert_eq!(reqs.for_kind(RoutineKind::Checkout).throws_per_checkout, 6);
        assert_eq!(
            reqs.for_kind(RoutineKind::TrebleSegment).kind,
            RoutineKind::TrebleSegment
        );
    }

    #[test]
    fn phase_names_are_stable() {
        assert_eq!(SessionGameState::Loading.phase_name(), "loading");
        assert_eq!(
            SessionGameState::Invalid {
                message: "x".into()
            }
            .phase_name(),
            "invalid"
        );
    }
}
