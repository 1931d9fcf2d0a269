//! Oche Training Engine
//!
//! Platform-agnostic core of the Oche darts-training platform: the
//! session-scoring state machine, double-out checkout rules, performance
//! normalization, and spoken dart-call parsing. This crate has no UI or
//! transport dependencies; hosts inject a [`DataService`] implementation
//! and render the exposed [`SessionGameState`].

pub mod checkout;
pub mod content;
pub mod scoring;
pub mod segment;
pub mod service;
pub mod session;
pub mod speech;

// Re-export commonly used types
pub use checkout::{AttemptOutcome, BustReason, bust_reason, finish_dart, remaining, replay};
pub use content::{
    DartRecord, LevelRequirement, PlayerProfile, Routine, RoutineKind, RoutineScoreRecord,
    RoutineStep, RunRecord, SessionEntry, StepRunAggregate,
};
pub use scoring::{
    accuracy_step_score, assessment_round_score, decade_of, round_score, routine_score,
    session_score, step_score,
};
pub use segment::{ParseSegmentError, Segment, normalize, score_of};
pub use service::{DataError, DataErrorCode, DataResult, DataService};
pub use session::{
    EndedState, EngineError, LevelRequirements, NavTarget, ReadyState, RunningState,
    SessionGameState, SessionOrchestrator, StartOutcome, Visit,
};
pub use speech::parse_transcript;
