//! Async boundary to the platform's remote data and content service.
//!
//! Transport is a host concern; implementations may be REST, in-memory, or
//! anything else. Every call is a suspension point for the orchestrator.

use crate::content::{
    DartRecord, LevelRequirement, PlayerProfile, Routine, RoutineKind, RoutineScoreRecord,
    RunRecord, SessionEntry, StepRunAggregate,
};
use crate::segment::Segment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable classification of a data-service failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataErrorCode {
    NotFound,
    Conflict,
}

/// Failure reported by the external data service, carrying a human-readable
/// message and an optional machine code.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DataError {
    pub message: String,
    pub code: Option<DataErrorCode>,
}

impl DataError {
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(DataErrorCode::NotFound),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(DataErrorCode::Conflict),
        }
    }

    /// An opaque failure with no machine code.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == Some(DataErrorCode::NotFound)
    }
}

impl From<anyhow::Error> for DataError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(err.to_string())
    }
}

pub type DataResult<T> = Result<T, DataError>;

/// Operations the engine consumes from the platform.
///
/// Futures are `?Send` so wasm hosts can implement the trait over
/// browser-bound transports.
#[async_trait(?Send)]
pub trait DataService {
    // Content reads.
    async fn routine_with_steps(&self, routine_id: &str) -> DataResult<Routine>;
    async fn level_requirement(&self, decade: u32, kind: RoutineKind)
    -> DataResult<LevelRequirement>;
    async fn session_entry(&self, session_id: &str) -> DataResult<SessionEntry>;
    async fn player_sessions(&self, player_id: &str) -> DataResult<Vec<SessionEntry>>;
    async fn player_profile(&self, player_id: &str) -> DataResult<Option<PlayerProfile>>;
    /// The player's current skill rating (tier), resolved fresh per lookup.
    async fn player_rating(&self, player_id: &str) -> DataResult<u32>;
    async fn incomplete_run(&self, player_id: &str, session_id: &str)
    -> DataResult<Option<RunRecord>>;
    async fn create_run(&self, player_id: &str, session_id: &str) -> DataResult<RunRecord>;

    // Expectation lookups.
    /// Expected hits for an accuracy round at this level, `None` when the
    /// reference table has no entry.
    async fn expected_hits(
        &self,
        decade: u32,
        kind: RoutineKind,
        darts: u32,
    ) -> DataResult<Option<f64>>;
    /// Expected successful finishes for a checkout step at this level.
    async fn expected_successes(
        &self,
        decade: u32,
        target: u32,
        throws_per_attempt: u32,
        attempts: u32,
    ) -> DataResult<Option<f64>>;
    /// Recommended segment for a remaining score and dart position; used
    /// only as the persisted target label on checkout darts.
    async fn recommended_segment(&self, remaining: u32, dart_pos: u32)
    -> DataResult<Option<Segment>>;

    // Writes.
    async fn insert_dart(&self, dart: &DartRecord) -> DataResult<()>;
    async fn step_aggregate(
        &self,
        run_id: &str,
        routine_id: &str,
        step_no: u32,
    ) -> DataResult<Option<StepRunAggregate>>;
    async fn upsert_step_aggregate(&self, aggregate: &StepRunAggregate) -> DataResult<()>;
    async fn upsert_routine_score(&self, record: &RoutineScoreRecord) -> DataResult<()>;
    async fn complete_run(&self, run_id: &str, session_score: f64) -> DataResult<()>;
    async fn complete_schedule_entry(&self, schedule_id: &str) -> DataResult<()>;

    // Post-processing triggers, mutually exclusive per run.
    async fn trigger_rating_progression(&self, player_id: &str, run_id: &str) -> DataResult<()>;
    async fn complete_assessment(&self, player_id: &str, run_id: &str) -> DataResult<()>;
}
