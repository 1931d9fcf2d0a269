//! The session orchestrator: loads content, tracks position through the
//! routine/step/attempt/visit hierarchy, applies the checkout rules, and
//! persists every dart and aggregate through the injected data service.
//!
//! One orchestrator instance owns one session screen's state for one run.
//! All mutating operations are user-gated by the host, so at most one is in
//! flight at a time; persistence within an operation is strictly sequential
//! because later writes read earlier ones.

use crate::checkout::{self, AttemptOutcome};
use crate::content::{DartRecord, Routine, RoutineKind, RoutineScoreRecord, StepRunAggregate};
use crate::scoring;
use crate::segment::{Segment, normalize};
use crate::service::DataService;
use crate::session::{
    EndedState, EngineError, LevelRequirements, NavTarget, ReadyState, RunningState,
    SessionGameState, Visit,
};
use std::collections::BTreeMap;

/// What `start_resume` did, so the host can message accordingly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub run_id: String,
    pub resumed: bool,
}

/// Drives one player's training session over an injected [`DataService`].
pub struct SessionOrchestrator<S: DataService> {
    service: S,
    player_id: String,
    session_id: String,
    state: SessionGameState,
    /// Bumped per `load` call so a superseded load cannot commit its result.
    load_epoch: u64,
}

impl<S: DataService> SessionOrchestrator<S> {
    /// A fresh machine in the `loading` phase; call [`Self::load`] next.
    pub fn new(service: S, player_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            service,
            player_id: player_id.into(),
            session_id: session_id.into(),
            state: SessionGameState::Loading,
            load_epoch: 0,
        }
    }

    /// Current phase, exposed read-only to the host.
    #[must_use]
    pub const fn state(&self) -> &SessionGameState {
        &self.state
    }

    /// Fetch session content and preconditions, transitioning to `ready` or
    /// `invalid`. Calling again supersedes any earlier, uncommitted load.
    pub async fn load(&mut self) {
        self.load_epoch += 1;
        let epoch = self.load_epoch;
        self.state = SessionGameState::Loading;
        let outcome = self.fetch_content().await;
        if self.load_epoch != epoch || !matches!(self.state, SessionGameState::Loading) {
            // A newer load or a machine already past loading owns the state.
            return;
        }
        self.state = match outcome {
            Ok(ready) => SessionGameState::Ready(ready),
            Err(message) => {
                log::warn!("session {} load failed: {message}", self.session_id);
                SessionGameState::Invalid { message }
            }
        };
    }

    async fn fetch_content(&self) -> Result<ReadyState, String> {
        let player = self
            .service
            .player_profile(&self.player_id)
            .await
            .map_err(|err| err.to_string())?
            .ok_or_else(|| format!("player {} not found", self.player_id))?;
        let session = self
            .service
            .session_entry(&self.session_id)
            .await
            .map_err(|err| err.to_string())?;
        if session.routine_ids.is_empty() {
            return Err(format!("session {} has no routines", session.id));
        }

        let mut routines = Vec::with_capacity(session.routine_ids.len());
        for routine_id in &session.routine_ids {
            let routine = self
                .service
                .routine_with_steps(routine_id)
                .await
                .map_err(|err| err.to_string())?;
            if routine.steps.is_empty() {
                return Err(format!("routine {} has no steps", routine.id));
            }
            routines.push(routine);
        }

        let rating = self
            .service
            .player_rating(&self.player_id)
            .await
            .map_err(|err| err.to_string())?;
        let decade = scoring::decade_of(rating);

        // The four requirement rows are independent; fetch them together.
        let (single, double, treble, checkout) = tokio::try_join!(
            self.service
                .level_requirement(decade, RoutineKind::SingleSegment),
            self.service
                .level_requirement(decade, RoutineKind::DoubleSegment),
            self.service
                .level_requirement(decade, RoutineKind::TrebleSegment),
            self.service.level_requirement(decade, RoutineKind::Checkout),
        )
        .map_err(|err| err.to_string())?;

        let resumable_run = self
            .service
            .incomplete_run(&self.player_id, &self.session_id)
            .await
            .map_err(|err| err.to_string())?;

        let needs_assessment_redirect =
            !session.is_assessment && !player.assessment_completed && !player.is_admin;

        Ok(ReadyState {
            session,
            player,
            routines,
            requirements: LevelRequirements {
                single,
                double,
                treble,
                checkout,
            },
            decade,
            resumable_run,
            needs_assessment_redirect,
        })
    }

    /// Enter `running`, reusing an unfinished run when one exists and
    /// seeding expected-success baselines for every checkout step that does
    /// not already have one. Safe to retry after a failure.
    pub async fn start_resume(&mut self) -> Result<StartOutcome, EngineError> {
        let ready = match &self.state {
            SessionGameState::Ready(ready) => ready.clone(),
            other => return Err(EngineError::WrongPhase(other.phase_name())),
        };
        if ready.needs_assessment_redirect {
            return Err(EngineError::AssessmentRequired);
        }

        // Re-query so a retry after a partial start finds the run it made.
        let existing = match ready.resumable_run.clone() {
            Some(run) => Some(run),
            None => {
                self.service
                    .incomplete_run(&self.player_id, &self.session_id)
                    .await?
            }
        };
        let resumed = existing.is_some();
        let run = match existing {
            Some(run) => run,
            None => {
                self.service
                    .create_run(&self.player_id, &self.session_id)
                    .await?
            }
        };

        // The player's level may have moved since load; baselines use the
        // current one.
        let decade = scoring::decade_of(self.service.player_rating(&self.player_id).await?);
        let any_checkout = ready.routines.iter().any(Routine::has_checkout_steps);
        if any_checkout {
            self.seed_checkout_baselines(&ready, &run.id, decade).await?;
        }

        let run_id = run.id.clone();
        log::debug!(
            "run {run_id} {} for session {}",
            if resumed { "resumed" } else { "started" },
            self.session_id
        );
        self.state = SessionGameState::Running(RunningState {
            session: ready.session,
            player: ready.player,
            routines: ready.routines,
            requirements: ready.requirements,
            run,
            decade,
            routine_index: 0,
            step_index: 0,
            attempt_index: 1,
            visit: Visit::new(),
            persisted_darts: 0,
            completed_visits: 0,
            round_scores: BTreeMap::new(),
            routine_scores: Vec::new(),
        });
        Ok(StartOutcome { run_id, resumed })
    }

    async fn seed_checkout_baselines(
        &self,
        ready: &ReadyState,
        run_id: &str,
        decade: u32,
    ) -> Result<(), EngineError> {
        let requirement = &ready.requirements.checkout;
        for routine in &ready.routines {
            for step in routine.steps.iter().filter(|s| s.kind.is_checkout()) {
                let existing = self
                    .service
                    .step_aggregate(run_id, &routine.id, step.step_no)
                    .await?;
                if existing.is_some() {
                    continue;
                }
                let expected = self
                    .service
                    .expected_successes(
                        decade,
                        step.target_value(),
                        requirement.throws_per_checkout,
                        requirement.attempt_count,
                    )
                    .await?
                    .unwrap_or_else(|| {
                        log::warn!(
                            "no expected-success entry for target {} at decade {decade}",
                            step.target
                        );
                        scoring::FALLBACK_EXPECTED
                    });
                self.service
                    .upsert_step_aggregate(&StepRunAggregate {
                        run_id: run_id.to_string(),
                        routine_id: routine.id.clone(),
                        step_no: step.step_no,
                        expected_successes: expected,
                        successes: 0,
                        score: 0.0,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    fn running_mut(&mut self) -> Result<&mut RunningState, EngineError> {
        match &mut self.state {
            SessionGameState::Running(running) => Ok(running),
            other => Err(EngineError::WrongPhase(other.phase_name())),
        }
    }

    fn running_snapshot(&self) -> Result<RunningState, EngineError> {
        match &self.state {
            SessionGameState::Running(running) => Ok(running.clone()),
            other => Err(EngineError::WrongPhase(other.phase_name())),
        }
    }

    /// Append one segment to the open visit.
    pub fn add_segment_to_visit(&mut self, segment: Segment) -> Result<(), EngineError> {
        let running = self.running_mut()?;
        if running.persisted_darts > 0 {
            return Err(EngineError::PendingSubmission);
        }
        if running.visit.len() >= running.visit_capacity() {
            return Err(EngineError::VisitFull);
        }
        running.visit.push(segment);
        Ok(())
    }

    /// Replace the open visit wholesale; this is the speech-parser path.
    pub fn set_visit_from_segments(&mut self, segments: &[Segment]) -> Result<(), EngineError> {
        let running = self.running_mut()?;
        if running.persisted_darts > 0 {
            return Err(EngineError::PendingSubmission);
        }
        if segments.len() > running.visit_capacity() {
            return Err(EngineError::VisitFull);
        }
        running.visit.clear();
        running.visit.extend_from_slice(segments);
        Ok(())
    }

    /// Discard the open visit. No-op when already empty.
    pub fn clear_visit(&mut self) -> Result<(), EngineError> {
        let running = self.running_mut()?;
        if running.persisted_darts > 0 {
            return Err(EngineError::PendingSubmission);
        }
        running.visit.clear();
        Ok(())
    }

    /// Remove the most recently entered segment. No-op on an empty visit.
    pub fn undo_last(&mut self) -> Result<(), EngineError> {
        let running = self.running_mut()?;
        if running.persisted_darts > 0 {
            return Err(EngineError::PendingSubmission);
        }
        running.visit.pop();
        Ok(())
    }

    /// Submit the open visit as one checkout attempt.
    ///
    /// Valid with the attempt's full dart allowance, or fewer darts when the
    /// rules engine confirms an early valid finish. On any persistence
    /// failure the machine stays in its pre-submission position; darts that
    /// already reached the store are remembered so a retry does not insert
    /// them again.
    pub async fn submit_visit(&mut self) -> Result<(), EngineError> {
        let snap = self.running_snapshot()?;
        let step = snap.current_step().clone();
        if !step.kind.is_checkout() {
            return Err(EngineError::WrongStepKind(step.kind));
        }
        let requirement = *snap.requirements.for_kind(RoutineKind::Checkout);
        let allowance = requirement.throws_per_checkout as usize;
        let target = step.target_value();
        let outcome = checkout::replay(target, &snap.visit);
        let early_finish = matches!(outcome, AttemptOutcome::Finished { .. });
        if snap.visit.is_empty() || (snap.visit.len() != allowance && !early_finish) {
            return Err(EngineError::IncompleteVisit);
        }

        let finish_index = checkout::finish_dart(target, &snap.visit);
        let routine = snap.current_routine();

        // One record per dart, in throw order, skipping any prefix a failed
        // earlier submission already stored.
        let mut scored = 0u32;
        for (index, &segment) in snap.visit.iter().enumerate() {
            let before = target.saturating_sub(scored);
            scored += segment.score();
            if index < snap.persisted_darts {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let position = index as u32 + 1;
            let label = self
                .service
                .recommended_segment(before, position)
                .await?
                .map_or_else(|| step.target.clone(), |seg| seg.to_string());
            self.service
                .insert_dart(&DartRecord {
                    player_id: snap.player.id.clone(),
                    run_id: snap.run.id.clone(),
                    routine_id: routine.id.clone(),
                    routine_no: routine_no(&snap),
                    step_no: step.step_no,
                    dart_no: position,
                    attempt_no: Some(snap.attempt_index),
                    target: label,
                    actual: segment,
                    hit: finish_index == Some(index),
                })
                .await?;
            self.running_mut()?.persisted_darts = index + 1;
        }

        // Fold the attempt into the per-step aggregate before any index
        // moves; routine scoring reads this record later.
        let mut aggregate = self
            .service
            .step_aggregate(&snap.run.id, &routine.id, step.step_no)
            .await?
            .unwrap_or_else(|| {
                log::warn!(
                    "missing baseline for step {} of routine {}; using fallback",
                    step.step_no,
                    routine.id
                );
                StepRunAggregate {
                    run_id: snap.run.id.clone(),
                    routine_id: routine.id.clone(),
                    step_no: step.step_no,
                    expected_successes: scoring::FALLBACK_EXPECTED,
                    successes: 0,
                    score: 0.0,
                }
            });
        if finish_index.is_some() {
            aggregate.successes += 1;
        }
        aggregate.score = scoring::step_score(aggregate.expected_successes, aggregate.successes);
        self.service.upsert_step_aggregate(&aggregate).await?;

        if snap.attempt_index < requirement.attempt_count {
            let running = self.running_mut()?;
            running.attempt_index += 1;
            running.visit.clear();
            running.persisted_darts = 0;
            return Ok(());
        }
        self.advance_past_step(&snap, None).await
    }

    /// Submit the open visit as one 3-dart accuracy round.
    pub async fn submit_current_visit(&mut self) -> Result<(), EngineError> {
        let snap = self.running_snapshot()?;
        let step = snap.current_step().clone();
        if step.kind.is_checkout() {
            return Err(EngineError::WrongStepKind(step.kind));
        }
        if snap.visit.len() != 3 {
            return Err(EngineError::IncompleteVisit);
        }
        let requirement = *snap.requirements.for_kind(step.kind);
        let target_segment = step.target_segment();
        if target_segment.is_none() {
            log::warn!(
                "accuracy step {} target {:?} is not a segment; all darts score as misses",
                step.step_no,
                step.target
            );
        }
        let routine = snap.current_routine();

        let mut hits = 0u32;
        for (index, &segment) in snap.visit.iter().enumerate() {
            let hit = target_segment == Some(segment);
            if hit {
                hits += 1;
            }
            if index < snap.persisted_darts {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let dart_no = snap.completed_visits * 3 + index as u32 + 1;
            self.service
                .insert_dart(&DartRecord {
                    player_id: snap.player.id.clone(),
                    run_id: snap.run.id.clone(),
                    routine_id: routine.id.clone(),
                    routine_no: routine_no(&snap),
                    step_no: step.step_no,
                    dart_no,
                    attempt_no: None,
                    target: normalize(&step.target),
                    actual: segment,
                    hit,
                })
                .await?;
            self.running_mut()?.persisted_darts = index + 1;
        }

        let round = if snap.session.is_assessment {
            scoring::assessment_round_score(hits, 3)
        } else {
            let expected = self
                .service
                .expected_hits(snap.decade, step.kind, 3)
                .await?
                .unwrap_or_else(|| {
                    log::warn!(
                        "no expected-hits entry for {:?} at decade {}",
                        step.kind,
                        snap.decade
                    );
                    scoring::FALLBACK_EXPECTED
                });
            scoring::round_score(hits, expected)
        };

        if snap.completed_visits + 1 < requirement.required_visits() {
            let running = self.running_mut()?;
            running
                .round_scores
                .entry(step.step_no)
                .or_default()
                .push(round);
            running.completed_visits += 1;
            running.visit.clear();
            running.persisted_darts = 0;
            return Ok(());
        }
        self.advance_past_step(&snap, Some((step.step_no, round))).await
    }

    /// Shared step/routine/session advancement. `pending_round` is an
    /// accuracy round score earned by the submission that triggered the
    /// advance but not yet folded into the snapshot's accumulators.
    async fn advance_past_step(
        &mut self,
        snap: &RunningState,
        pending_round: Option<(u32, f64)>,
    ) -> Result<(), EngineError> {
        let routine = snap.current_routine();
        if snap.step_index + 1 < routine.steps.len() {
            let running = self.running_mut()?;
            if let Some((step_no, score)) = pending_round {
                running.round_scores.entry(step_no).or_default().push(score);
            }
            running.step_index += 1;
            running.attempt_index = 1;
            running.completed_visits = 0;
            running.visit.clear();
            running.persisted_darts = 0;
            return Ok(());
        }

        // Routine complete: every step's score must exist, in step order,
        // before the routine score is computed.
        let mut step_scores = Vec::with_capacity(routine.steps.len());
        for step in &routine.steps {
            if step.kind.is_checkout() {
                let aggregate = self
                    .service
                    .step_aggregate(&snap.run.id, &routine.id, step.step_no)
                    .await?;
                let score = aggregate.map_or_else(
                    || {
                        log::warn!(
                            "no aggregate for step {} of routine {} at completion; scoring it 0",
                            step.step_no,
                            routine.id
                        );
                        0.0
                    },
                    |a| a.score,
                );
                step_scores.push(score);
            } else {
                let mut rounds = snap
                    .round_scores
                    .get(&step.step_no)
                    .cloned()
                    .unwrap_or_default();
                if let Some((step_no, score)) = pending_round
                    && step_no == step.step_no
                {
                    rounds.push(score);
                }
                step_scores.push(scoring::accuracy_step_score(&rounds));
            }
        }
        let routine_total = scoring::routine_score(&step_scores);
        self.service
            .upsert_routine_score(&RoutineScoreRecord {
                run_id: snap.run.id.clone(),
                routine_id: routine.id.clone(),
                routine_no: routine_no(snap),
                score: routine_total,
            })
            .await?;

        if snap.routine_index + 1 < snap.routines.len() {
            let running = self.running_mut()?;
            running.routine_scores.push(routine_total);
            running.routine_index += 1;
            running.step_index = 0;
            running.attempt_index = 1;
            running.completed_visits = 0;
            running.visit.clear();
            running.persisted_darts = 0;
            running.round_scores.clear();
            return Ok(());
        }

        // Session complete: every routine score exists, so the session
        // score may be computed and the run closed out.
        let mut routine_scores = snap.routine_scores.clone();
        routine_scores.push(routine_total);
        let session_total = scoring::session_score(&routine_scores);
        self.service.complete_run(&snap.run.id, session_total).await?;
        if let Some(schedule_id) = &snap.session.schedule_id {
            self.service.complete_schedule_entry(schedule_id).await?;
        }
        if snap.session.is_assessment {
            self.service
                .complete_assessment(&snap.player.id, &snap.run.id)
                .await?;
        } else {
            self.service
                .trigger_rating_progression(&snap.player.id, &snap.run.id)
                .await?;
        }
        log::debug!(
            "run {} ended with session score {session_total:.1}",
            snap.run.id
        );
        self.state = SessionGameState::Ended(EndedState {
            run_id: snap.run.id.clone(),
            session_score: session_total,
            routine_scores,
            schedule_id: snap.session.schedule_id.clone(),
        });
        Ok(())
    }

    /// Where "back" should take the host from the current phase.
    #[must_use]
    pub fn back_target(&self) -> NavTarget {
        let schedule_id = match &self.state {
            SessionGameState::Ready(ready) => ready.session.schedule_id.clone(),
            SessionGameState::Running(running) => running.session.schedule_id.clone(),
            SessionGameState::Ended(ended) => ended.schedule_id.clone(),
            SessionGameState::Loading | SessionGameState::Invalid { .. } => None,
        };
        schedule_id.map_or(NavTarget::SessionList, |schedule_id| NavTarget::Schedule {
            schedule_id,
        })
    }

    /// The run-summary target, once a run exists.
    #[must_use]
    pub fn summary_target(&self) -> Option<NavTarget> {
        match &self.state {
            SessionGameState::Running(running) => Some(NavTarget::RunSummary {
                run_id: running.run.id.clone(),
            }),
            SessionGameState::Ended(ended) => Some(NavTarget::RunSummary {
                run_id: ended.run_id.clone(),
            }),
            _ => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn routine_no(snap: &RunningState) -> u32 {
    snap.routine_index as u32 + 1
}
