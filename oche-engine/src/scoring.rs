//! Normalizes raw hit and finish counts into percentages comparable across
//! skill levels, and aggregates step, routine, and session scores.

/// Conservative stand-in when an expectation lookup has no data for the
/// player's level; never blocks scoring.
pub const FALLBACK_EXPECTED: f64 = 1.0;

/// Score one 3-dart round against the hit count statistically expected for
/// the player's level. Monotonically increasing in `hits` for a fixed
/// expectation.
#[must_use]
pub fn round_score(hits: u32, expected_hits: f64) -> f64 {
    let expected = if expected_hits > 0.0 {
        expected_hits
    } else {
        FALLBACK_EXPECTED
    };
    f64::from(hits) / expected * 100.0
}

/// Straight hit rate used for initial-assessment sessions, where no
/// expectation baseline exists yet.
#[must_use]
pub fn assessment_round_score(hits: u32, darts_thrown: u32) -> f64 {
    if darts_thrown == 0 {
        return 0.0;
    }
    f64::from(hits) / f64::from(darts_thrown) * 100.0
}

/// Score a checkout step: cumulative successful finishes across all attempts
/// against the statistically expected successes for that target and level.
#[must_use]
pub fn step_score(expected_successes: f64, actual_successes: u32) -> f64 {
    let expected = if expected_successes > 0.0 {
        expected_successes
    } else {
        FALLBACK_EXPECTED
    };
    f64::from(actual_successes) / expected * 100.0
}

/// Score an accuracy step from the round scores of its completed visits.
#[must_use]
pub fn accuracy_step_score(round_scores: &[f64]) -> f64 {
    mean(round_scores)
}

/// Aggregate a routine's per-step scores into one routine score.
///
/// Checkout steps contribute their persisted step score, accuracy steps
/// their round score; the caller guarantees every step is represented.
#[must_use]
pub fn routine_score(step_scores: &[f64]) -> f64 {
    mean(step_scores)
}

/// Aggregate all routine scores for a run into one session score. The
/// caller guarantees every routine is represented.
#[must_use]
pub fn session_score(routine_scores: &[f64]) -> f64 {
    mean(routine_scores)
}

/// A player's rating floored to the nearest ten, used to key reference
/// expectation data.
#[must_use]
pub const fn decade_of(rating: u32) -> u32 {
    rating / 10 * 10
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = values.len() as f64;
    values.iter().sum::<f64>() / count
}
