//! Double-out checkout rules: remaining score and bust classification.

use crate::segment::Segment;
use serde::{Deserialize, Serialize};

/// Why a checkout attempt busted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BustReason {
    /// Scored more than remained.
    Over,
    /// Remainder of 1 cannot be finished on a double.
    One,
    /// Reached exactly zero, but not on a finishing segment.
    InvalidFinish,
}

/// Terminal classification of a (possibly partial) checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Remainder hit exactly zero on a finishing segment.
    Finished {
        /// Zero-based index of the dart that achieved the finish.
        dart_index: usize,
    },
    /// Attempt resolved against the player; later darts are not evaluated.
    Busted(BustReason),
    /// No terminal condition yet; the attempt may continue if darts remain.
    Open {
        /// Score still required after the thrown darts.
        remaining: u32,
    },
}

impl AttemptOutcome {
    /// Whether the attempt can accept no further darts.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Open { .. })
    }
}

/// Display remainder: target minus the sum of scores, floored at 0.
///
/// A zero result does not by itself indicate a valid finish; use
/// [`replay`] or [`bust_reason`] for classification.
#[must_use]
pub fn remaining(target: u32, thrown: &[Segment]) -> u32 {
    let scored: u32 = thrown.iter().map(|s| s.score()).sum();
    target.saturating_sub(scored)
}

/// Replay the thrown darts cumulatively and stop at the first terminal
/// condition: negative remainder, remainder 1, or remainder 0.
#[must_use]
pub fn replay(target: u32, thrown: &[Segment]) -> AttemptOutcome {
    let mut rem = i64::from(target);
    for (index, segment) in thrown.iter().enumerate() {
        rem -= i64::from(segment.score());
        if rem < 0 {
            return AttemptOutcome::Busted(BustReason::Over);
        }
        if rem == 1 {
            return AttemptOutcome::Busted(BustReason::One);
        }
        if rem == 0 {
            return if segment.is_finishing() {
                AttemptOutcome::Finished { dart_index: index }
            } else {
                AttemptOutcome::Busted(BustReason::InvalidFinish)
            };
        }
    }
    // Sequence consumed without reaching zero.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let remaining = rem as u32;
    AttemptOutcome::Open { remaining }
}

/// Classify the attempt as busted or not; `None` means no bust (either a
/// valid finish or an attempt that may still continue).
#[must_use]
pub fn bust_reason(target: u32, thrown: &[Segment]) -> Option<BustReason> {
    match replay(target, thrown) {
        AttemptOutcome::Busted(reason) => Some(reason),
        AttemptOutcome::Finished { .. } | AttemptOutcome::Open { .. } => None,
    }
}

/// Zero-based index of the dart that validly finished the attempt, if any.
#[must_use]
pub fn finish_dart(target: u32, thrown: &[Segment]) -> Option<usize> {
    match replay(target, thrown) {
        AttemptOutcome::Finished { dart_index } => Some(dart_index),
        AttemptOutcome::Busted(_) | AttemptOutcome::Open { .. } => None,
    }
}

/// Parse a step's numeric checkout target, degrading to 0 when the content
/// is malformed rather than failing the session.
#[must_use]
pub fn parse_target(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!("non-numeric checkout target {raw:?}; treating remaining as 0");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment::{Bull, Double, Miss, Single, Treble};

    #[test]
    fn valid_finish_is_not_a_bust() {
        let thrown = [Single(20), Double(10)];
        assert_eq!(remaining(40, &thrown), 0);
        assert_eq!(bust_reason(40, &thrown), None);
        assert_eq!(finish_dart(40, &thrown), Some(1));
    }

    #[test]
    fn bull_finishes() {
        assert_eq!(replay(50, &[Bull]), AttemptOutcome::Finished { dart_index: 0 });
    }

    #[test]
    fn zero_on_a_single_is_invalid_finish() {
        assert_eq!(bust_reason(20, &[Single(20)]), Some(BustReason::InvalidFinish));
    }

    #[test]
    fn remainder_one_busts() {
        assert_eq!(bust_reason(21, &[Single(20), Miss]), Some(BustReason::One));
    }

    #[test]
    fn overshoot_busts_and_display_remainder_clamps() {
        assert_eq!(bust_reason(10, &[Single(20)]), Some(BustReason::Over));
        assert_eq!(remaining(10, &[Single(20)]), 0);
        assert_eq!(remaining(170, &[Treble(20), Treble(20), Bull]), 0);
    }

    #[test]
    fn darts_after_the_terminal_condition_are_ignored() {
        // The D10 resolves the attempt; the trailing treble never evaluates.
        let thrown = [Single(20), Double(10), Treble(20)];
        assert_eq!(replay(40, &thrown), AttemptOutcome::Finished { dart_index: 1 });
        // Same for a bust.
        assert_eq!(bust_reason(10, &[Single(20), Double(5)]), Some(BustReason::Over));
    }

    #[test]
    fn open_attempt_reports_remaining() {
        assert_eq!(replay(61, &[Treble(7)]), AttemptOutcome::Open { remaining: 40 });
        assert_eq!(bust_reason(61, &[Treble(7)]), None);
        assert!(!AttemptOutcome::Open { remaining: 40 }.is_terminal());
    }

    #[test]
    fn malformed_target_degrades_to_zero() {
        assert_eq!(parse_target("40"), 40);
        assert_eq!(parse_target(" 61 "), 61);
        assert_eq!(parse_target("S20"), 0);
        assert_eq!(parse_target(""), 0);
    }
}
