//! Canonical dart segment codes, normalization, and point values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One dart's landing zone in canonical form.
///
/// The number payload of `Single`/`Double`/`Treble` is always in `1..=20`;
/// the parser rejects anything outside that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Segment {
    /// Single bed 1-20.
    Single(u8),
    /// Double ring 1-20.
    Double(u8),
    /// Treble ring 1-20.
    Treble(u8),
    /// Outer bullseye, worth 25.
    Outer25,
    /// Inner bullseye, worth 50.
    Bull,
    /// Dart missed the board entirely.
    Miss,
}

/// Error raised when a string is not a recognizable segment code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized segment code: {0:?}")]
pub struct ParseSegmentError(pub String);

impl Segment {
    /// Parse a free-text segment declaration into its canonical form.
    ///
    /// Accepts `M`/`MISS`, `25`, `Bull`/`Bullseye`, and `{single|s}N`,
    /// `{double|d}N`, `{treble|t}N` with an optional space before the
    /// number, all case-insensitive. Returns `None` for anything else,
    /// including bed numbers outside `1..=20`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let upper = text.trim().to_ascii_uppercase();
        match upper.as_str() {
            "" => return None,
            "M" | "MISS" => return Some(Self::Miss),
            "25" => return Some(Self::Outer25),
            "BULL" | "BULLSEYE" => return Some(Self::Bull),
            _ => {}
        }

        let (rest, build): (&str, fn(u8) -> Self) = if let Some(r) = upper.strip_prefix("SINGLE") {
            (r, Self::Single)
        } else if let Some(r) = upper.strip_prefix("DOUBLE") {
            (r, Self::Double)
        } else if let Some(r) = upper.strip_prefix("TREBLE") {
            (r, Self::Treble)
        } else if let Some(r) = upper.strip_prefix('S') {
            (r, Self::Single)
        } else if let Some(r) = upper.strip_prefix('D') {
            (r, Self::Double)
        } else if let Some(r) = upper.strip_prefix('T') {
            (r, Self::Treble)
        } else {
            return None;
        };

        let number: u8 = rest.trim_start().parse().ok()?;
        if (1..=20).contains(&number) {
            Some(build(number))
        } else {
            None
        }
    }

    /// Point value of the segment.
    #[must_use]
    pub fn score(self) -> u32 {
        match self {
            Self::Single(n) => u32::from(n),
            Self::Double(n) => (2 * u32::from(n)).clamp(2, 40),
            Self::Treble(n) => (3 * u32::from(n)).clamp(3, 60),
            Self::Outer25 => 25,
            Self::Bull => 50,
            Self::Miss => 0,
        }
    }

    /// Whether this segment may legally end a double-out checkout.
    #[must_use]
    pub const fn is_finishing(self) -> bool {
        matches!(self, Self::Double(_) | Self::Bull)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(n) => write!(f, "S{n}"),
            Self::Double(n) => write!(f, "D{n}"),
            Self::Treble(n) => write!(f, "T{n}"),
            Self::Outer25 => write!(f, "25"),
            Self::Bull => write!(f, "Bull"),
            Self::Miss => write!(f, "M"),
        }
    }
}

impl FromStr for Segment {
    type Err = ParseSegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseSegmentError(s.trim().to_string()))
    }
}

impl From<Segment> for String {
    fn from(value: Segment) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Segment {
    type Error = ParseSegmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Normalize free text to a canonical segment code.
///
/// Unrecognized input passes through trimmed but otherwise unchanged so the
/// string boundary stays total; engine-internal flow uses [`Segment`] and
/// never relies on the fallback.
#[must_use]
pub fn normalize(text: &str) -> String {
    match Segment::parse(text) {
        Some(segment) => segment.to_string(),
        None => text.trim().to_string(),
    }
}

/// Total scoring function over raw strings: unrecognized input scores 0.
#[must_use]
pub fn score_of(text: &str) -> u32 {
    Segment::parse(text).map_or(0, Segment::score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_verbose_forms() {
        assert_eq!(Segment::parse("S20"), Some(Segment::Single(20)));
        assert_eq!(Segment::parse("d16"), Some(Segment::Double(16)));
        assert_eq!(Segment::parse("treble 5"), Some(Segment::Treble(5)));
        assert_eq!(Segment::parse("Single 1"), Some(Segment::Single(1)));
        assert_eq!(Segment::parse("  miss "), Some(Segment::Miss));
        assert_eq!(Segment::parse("M"), Some(Segment::Miss));
        assert_eq!(Segment::parse("25"), Some(Segment::Outer25));
        assert_eq!(Segment::parse("bullseye"), Some(Segment::Bull));
        assert_eq!(Segment::parse("Bull"), Some(Segment::Bull));
    }

    #[test]
    fn rejects_out_of_range_and_junk() {
        assert_eq!(Segment::parse("S21"), None);
        assert_eq!(Segment::parse("D0"), None);
        assert_eq!(Segment::parse("T99"), None);
        assert_eq!(Segment::parse(""), None);
        assert_eq!(Segment::parse("checkout"), None);
        assert_eq!(Segment::parse("26"), None);
    }

    #[test]
    fn score_table_matches_rules() {
        assert_eq!(Segment::Single(20).score(), 20);
        assert_eq!(Segment::Double(16).score(), 32);
        assert_eq!(Segment::Treble(20).score(), 60);
        assert_eq!(Segment::Outer25.score(), 25);
        assert_eq!(Segment::Bull.score(), 50);
        assert_eq!(Segment::Miss.score(), 0);
        assert_eq!(score_of("garbage"), 0);
        assert_eq!(score_of("T19"), 57);
    }

    #[test]
    fn only_doubles_and_bull_finish() {
        assert!(Segment::Double(1).is_finishing());
        assert!(Segment::Bull.is_finishing());
        assert!(!Segment::Single(20).is_finishing());
        assert!(!Segment::Treble(20).is_finishing());
        assert!(!Segment::Outer25.is_finishing());
        assert!(!Segment::Miss.is_finishing());
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["single 20", "d8", "BULLSEYE", "25", "m", "not a dart", ""] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
        assert_eq!(normalize("double16"), "D16");
        assert_eq!(normalize(" not a dart "), "not a dart");
    }

    #[test]
    fn serde_uses_canonical_codes() {
        let json = serde_json::to_string(&Segment::Double(10)).unwrap();
        assert_eq!(json, "\"D10\"");
        let back: Segment = serde_json::from_str("\"t5\"").unwrap();
        assert_eq!(back, Segment::Treble(5));
        assert!(serde_json::from_str::<Segment>("\"S99\"").is_err());
    }
}
