//! Spoken dart-call parsing: one transcript in, canonical segments out.
//!
//! The parser is a pure function over text; the speech recognizer feeding it
//! is a pluggable host concern. It either yields exactly the expected number
//! of segments or nothing at all, so a half-understood utterance never
//! pollutes a visit.

use crate::segment::Segment;

/// Multiplier words recognized ahead of a number, including the recognizer's
/// habitual "triple"/"trouble" renderings of treble.
fn multiplier(token: &str) -> Option<fn(u8) -> Segment> {
    match token {
        "single" => Some(Segment::Single),
        "double" => Some(Segment::Double),
        "treble" | "triple" | "trouble" => Some(Segment::Treble),
        _ => None,
    }
}

/// Spelled-out numbers, plus the speech-to-text homophones of "two".
fn word_number(token: &str) -> Option<u8> {
    let n = match token {
        "one" => 1,
        "two" | "to" | "too" | "tube" | "tune" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        _ => return None,
    };
    Some(n)
}

/// Bed number following a multiplier word: digits or a spelled number,
/// restricted to `1..=20`.
fn bed_number(token: &str) -> Option<u8> {
    let n = token.parse::<u8>().ok().or_else(|| word_number(token))?;
    (1..=20).contains(&n).then_some(n)
}

/// Parse one recognized utterance into exactly `expected` segments.
///
/// Separators are commas, whitespace, and the word "and". Bare numbers read
/// as singles; a bare two-digit number with equal digits ("55", "22") is the
/// recognizer's rendering of "double five"/"double two" and is repaired
/// accordingly. An utterance of exactly two misses pads to three when three
/// darts are expected. Any unrecognized token, or an arity other than
/// `expected`, invalidates the whole parse.
#[must_use]
pub fn parse_transcript(text: &str, expected: usize) -> Option<Vec<Segment>> {
    if expected == 0 {
        return None;
    }
    let lowered = text.to_ascii_lowercase().replace(',', " ");
    let mut tokens = lowered
        .split_whitespace()
        .filter(|token| *token != "and")
        .peekable();

    let mut segments = Vec::with_capacity(expected);
    while let Some(token) = tokens.next() {
        let segment = if let Some(build) = multiplier(token) {
            build(bed_number(tokens.next()?)?)
        } else if token == "miss" {
            Segment::Miss
        } else if token == "bull" || token == "bullseye" {
            Segment::Bull
        } else if token == "25" {
            Segment::Outer25
        } else if token == "twenty" && tokens.peek() == Some(&"five") {
            tokens.next();
            Segment::Outer25
        } else if let Ok(n) = token.parse::<u8>() {
            let bytes = token.as_bytes();
            if bytes.len() == 2 && bytes[0] == bytes[1] && bytes[0] != b'0' {
                // "double five" often comes back as the digits "55".
                Segment::Double(bytes[0] - b'0')
            } else if (1..=20).contains(&n) {
                Segment::Single(n)
            } else {
                return None;
            }
        } else if let Some(n) = word_number(token) {
            Segment::Single(n)
        } else {
            return None;
        };
        segments.push(segment);
        if segments.len() > expected {
            return None;
        }
    }

    // A dropped word in recognition regularly turns "miss miss miss" into
    // two misses; repair only that exact shape.
    if expected == 3 && segments == [Segment::Miss, Segment::Miss] {
        segments.push(Segment::Miss);
    }

    (segments.len() == expected).then_some(segments)
}
