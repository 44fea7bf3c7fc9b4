//! Key-phrase extraction for ATC clearances.
//!
//! A clearance is scanned for flight level, altitude in feet, heading, speed
//! and runway, in that order. Each match yields one canonical phrase; the
//! captured digits/letters keep the case they were written in.
//!
//! Accepted forms:
//!
//! | kind         | written as                              | phrase             |
//! |--------------|-----------------------------------------|--------------------|
//! | flight level | `flight level 350`, `FL350`, `FL 350`   | `flight level 350` |
//! | altitude     | `5000 feet`, `4,000 feet`               | as written         |
//! | heading      | `heading 270`, `heading 90`             | as written         |
//! | speed        | `speed 210`                             | as written         |
//! | runway       | `runway 9`, `runway 27L`                | as written         |
//!
//! The `FL` abbreviation is expanded because a readback spells it out.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseKind {
    FlightLevel,
    Altitude,
    Heading,
    Speed,
    Runway,
}

impl PhraseKind {
    pub const ORDER: [PhraseKind; 5] = [
        PhraseKind::FlightLevel,
        PhraseKind::Altitude,
        PhraseKind::Heading,
        PhraseKind::Speed,
        PhraseKind::Runway,
    ];

    fn pattern(&self) -> &'static Regex {
        static FLIGHT_LEVEL: OnceLock<Regex> = OnceLock::new();
        static ALTITUDE: OnceLock<Regex> = OnceLock::new();
        static HEADING: OnceLock<Regex> = OnceLock::new();
        static SPEED: OnceLock<Regex> = OnceLock::new();
        static RUNWAY: OnceLock<Regex> = OnceLock::new();

        let (cell, source) = match self {
            Self::FlightLevel => (
                &FLIGHT_LEVEL,
                r"(?i)(?:\bflight\s+level\s+|\bFL\s?)(\d{2,3})\b",
            ),
            Self::Altitude => (&ALTITUDE, r"(?i)\b(\d{1,3}(?:,\d{3})+|\d{3,5})\s+feet\b"),
            Self::Heading => (&HEADING, r"(?i)\bheading\s+(\d{1,3})\b"),
            Self::Speed => (&SPEED, r"(?i)\bspeed\s+(\d{2,3})\b"),
            Self::Runway => (&RUNWAY, r"(?i)\brunway\s+(\d{1,2}[LRC]?)\b"),
        };

        // Patterns are literals; a failure here is a programming error caught by the unit tests.
        cell.get_or_init(|| Regex::new(source).expect("invalid key phrase pattern"))
    }

    fn render(&self, captured: &str) -> String {
        match self {
            Self::FlightLevel => format!("flight level {captured}"),
            Self::Altitude => format!("{captured} feet"),
            Self::Heading => format!("heading {captured}"),
            Self::Speed => format!("speed {captured}"),
            Self::Runway => format!("runway {captured}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPhrase {
    pub kind: PhraseKind,
    pub text: String,
}

/// Extracts the canonical key phrases of a clearance.
///
/// At most one phrase is produced per kind, using the first occurrence.
pub fn extract_key_phrases(clearance: &str) -> Vec<KeyPhrase> {
    PhraseKind::ORDER
        .iter()
        .filter_map(|kind| {
            let captures = kind.pattern().captures(clearance)?;
            let value = captures.get(1)?.as_str();
            Some(KeyPhrase {
                kind: *kind,
                text: kind.render(value),
            })
        })
        .collect()
}

/// Convenience wrapper returning only the phrase strings.
pub fn key_phrase_texts(clearance: &str) -> Vec<String> {
    extract_key_phrases(clearance)
        .into_iter()
        .map(|phrase| phrase.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_fixed_order() {
        let phrases = key_phrase_texts("runway 27L, heading 270, climb and maintain flight level 350");
        assert_eq!(phrases, vec!["flight level 350", "heading 270", "runway 27L"]);
    }

    #[test]
    fn test_altitude_and_speed() {
        let phrases = key_phrase_texts("Descend 4,000 feet, reduce speed 210 knots");
        assert_eq!(phrases, vec!["4,000 feet", "speed 210"]);
    }

    #[test]
    fn test_plain_altitude_digits() {
        let phrases = key_phrase_texts("climb 5000 feet");
        assert_eq!(phrases, vec!["5000 feet"]);
    }

    #[test]
    fn test_preserves_captured_case() {
        let phrases = key_phrase_texts("Cleared to land RUNWAY 09r");
        assert_eq!(phrases, vec!["runway 09r"]);
    }

    #[test]
    fn test_empty_when_nothing_matches() {
        assert!(extract_key_phrases("contact tower, good day").is_empty());
    }

    #[test]
    fn test_flight_level_abbreviation_expands() {
        assert_eq!(key_phrase_texts("climb FL350"), vec!["flight level 350"]);
        assert_eq!(key_phrase_texts("descend fl 80"), vec!["flight level 80"]);
        assert!(key_phrase_texts("contact FLOW control").is_empty());
    }

    #[test]
    fn test_short_heading() {
        let phrases = key_phrase_texts("turn right heading 90, runway 9");
        assert_eq!(phrases, vec!["heading 90", "runway 9"]);
    }

    #[test]
    fn test_every_pattern_compiles() {
        for kind in PhraseKind::ORDER {
            let _ = kind.pattern();
        }
    }
}
