//! Response validators for the four exercise modalities.
//!
//! All validators are pure: they score a learner response against ground
//! truth and never touch the adaptive model or the store.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::extractor::key_phrase_texts;

const MISSING_CALL_SIGN_PENALTY: i32 = 20;
const MISSING_ELEMENT_PENALTY: i32 = 15;
const INCOMPLETE_MAINTAIN_PENALTY: i32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub call_sign: String,
    pub atc_clearance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub correct: bool,
    pub score: u32,
    pub corrections: Vec<String>,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundTruthError {
    pub incorrect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSelectionResult {
    pub correct: bool,
    pub found_count: usize,
    pub total_errors: usize,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceResult {
    pub correct: bool,
    pub correct_positions: usize,
    pub total_words: usize,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationResult {
    pub correct: bool,
    pub score: u32,
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// Scores a scenario readback against the clearance it answers.
///
/// Only missing key phrases produce corrections, so `correct` can be true
/// while call-sign or phraseology deductions lower the score.
pub fn validate_scenario_response(
    user_response: &str,
    correct_response: &str,
    scenario: &Scenario,
) -> ValidationResult {
    let mut score: i32 = 100;
    let mut corrections = Vec::new();

    let user = normalize(user_response);
    let call_sign = normalize(&scenario.call_sign);

    if !user.ends_with(&call_sign) {
        score -= MISSING_CALL_SIGN_PENALTY;
    }

    for phrase in key_phrase_texts(&scenario.atc_clearance) {
        if !user.contains(&phrase.to_lowercase()) {
            corrections.push(format!("Missing element: \"{phrase}\""));
            score -= MISSING_ELEMENT_PENALTY;
        }
    }

    if user.contains("maintain") && !user.contains("and maintain") {
        score -= INCOMPLETE_MAINTAIN_PENALTY;
    }

    ValidationResult {
        correct: corrections.is_empty(),
        score: score.max(0) as u32,
        corrections,
        suggestion: correct_response.to_string(),
    }
}

/// Scores an error-spotting exercise.
///
/// Callers must supply at least one ground-truth error; with none the score is 0.
pub fn validate_readback_correction(
    selected_errors: &[String],
    actual_errors: &[GroundTruthError],
) -> ErrorSelectionResult {
    let truth: HashSet<String> = actual_errors
        .iter()
        .map(|error| error.incorrect.to_lowercase())
        .collect();
    let total_errors = actual_errors.len();

    let matched = selected_errors
        .iter()
        .filter(|selection| truth.contains(&selection.to_lowercase()))
        .count();
    let found_count = matched.min(total_errors);

    ErrorSelectionResult {
        correct: total_errors > 0 && found_count == total_errors,
        found_count,
        total_errors,
        score: percentage(found_count, total_errors),
    }
}

/// Scores a word-ordering exercise position by position.
pub fn validate_jumbled_sequence(arranged: &[String], correct_order: &[String]) -> SequenceResult {
    let correct_positions = correct_order
        .iter()
        .enumerate()
        .filter(|(index, word)| arranged.get(*index) == Some(*word))
        .count();
    let total_words = correct_order.len();

    SequenceResult {
        correct: total_words > 0 && correct_positions == total_words,
        correct_positions,
        total_words,
        score: percentage(correct_positions, total_words),
    }
}

pub fn validate_pronunciation(selected: &str, correct: &str) -> PronunciationResult {
    let matched = selected == correct;
    PronunciationResult {
        correct: matched,
        score: if matched { 100 } else { 0 },
    }
}
