pub mod extractor;
pub mod validators;

pub use extractor::{extract_key_phrases, key_phrase_texts, KeyPhrase, PhraseKind};
pub use validators::{
    validate_jumbled_sequence, validate_pronunciation, validate_readback_correction,
    validate_scenario_response, ErrorSelectionResult, GroundTruthError, PronunciationResult,
    Scenario, SequenceResult, ValidationResult,
};
