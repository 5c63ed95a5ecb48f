use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::{Correctness, Field, KnowledgeItem, TranslationResult};

/// Characters ignored by the punctuation-insensitive comparison.
pub const IGNORED_PUNCTUATION: [char; 5] = ['!', ',', ':', '?', '.'];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VerifyError {
    #[error("no field was filled in")]
    NoAnswers,

    #[error("the provided field {0} cannot also be answered")]
    AnsweredProvidedField(Field),

    #[error("field {0} answered more than once")]
    DuplicateField(Field),
}

//
// ─── VERDICT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Correct,
    Incorrect,
    Partial,
}

impl Verdict {
    #[must_use]
    pub fn from_bool(correct: bool) -> Self {
        if correct {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        }
    }

    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

impl From<Verdict> for Correctness {
    fn from(value: Verdict) -> Self {
        match value {
            Verdict::Correct => Correctness::Yes,
            Verdict::Partial => Correctness::Partial,
            Verdict::Incorrect => Correctness::No,
        }
    }
}

/// Outcome of checking one learner response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub verdict: Verdict,
    pub user_value: String,
    pub expected_value: String,
    pub comment: String,
}

impl VerificationResult {
    fn binary(correct: bool, user_value: &str, expected_value: &str) -> Self {
        let comment = if correct {
            "Perfect! Your answer is correct.".to_string()
        } else {
            format!("Your answer: \"{user_value}\". Expected: \"{expected_value}\".")
        };
        Self {
            verdict: Verdict::from_bool(correct),
            user_value: user_value.to_string(),
            expected_value: expected_value.to_string(),
            comment,
        }
    }
}

//
// ─── SINGLE FIELD ──────────────────────────────────────────────────────────────
//

fn normalize_exact(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Removes `! , : ? .` and trims surrounding whitespace.
#[must_use]
pub fn strip_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| !IGNORED_PUNCTUATION.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Case-insensitive comparison after trimming. Punctuation counts.
#[must_use]
pub fn verify_exact(expected: &str, user_input: &str) -> VerificationResult {
    let correct = normalize_exact(expected) == normalize_exact(user_input);
    VerificationResult::binary(correct, user_input.trim(), expected)
}

/// Case-sensitive comparison with `! , : ? .` removed from both sides.
///
/// Used by listening and pronunciation practice. Unlike [`verify_exact`] this
/// keeps letter case significant.
#[must_use]
pub fn verify_punctuation_insensitive(expected: &str, user_input: &str) -> VerificationResult {
    let correct = strip_punctuation(expected) == strip_punctuation(user_input);
    VerificationResult::binary(correct, user_input.trim(), expected)
}

//
// ─── MULTI FIELD ───────────────────────────────────────────────────────────────
//

/// Result of checking one answered field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    pub field: Field,
    pub user_value: String,
    pub expected_value: String,
    pub correct: bool,
}

/// Aggregate of a translation exercise where several fields were asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchVerification {
    pub provided: Field,
    pub checks: Vec<FieldCheck>,
}

impl BatchVerification {
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.checks.iter().filter(|c| c.correct).count()
    }

    /// Number of compared fields; blank answers are not counted.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn per_field(&self) -> Vec<bool> {
        self.checks.iter().map(|c| c.correct).collect()
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        match self.correct_count() {
            0 => Verdict::Incorrect,
            n if n == self.total_count() => Verdict::Correct,
            _ => Verdict::Partial,
        }
    }

    /// Collapse the per-field checks into a single verification result.
    #[must_use]
    pub fn summary(&self) -> VerificationResult {
        let join = |values: Vec<&str>| values.join(" | ");
        VerificationResult {
            verdict: self.verdict(),
            user_value: join(self.checks.iter().map(|c| c.user_value.as_str()).collect()),
            expected_value: join(self.checks.iter().map(|c| c.expected_value.as_str()).collect()),
            comment: format!(
                "{} of {} fields correct.",
                self.correct_count(),
                self.total_count()
            ),
        }
    }

    /// Payload stored in the practice history.
    #[must_use]
    pub fn to_translation_result(&self) -> TranslationResult {
        TranslationResult {
            provided_field: self.provided,
            filled_fields: self.checks.iter().map(|c| c.field).collect(),
            filled_values: self.checks.iter().map(|c| c.user_value.clone()).collect(),
            field_results: self.per_field(),
        }
    }
}

/// Check each answered dependent field independently with [`verify_exact`].
///
/// Blank answers are skipped. A field the item does not carry is expected
/// to be left blank, so any non-blank answer for it is wrong.
///
/// # Errors
///
/// Returns `VerifyError` when nothing was answered, a field repeats, or the
/// provided field itself was answered.
pub fn verify_batch(
    item: &KnowledgeItem,
    provided: Field,
    answers: &[(Field, String)],
) -> Result<BatchVerification, VerifyError> {
    let mut seen = HashSet::new();
    let mut checks = Vec::new();

    for (field, value) in answers {
        if *field == provided {
            return Err(VerifyError::AnsweredProvidedField(provided));
        }
        if !seen.insert(*field) {
            return Err(VerifyError::DuplicateField(*field));
        }
        if value.trim().is_empty() {
            continue;
        }
        let expected = item.field(*field).unwrap_or_default();
        let check = verify_exact(expected, value);
        checks.push(FieldCheck {
            field: *field,
            user_value: check.user_value,
            expected_value: check.expected_value,
            correct: check.verdict.is_correct(),
        });
    }

    if checks.is_empty() {
        return Err(VerifyError::NoAnswers);
    }

    Ok(BatchVerification { provided, checks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KnowledgeId, KnowledgeType, Language};
    use crate::time::fixed_now;

    fn haus() -> KnowledgeItem {
        KnowledgeItem::new(
            KnowledgeId::new("haus"),
            Language::German,
            KnowledgeType::Word,
            "Haus",
            "casa",
            fixed_now(),
        )
        .unwrap()
        .with_syllable_division("Haus")
        .with_phonetic_transcription("haʊ̯s")
    }

    #[test]
    fn exact_compare_ignores_case_and_outer_whitespace() {
        assert_eq!(verify_exact("Hallo", "hallo").verdict, Verdict::Correct);
        assert_eq!(verify_exact("Hallo", "  HALLO ").verdict, Verdict::Correct);
    }

    #[test]
    fn exact_compare_keeps_punctuation() {
        let result = verify_exact("Hallo", "Hallo!");
        assert_eq!(result.verdict, Verdict::Incorrect);
        assert_eq!(result.comment, "Your answer: \"Hallo!\". Expected: \"Hallo\".");
    }

    #[test]
    fn punctuation_compare_strips_listed_marks() {
        assert_eq!(
            verify_punctuation_insensitive("Bonjour.", "Bonjour").verdict,
            Verdict::Correct
        );
        assert_eq!(
            verify_punctuation_insensitive("Wie geht's, Anna?", "Wie geht's Anna").verdict,
            Verdict::Correct
        );
    }

    #[test]
    fn punctuation_compare_is_case_sensitive() {
        assert_eq!(
            verify_punctuation_insensitive("Guten Morgen", "guten morgen").verdict,
            Verdict::Incorrect
        );
    }

    #[test]
    fn punctuation_compare_keeps_other_symbols() {
        assert_eq!(strip_punctuation(" ¿Qué; tal! "), "¿Qué; tal");
    }

    #[test]
    fn batch_excludes_blank_fields() {
        let answers = vec![
            (Field::SourceText, "haus".to_string()),
            (Field::SyllableDivision, "Ha-us".to_string()),
            (Field::PhoneticTranscription, "   ".to_string()),
        ];
        let batch = verify_batch(&haus(), Field::Translation, &answers).unwrap();
        assert_eq!(batch.correct_count(), 1);
        assert_eq!(batch.total_count(), 2);
        assert_eq!(batch.per_field(), vec![true, false]);
        assert_eq!(batch.verdict(), Verdict::Partial);

        let payload = batch.to_translation_result();
        assert_eq!(payload.filled_fields, vec![Field::SourceText, Field::SyllableDivision]);
        assert_eq!(payload.field_results, vec![true, false]);
    }

    #[test]
    fn batch_rejects_answering_the_provided_field() {
        let answers = vec![(Field::Translation, "casa".to_string())];
        assert_eq!(
            verify_batch(&haus(), Field::Translation, &answers).unwrap_err(),
            VerifyError::AnsweredProvidedField(Field::Translation)
        );
    }

    #[test]
    fn batch_with_only_blanks_is_rejected() {
        let answers = vec![(Field::SourceText, String::new())];
        assert_eq!(
            verify_batch(&haus(), Field::Translation, &answers).unwrap_err(),
            VerifyError::NoAnswers
        );
    }

    #[test]
    fn batch_all_correct_is_correct() {
        let answers = vec![(Field::Translation, " Casa ".to_string())];
        let batch = verify_batch(&haus(), Field::SourceText, &answers).unwrap();
        assert_eq!(batch.verdict(), Verdict::Correct);
        assert_eq!(batch.summary().comment, "1 of 1 fields correct.");
    }
}
