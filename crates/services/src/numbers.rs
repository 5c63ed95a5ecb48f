//! Number pronunciation practice: write out and/or say a random number.
//!
//! Correctness is decided by an external judge (a language model) since
//! there is no reference spelling to compare against.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::{error, instrument};

use lingua_core::model::{
    ExerciseRecord, ExerciseResult, KnowledgeId, Language, NumberResult, PracticeType,
};
use lingua_core::numbers::NumberRange;
use storage::media::{AudioClip, ChatMessage, ChatModel, SpeechToText};

use crate::error::NumberPracticeError;
use crate::recorder::{ExerciseRecorder, RecordOutcome};

const TEXT_CORRECT: &str = "Correct! You wrote the number correctly.";
const TEXT_INCORRECT: &str = "Incorrect. Review how to write this number.";
const AUDIO_CORRECT: &str = "Correct! Your pronunciation is correct.";
const AUDIO_INCORRECT: &str = "Incorrect. Review the pronunciation of this number.";

/// Decides whether a learner's text expresses a number.
#[async_trait]
pub trait NumberJudge: Send + Sync {
    /// # Errors
    ///
    /// Returns `NumberPracticeError` if the judge is unreachable or its reply is unreadable.
    async fn judge(
        &self,
        number: i64,
        answer: &str,
        language: Language,
    ) -> Result<bool, NumberPracticeError>;
}

#[derive(Debug, Deserialize)]
struct JudgeReply {
    equivalente: bool,
}

/// Read a `{"equivalente": bool}` reply, tolerating markdown code fences.
///
/// # Errors
///
/// Returns `NumberPracticeError::UnparseableReply` with the cleaned text.
pub fn parse_judge_reply(reply: &str) -> Result<bool, NumberPracticeError> {
    let cleaned = strip_code_fences(reply);
    serde_json::from_str::<JudgeReply>(&cleaned)
        .map(|r| r.equivalente)
        .map_err(|_| NumberPracticeError::UnparseableReply(cleaned))
}

/// Drop markdown code fences a chat model may wrap its JSON in.
pub(crate) fn strip_code_fences(reply: &str) -> String {
    reply
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// [`NumberJudge`] backed by a chat model.
#[derive(Clone)]
pub struct LlmNumberJudge {
    chat: Arc<dyn ChatModel>,
}

impl LlmNumberJudge {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    fn prompt(number: i64, answer: &str, language: Language) -> String {
        format!(
            "The learner was asked to express the number {number} in {}.\n\
             Their answer: \"{answer}\".\n\
             Does the answer correspond to exactly that number, ignoring case and punctuation? \
             Reply only with JSON: {{\"equivalente\": true}} or {{\"equivalente\": false}}.",
            language.display_name()
        )
    }
}

#[async_trait]
impl NumberJudge for LlmNumberJudge {
    async fn judge(
        &self,
        number: i64,
        answer: &str,
        language: Language,
    ) -> Result<bool, NumberPracticeError> {
        let messages = [ChatMessage::user(Self::prompt(number, answer, language))];
        let reply = self
            .chat
            .chat(&messages)
            .await
            .map_err(|source| NumberPracticeError::Service {
                service: "chat",
                source,
            })?;
        parse_judge_reply(&reply)
    }
}

/// Result of one number attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberOutcome {
    pub result: NumberResult,
    pub record: ExerciseRecord,
    pub stored: RecordOutcome,
}

#[derive(Clone)]
pub struct NumberPracticeService {
    judge: Arc<dyn NumberJudge>,
    stt: Arc<dyn SpeechToText>,
    recorder: ExerciseRecorder,
}

impl NumberPracticeService {
    #[must_use]
    pub fn new(
        judge: Arc<dyn NumberJudge>,
        stt: Arc<dyn SpeechToText>,
        recorder: ExerciseRecorder,
    ) -> Self {
        Self { judge, stt, recorder }
    }

    /// Pick the next number to practice.
    pub fn draw<R: Rng + ?Sized>(range: NumberRange, rng: &mut R) -> i64 {
        range.pick(rng)
    }

    /// Judge a written and/or spoken answer for `number`, then record it.
    ///
    /// The written answer is judged first, the recording is transcribed and
    /// judged after. Nothing is recorded if any step fails.
    ///
    /// # Errors
    ///
    /// Returns `NumberPracticeError::NoAnswer` when both answers are missing,
    /// and `Service`/`UnparseableReply` when a collaborator fails.
    #[instrument(skip(self, text, audio))]
    pub async fn verify(
        &self,
        number: i64,
        language: Language,
        text: Option<&str>,
        audio: Option<&AudioClip>,
    ) -> Result<NumberOutcome, NumberPracticeError> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        let audio = audio.filter(|clip| !clip.is_empty());
        if text.is_none() && audio.is_none() {
            return Err(NumberPracticeError::NoAnswer);
        }

        let mut result = NumberResult {
            reference_number: number.to_string(),
            ..NumberResult::default()
        };

        if let Some(text) = text {
            let correct = self.judge.judge(number, text, language).await?;
            result.user_text = Some(text.to_string());
            result.text_correct = Some(correct);
            let comment = if correct { TEXT_CORRECT } else { TEXT_INCORRECT };
            result.text_comment = Some(comment.to_string());
        }

        if let Some(clip) = audio {
            let transcript = self.stt.transcribe(clip).await.map_err(|source| {
                error!(number, error = %source, "transcription failed");
                NumberPracticeError::Service {
                    service: "speech-to-text",
                    source,
                }
            })?;
            let correct = self.judge.judge(number, &transcript, language).await?;
            result.audio_transcription = Some(transcript);
            result.audio_correct = Some(correct);
            let comment = if correct { AUDIO_CORRECT } else { AUDIO_INCORRECT };
            result.audio_comment = Some(comment.to_string());
        }

        let (record, stored) = self
            .recorder
            .record_and_submit(
                KnowledgeId::for_number(number),
                language,
                PracticeType::NumberPronunciation,
                ExerciseResult::Number(result.clone()),
            )
            .await;
        Ok(NumberOutcome { result, record, stored })
    }
}
