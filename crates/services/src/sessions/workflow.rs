use std::sync::Arc;

use rand::Rng;
use tracing::{error, info, instrument};

use lingua_core::filter::default_criteria;
use lingua_core::model::{
    ExerciseRecord, ExerciseResult, Field, FilterCriteria, KnowledgeItem, ListeningResult,
    PracticeType, PronunciationResult, Speed, TranslationResult,
};
use lingua_core::verify::{
    VerificationResult, VerifyError, verify_batch, verify_exact, verify_punctuation_insensitive,
};
use storage::media::{AudioClip, SpeechSynthesizer, SpeechToText, SynthesizedAudio};
use storage::repository::StorageError;

use super::progress::SessionProgress;
use super::service::PracticeSession;
use crate::error::SessionError;
use crate::recorder::{ExerciseRecorder, RecordOutcome};

/// A typed learner answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextAnswer {
    /// Translation practice: `provided` was shown, `answers` fill the others.
    Translation {
        provided: Field,
        answers: Vec<(Field, String)>,
    },
    /// Single-field drill: [`TextAnswer::drill_prompt`] was shown, `field` is asked.
    Field { field: Field, value: String },
    /// Listening practice: what the learner heard, and at which speed.
    Listening { transcript: String, speed: Speed },
}

impl TextAnswer {
    /// Field shown while drilling `asked`: the source text, or the
    /// translation when the source text itself is asked.
    #[must_use]
    pub fn drill_prompt(asked: Field) -> Field {
        if asked == Field::SourceText {
            Field::Translation
        } else {
            Field::SourceText
        }
    }

    fn practice_type(&self) -> PracticeType {
        match self {
            TextAnswer::Translation { .. } | TextAnswer::Field { .. } => PracticeType::Translation,
            TextAnswer::Listening { .. } => PracticeType::Listening,
        }
    }
}

/// Everything the caller needs after an attempt was judged.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub result: VerificationResult,
    pub record: ExerciseRecord,
    pub stored: RecordOutcome,
    pub progress: SessionProgress,
}

/// An item ready for listening practice, with its audio at both speeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListeningPrompt {
    pub item: KnowledgeItem,
    pub normal: SynthesizedAudio,
    pub slow: SynthesizedAudio,
}

/// Drives practice sessions end to end: presentation, checking, recording.
#[derive(Clone)]
pub struct PracticeLoopService {
    recorder: ExerciseRecorder,
    stt: Arc<dyn SpeechToText>,
    tts: Arc<dyn SpeechSynthesizer>,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(
        recorder: ExerciseRecorder,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self { recorder, stt, tts }
    }

    #[must_use]
    pub fn recorder(&self) -> &ExerciseRecorder {
        &self.recorder
    }

    /// Start a session. Without explicit criteria the first available
    /// language is used with every knowledge type; an empty corpus leaves
    /// the session in setup.
    #[must_use]
    pub fn start_session(
        &self,
        corpus: &[KnowledgeItem],
        criteria: Option<FilterCriteria>,
    ) -> PracticeSession {
        match criteria.or_else(|| default_criteria(corpus)) {
            Some(criteria) => {
                let session = PracticeSession::new(criteria, corpus);
                let candidates = session.candidates().len();
                info!(%criteria, candidates, "practice session started");
                session
            }
            None => PracticeSession::setup(),
        }
    }

    /// Present the next item and prepare its audio at normal and slow speed.
    ///
    /// Returns `Ok(None)` once the session is complete. When synthesis fails
    /// the item is withdrawn so that nothing is presented without audio.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Service` when the speech synthesizer fails, or
    /// the state errors of [`PracticeSession::present_next`].
    pub async fn next_listening<R: Rng + ?Sized>(
        &self,
        session: &mut PracticeSession,
        rng: &mut R,
    ) -> Result<Option<ListeningPrompt>, SessionError> {
        let Some(item) = session.present_next(rng)?.cloned() else {
            return Ok(None);
        };
        let synthesized = async {
            let normal = self.tts.synthesize(item.source_text(), Speed::Normal).await?;
            let slow = self.tts.synthesize(item.source_text(), Speed::Slow).await?;
            Ok::<_, StorageError>((normal, slow))
        }
        .await;
        match synthesized {
            Ok((normal, slow)) => Ok(Some(ListeningPrompt { item, normal, slow })),
            Err(source) => {
                error!(item = %item.id(), error = %source, "failed to generate audio");
                session.withdraw_current()?;
                Err(SessionError::Service {
                    service: "text-to-speech",
                    source,
                })
            }
        }
    }

    /// Check a typed answer against the presented item and record the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidAnswer` for unusable input (the item
    /// stays presented), or the state errors of
    /// [`PracticeSession::begin_verification`].
    #[instrument(skip_all, fields(practice = %answer.practice_type()))]
    pub async fn answer_text(
        &self,
        session: &mut PracticeSession,
        answer: TextAnswer,
    ) -> Result<AttemptOutcome, SessionError> {
        let item = session.begin_verification()?;
        let judged = match &answer {
            TextAnswer::Translation { provided, answers } => {
                verify_batch(&item, *provided, answers).map(|batch| {
                    (
                        batch.summary(),
                        ExerciseResult::Translation(batch.to_translation_result()),
                    )
                })
            }
            TextAnswer::Field { field, value } => {
                if value.trim().is_empty() {
                    Err(VerifyError::NoAnswers)
                } else {
                    let result = verify_exact(item.field(*field).unwrap_or_default(), value);
                    let payload = ExerciseResult::Translation(TranslationResult {
                        provided_field: TextAnswer::drill_prompt(*field),
                        filled_fields: vec![*field],
                        filled_values: vec![result.user_value.clone()],
                        field_results: vec![result.verdict.is_correct()],
                    });
                    Ok((result, payload))
                }
            }
            TextAnswer::Listening { transcript, speed } => {
                if transcript.trim().is_empty() {
                    Err(VerifyError::NoAnswers)
                } else {
                    let result = verify_punctuation_insensitive(item.source_text(), transcript);
                    let payload = ExerciseResult::Listening(ListeningResult {
                        source_text: item.source_text().to_string(),
                        user_transcription: transcript.trim().to_string(),
                        correct: result.verdict.is_correct(),
                        speed: *speed,
                    });
                    Ok((result, payload))
                }
            }
        };

        let (result, payload) = match judged {
            Ok(judged) => judged,
            Err(err) => {
                session.abort_verification()?;
                return Err(err.into());
            }
        };
        self.conclude(session, &item, answer.practice_type(), result, payload)
            .await
    }

    /// Transcribe a spoken answer and check it against the item's source text.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyRecording` for an empty clip and
    /// `SessionError::Service` when transcription fails. Either way the item
    /// stays presented so the learner can retry.
    #[instrument(skip_all, fields(bytes = clip.bytes.len()))]
    pub async fn answer_audio(
        &self,
        session: &mut PracticeSession,
        clip: &AudioClip,
    ) -> Result<AttemptOutcome, SessionError> {
        let item = session.begin_verification()?;
        if clip.is_empty() {
            session.abort_verification()?;
            return Err(SessionError::EmptyRecording);
        }

        let transcript = match self.stt.transcribe(clip).await {
            Ok(text) => text,
            Err(source) => {
                error!(item = %item.id(), error = %source, "transcription failed");
                session.abort_verification()?;
                return Err(SessionError::Service {
                    service: "speech-to-text",
                    source,
                });
            }
        };

        let result = verify_punctuation_insensitive(item.source_text(), &transcript);
        let payload = ExerciseResult::Pronunciation(PronunciationResult {
            source_text: item.source_text().to_string(),
            stt_transcription: transcript.trim().to_string(),
            correct: result.verdict.into(),
            comment: result.comment.clone(),
        });
        self.conclude(session, &item, PracticeType::Pronunciation, result, payload)
            .await
    }

    async fn conclude(
        &self,
        session: &mut PracticeSession,
        item: &KnowledgeItem,
        practice_type: PracticeType,
        result: VerificationResult,
        payload: ExerciseResult,
    ) -> Result<AttemptOutcome, SessionError> {
        let (record, stored) = self
            .recorder
            .record_and_submit(item.id().clone(), item.language(), practice_type, payload)
            .await;
        let result = session.finish_verification(result)?.clone();
        Ok(AttemptOutcome {
            result,
            record,
            stored,
            progress: session.progress(),
        })
    }
}
