//! Dialogue practice: a greeting, a few random questions answered aloud, a farewell.
//!
//! Each spoken answer is judged for coherence by a chat model. At the end the
//! model reads the whole exchange back and extracts what the learner said
//! about themselves.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument};

use lingua_core::model::{
    Correctness, DialoguePhrases, DialogueResult, ExerciseRecord, ExerciseResult, KnowledgeId,
    Language, PracticeType, Speed,
};
use storage::media::{
    AudioClip, ChatMessage, ChatModel, SpeechSynthesizer, SpeechToText, SynthesizedAudio,
};

use crate::error::DialoguePracticeError;
use crate::numbers::strip_code_fences;
use crate::recorder::{ExerciseRecorder, RecordOutcome};

/// Stands in for the learner's unjudged reply to the greeting.
pub const GREETING_REPLY: &str = "[greeting recorded]";

//
// ─── STAGES AND TURNS ──────────────────────────────────────────────────────────
//

/// ```text
/// Greeting -> Intermediate -> Farewell -> Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueStage {
    Greeting,
    Intermediate,
    Farewell,
    Finished,
}

impl fmt::Display for DialogueStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DialogueStage::Greeting => "greeting",
            DialogueStage::Intermediate => "question",
            DialogueStage::Farewell => "farewell",
            DialogueStage::Finished => "finished",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    App,
    Learner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueTurn {
    pub speaker: Speaker,
    pub text: String,
    /// Only set on judged learner replies.
    pub coherent: Option<bool>,
}

impl DialogueTurn {
    fn app(text: &str) -> Self {
        Self {
            speaker: Speaker::App,
            text: text.to_string(),
            coherent: None,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One run through the dialogue phrases. Each intermediate phrase is asked once.
#[derive(Debug, Clone)]
pub struct DialogueSession {
    language: Language,
    phrases: DialoguePhrases,
    stage: DialogueStage,
    current: String,
    asked: HashSet<usize>,
    answered: bool,
    turns: Vec<DialogueTurn>,
}

impl DialogueSession {
    #[must_use]
    pub fn new(phrases: DialoguePhrases, language: Language) -> Self {
        let current = phrases.greeting().to_string();
        Self {
            language,
            turns: vec![DialogueTurn::app(&current)],
            phrases,
            stage: DialogueStage::Greeting,
            current,
            asked: HashSet::new(),
            answered: false,
        }
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn stage(&self) -> DialogueStage {
        self.stage
    }

    /// The phrase the learner is expected to answer.
    #[must_use]
    pub fn current_phrase(&self) -> &str {
        &self.current
    }

    #[must_use]
    pub fn turns(&self) -> &[DialogueTurn] {
        &self.turns
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    /// `(coherent, judged)` over the learner's replies.
    #[must_use]
    pub fn coherence(&self) -> (usize, usize) {
        let judged: Vec<bool> = self.turns.iter().filter_map(|t| t.coherent).collect();
        (judged.iter().filter(|c| **c).count(), judged.len())
    }

    /// The exchange as `App:`/`Learner:` lines.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| match turn.speaker {
                Speaker::App => format!("App: {}", turn.text),
                Speaker::Learner => format!("Learner: {}", turn.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn expect_stage(&self, stage: DialogueStage) -> Result<(), DialoguePracticeError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(DialoguePracticeError::WrongStage(self.stage))
        }
    }

    /// Leave the greeting and ask the first question.
    ///
    /// # Errors
    ///
    /// Returns `DialoguePracticeError::WrongStage` outside the greeting.
    pub fn confirm_greeting<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<&str, DialoguePracticeError> {
        self.expect_stage(DialogueStage::Greeting)?;
        self.turns.push(DialogueTurn {
            speaker: Speaker::Learner,
            text: GREETING_REPLY.to_string(),
            coherent: None,
        });
        self.stage = DialogueStage::Intermediate;
        self.ask_next(rng);
        Ok(&self.current)
    }

    /// Ask another unasked question, or move on to the farewell when none is left.
    ///
    /// # Errors
    ///
    /// Returns `DialoguePracticeError::WrongStage` outside the question stage.
    pub fn next_phrase<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<&str, DialoguePracticeError> {
        self.expect_stage(DialogueStage::Intermediate)?;
        self.ask_next(rng);
        Ok(&self.current)
    }

    fn ask_next<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let unasked: Vec<usize> = (0..self.phrases.intermediate().len())
            .filter(|i| !self.asked.contains(i))
            .collect();
        self.answered = false;
        match unasked.choose(rng) {
            Some(&index) => {
                self.asked.insert(index);
                self.current = self.phrases.intermediate()[index].clone();
                debug!(index, left = unasked.len() - 1, "asking dialogue phrase");
            }
            None => {
                self.stage = DialogueStage::Farewell;
                self.current = self.phrases.farewell().to_string();
            }
        }
        self.turns.push(DialogueTurn::app(&self.current));
    }

    fn record_reply(&mut self, transcript: &str, coherent: bool) {
        self.turns.push(DialogueTurn {
            speaker: Speaker::Learner,
            text: transcript.to_string(),
            coherent: Some(coherent),
        });
        self.answered = true;
    }
}

//
// ─── JUDGE ─────────────────────────────────────────────────────────────────────
//

/// What the learner told about themselves during the dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterlocutorDetails {
    pub name: String,
    pub age: String,
    pub height: String,
    pub weight: String,
}

#[async_trait]
pub trait DialogueJudge: Send + Sync {
    /// Whether `answer` is a coherent reply to `question`.
    ///
    /// # Errors
    ///
    /// Returns `DialoguePracticeError` if the judge is unreachable or its reply is unreadable.
    async fn coherent(
        &self,
        language: Language,
        question: &str,
        answer: &str,
    ) -> Result<bool, DialoguePracticeError>;

    /// Extract the learner's details from the whole dialogue.
    ///
    /// # Errors
    ///
    /// Returns `DialoguePracticeError` if the judge is unreachable or its reply is unreadable.
    async fn interlocutor(
        &self,
        language: Language,
        dialogue: &str,
    ) -> Result<InterlocutorDetails, DialoguePracticeError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

#[derive(Deserialize)]
struct CoherenceReply {
    coerente: Flag,
}

/// Read a `{"coerente": true}` reply. `"True"` as a string is accepted too.
///
/// # Errors
///
/// Returns `DialoguePracticeError::UnparseableReply` with the cleaned text.
pub fn parse_coherence_reply(reply: &str) -> Result<bool, DialoguePracticeError> {
    let cleaned = strip_code_fences(reply);
    match serde_json::from_str::<CoherenceReply>(&cleaned) {
        Ok(CoherenceReply { coerente: Flag::Bool(flag) }) => Ok(flag),
        Ok(CoherenceReply { coerente: Flag::Text(text) }) => {
            Ok(text.trim().eq_ignore_ascii_case("true"))
        }
        Err(_) => Err(DialoguePracticeError::UnparseableReply(cleaned)),
    }
}

/// Read a `{"nome", "idade", "altura", "peso"}` reply. Missing keys stay empty.
///
/// # Errors
///
/// Returns `DialoguePracticeError::UnparseableReply` unless the reply is a JSON object.
pub fn parse_interlocutor_reply(reply: &str) -> Result<InterlocutorDetails, DialoguePracticeError> {
    let cleaned = strip_code_fences(reply);
    let Ok(fields) = serde_json::from_str::<Map<String, Value>>(&cleaned) else {
        return Err(DialoguePracticeError::UnparseableReply(cleaned));
    };
    let text = |key: &str| match fields.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    Ok(InterlocutorDetails {
        name: text("nome"),
        age: text("idade"),
        height: text("altura"),
        weight: text("peso"),
    })
}

/// [`DialogueJudge`] backed by a chat model.
#[derive(Clone)]
pub struct LlmDialogueJudge {
    chat: Arc<dyn ChatModel>,
}

impl LlmDialogueJudge {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    async fn ask(&self, prompt: String) -> Result<String, DialoguePracticeError> {
        self.chat
            .chat(&[ChatMessage::user(prompt)])
            .await
            .map_err(|source| DialoguePracticeError::Service {
                service: "chat",
                source,
            })
    }
}

#[async_trait]
impl DialogueJudge for LlmDialogueJudge {
    async fn coherent(
        &self,
        language: Language,
        question: &str,
        answer: &str,
    ) -> Result<bool, DialoguePracticeError> {
        let prompt = format!(
            "In a {} conversation practice the learner was asked: \"{question}\".\n\
             They answered: \"{answer}\".\n\
             Is the answer a coherent reply to the question? \
             Reply only with JSON: {{\"coerente\": true}} or {{\"coerente\": false}}.",
            language.display_name()
        );
        parse_coherence_reply(&self.ask(prompt).await?)
    }

    async fn interlocutor(
        &self,
        language: Language,
        dialogue: &str,
    ) -> Result<InterlocutorDetails, DialoguePracticeError> {
        let prompt = format!(
            "Below is a {} conversation between an app and a learner.\n\n{dialogue}\n\n\
             Extract what the learner said about themselves. Reply only with JSON: \
             {{\"nome\": \"\", \"idade\": \"\", \"altura\": \"\", \"peso\": \"\"}}, \
             leaving unknown values empty.",
            language.display_name()
        );
        parse_interlocutor_reply(&self.ask(prompt).await?)
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// A judged spoken reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueReply {
    pub transcript: String,
    pub coherent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueOutcome {
    pub interlocutor: InterlocutorDetails,
    pub result: DialogueResult,
    pub record: ExerciseRecord,
    pub stored: RecordOutcome,
}

/// All replies coherent is `Yes`, none (or none judged) is `No`, anything else `Partial`.
#[must_use]
pub fn overall_correctness((coherent, judged): (usize, usize)) -> Correctness {
    match coherent {
        0 => Correctness::No,
        n if n == judged => Correctness::Yes,
        _ => Correctness::Partial,
    }
}

#[derive(Clone)]
pub struct DialoguePracticeService {
    judge: Arc<dyn DialogueJudge>,
    stt: Arc<dyn SpeechToText>,
    tts: Arc<dyn SpeechSynthesizer>,
    recorder: ExerciseRecorder,
}

impl DialoguePracticeService {
    #[must_use]
    pub fn new(
        judge: Arc<dyn DialogueJudge>,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn SpeechSynthesizer>,
        recorder: ExerciseRecorder,
    ) -> Self {
        Self {
            judge,
            stt,
            tts,
            recorder,
        }
    }

    /// Render the current phrase as speech.
    ///
    /// # Errors
    ///
    /// Returns `DialoguePracticeError::Service` when the synthesizer fails.
    pub async fn speak(
        &self,
        session: &DialogueSession,
        speed: Speed,
    ) -> Result<SynthesizedAudio, DialoguePracticeError> {
        self.tts
            .synthesize(session.current_phrase(), speed)
            .await
            .map_err(|source| {
                error!(stage = %session.stage(), error = %source, "failed to generate audio");
                DialoguePracticeError::Service {
                    service: "text-to-speech",
                    source,
                }
            })
    }

    /// Transcribe the learner's answer to the current question and judge it.
    ///
    /// Nothing changes in the session when any step fails.
    ///
    /// # Errors
    ///
    /// Returns `WrongStage` outside the question stage, `AlreadyAnswered`,
    /// `EmptyRecording`, or the errors of the speech and chat services.
    #[instrument(skip_all, fields(bytes = clip.bytes.len()))]
    pub async fn reply(
        &self,
        session: &mut DialogueSession,
        clip: &AudioClip,
    ) -> Result<DialogueReply, DialoguePracticeError> {
        session.expect_stage(DialogueStage::Intermediate)?;
        if session.is_answered() {
            return Err(DialoguePracticeError::AlreadyAnswered);
        }
        if clip.is_empty() {
            return Err(DialoguePracticeError::EmptyRecording);
        }

        let transcript = self.stt.transcribe(clip).await.map_err(|source| {
            error!(error = %source, "transcription failed");
            DialoguePracticeError::Service {
                service: "speech-to-text",
                source,
            }
        })?;
        let transcript = transcript.trim().to_string();
        let coherent = self
            .judge
            .coherent(session.language(), session.current_phrase(), &transcript)
            .await?;

        session.record_reply(&transcript, coherent);
        Ok(DialogueReply {
            transcript,
            coherent,
        })
    }

    /// Close the dialogue after the farewell and record it.
    ///
    /// The session stays at the farewell if the judge fails, so this can be retried.
    ///
    /// # Errors
    ///
    /// Returns `WrongStage` before the farewell, or the errors of the chat service.
    pub async fn finish(
        &self,
        session: &mut DialogueSession,
    ) -> Result<DialogueOutcome, DialoguePracticeError> {
        session.expect_stage(DialogueStage::Farewell)?;
        let interlocutor = self
            .judge
            .interlocutor(session.language(), &session.transcript())
            .await?;
        session.stage = DialogueStage::Finished;

        let result = DialogueResult {
            correct: overall_correctness(session.coherence()),
        };
        let (record, stored) = self
            .recorder
            .record_and_submit(
                KnowledgeId::dialogue(),
                session.language(),
                PracticeType::Dialogue,
                ExerciseResult::Dialogue(result.clone()),
            )
            .await;
        info!(correct = ?result.correct, turns = session.turns().len(), "dialogue finished");
        Ok(DialogueOutcome {
            interlocutor,
            result,
            record,
            stored,
        })
    }
}
