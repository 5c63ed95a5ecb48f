use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::{ExerciseId, KnowledgeId};
use crate::model::knowledge::{Field, Language};

//
// ─── PRACTICE TYPE ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PracticeType {
    #[serde(rename = "traducao")]
    Translation,
    #[serde(rename = "audicao")]
    Listening,
    #[serde(rename = "pronuncia")]
    Pronunciation,
    #[serde(rename = "dialogo")]
    Dialogue,
    #[serde(rename = "pronuncia_de_numeros")]
    NumberPronunciation,
}

impl fmt::Display for PracticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PracticeType::Translation => "translation",
            PracticeType::Listening => "listening",
            PracticeType::Pronunciation => "pronunciation",
            PracticeType::Dialogue => "dialogue",
            PracticeType::NumberPronunciation => "number pronunciation",
        };
        f.write_str(label)
    }
}

//
// ─── RESULT PAYLOADS ───────────────────────────────────────────────────────────
//

/// Three-valued correctness stored by pronunciation and dialogue exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Correctness {
    #[serde(rename = "Sim")]
    Yes,
    #[serde(rename = "Parcial")]
    Partial,
    #[serde(rename = "Não")]
    No,
}

/// Playback speed used in a listening exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Speed {
    #[default]
    #[serde(rename = "1.0")]
    Normal,
    #[serde(rename = "0.75")]
    Medium,
    #[serde(rename = "0.5")]
    Slow,
}

impl Speed {
    #[must_use]
    pub fn factor(self) -> f32 {
        match self {
            Speed::Normal => 1.0,
            Speed::Medium => 0.75,
            Speed::Slow => 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    #[serde(rename = "campo_fornecido")]
    pub provided_field: Field,
    #[serde(rename = "campos_preenchidos")]
    pub filled_fields: Vec<Field>,
    #[serde(rename = "valores_preenchidos")]
    pub filled_values: Vec<String>,
    #[serde(rename = "campos_resultados")]
    pub field_results: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListeningResult {
    #[serde(rename = "texto_original")]
    pub source_text: String,
    #[serde(rename = "transcricao_usuario")]
    pub user_transcription: String,
    #[serde(rename = "correto")]
    pub correct: bool,
    #[serde(rename = "velocidade_utilizada")]
    pub speed: Speed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronunciationResult {
    #[serde(rename = "texto_original")]
    pub source_text: String,
    #[serde(rename = "transcricao_stt")]
    pub stt_transcription: String,
    #[serde(rename = "correto")]
    pub correct: Correctness,
    #[serde(rename = "comentario")]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueResult {
    #[serde(rename = "correto")]
    pub correct: Correctness,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NumberResult {
    #[serde(rename = "numero_referencia")]
    pub reference_number: String,
    #[serde(rename = "texto_usuario", default, skip_serializing_if = "Option::is_none")]
    pub user_text: Option<String>,
    #[serde(rename = "texto_correto", default, skip_serializing_if = "Option::is_none")]
    pub text_correct: Option<bool>,
    #[serde(rename = "texto_comentario", default, skip_serializing_if = "Option::is_none")]
    pub text_comment: Option<String>,
    #[serde(rename = "audio_transcricao", default, skip_serializing_if = "Option::is_none")]
    pub audio_transcription: Option<String>,
    #[serde(rename = "audio_correto", default, skip_serializing_if = "Option::is_none")]
    pub audio_correct: Option<bool>,
    #[serde(rename = "audio_comentario", default, skip_serializing_if = "Option::is_none")]
    pub audio_comment: Option<String>,
}

/// Practice-specific payload of an exercise record.
///
/// The backend stores these without a tag; variant order matters when
/// reading history back, and anything unrecognised is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExerciseResult {
    Translation(TranslationResult),
    Listening(ListeningResult),
    Pronunciation(PronunciationResult),
    Number(NumberResult),
    Dialogue(DialogueResult),
    Other(serde_json::Value),
}

//
// ─── EXERCISE RECORD ───────────────────────────────────────────────────────────
//

/// One completed practice attempt, as submitted to the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    #[serde(rename = "data_hora")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "exercicio_id")]
    pub exercise_id: ExerciseId,
    #[serde(rename = "conhecimento_id")]
    pub knowledge_item_id: KnowledgeId,
    #[serde(rename = "idioma")]
    pub language: Language,
    #[serde(rename = "tipo_pratica")]
    pub practice_type: PracticeType,
    #[serde(rename = "resultado_exercicio")]
    pub result: ExerciseResult,
}

impl ExerciseRecord {
    /// Build a record with a fresh exercise id.
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        knowledge_item_id: KnowledgeId,
        language: Language,
        practice_type: PracticeType,
        result: ExerciseResult,
    ) -> Self {
        Self {
            timestamp,
            exercise_id: ExerciseId::random(),
            knowledge_item_id,
            language,
            practice_type,
            result,
        }
    }
}

/// Full practice history as served by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PracticeHistory {
    #[serde(rename = "exercicios")]
    pub exercises: Vec<ExerciseRecord>,
}

impl PracticeHistory {
    /// Exercises of the given practice type, newest first.
    #[must_use]
    pub fn recent(&self, practice_type: Option<PracticeType>) -> Vec<&ExerciseRecord> {
        let mut out: Vec<_> = self
            .exercises
            .iter()
            .filter(|e| practice_type.is_none_or(|t| e.practice_type == t))
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }
}
