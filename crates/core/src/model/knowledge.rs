use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::KnowledgeId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KnowledgeError {
    #[error("source text cannot be empty")]
    EmptySourceText,

    #[error("translation cannot be empty")]
    EmptyTranslation,

    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("unknown knowledge type: {0}")]
    UnknownKnowledgeType(String),

    #[error("unknown field: {0}")]
    UnknownField(String),
}

//
// ─── LANGUAGE ──────────────────────────────────────────────────────────────────
//

/// Language a knowledge item belongs to.
///
/// Declaration order matches the backend's string order so sorting a set of
/// languages gives the same default selection the web pages used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "alemao")]
    German,
    #[serde(rename = "ingles")]
    English,
}

impl Language {
    /// Identifier used by the backend.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::German => "alemao",
            Language::English => "ingles",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Language::German => "German",
            Language::English => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Language {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alemao" | "german" | "de" => Ok(Language::German),
            "ingles" | "english" | "en" => Ok(Language::English),
            other => Err(KnowledgeError::UnknownLanguage(other.to_string())),
        }
    }
}

//
// ─── KNOWLEDGE TYPE ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KnowledgeType {
    #[serde(rename = "frase")]
    Phrase,
    #[serde(rename = "palavra")]
    Word,
}

impl KnowledgeType {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            KnowledgeType::Phrase => "frase",
            KnowledgeType::Word => "palavra",
        }
    }
}

impl fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeType::Phrase => f.write_str("phrase"),
            KnowledgeType::Word => f.write_str("word"),
        }
    }
}

impl FromStr for KnowledgeType {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "frase" | "phrase" => Ok(KnowledgeType::Phrase),
            "palavra" | "word" => Ok(KnowledgeType::Word),
            other => Err(KnowledgeError::UnknownKnowledgeType(other.to_string())),
        }
    }
}

//
// ─── FIELD ─────────────────────────────────────────────────────────────────────
//

/// A textual field of a knowledge item that a practice can show or ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "texto_original")]
    SourceText,
    #[serde(rename = "divisao_silabica")]
    SyllableDivision,
    #[serde(rename = "transcricao_ipa")]
    PhoneticTranscription,
    #[serde(rename = "traducao")]
    Translation,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::SourceText,
        Field::SyllableDivision,
        Field::PhoneticTranscription,
        Field::Translation,
    ];

    /// The fields a learner fills in when `self` is the one shown.
    pub fn dependents(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| *f != self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Field::SourceText => "source text",
            Field::SyllableDivision => "syllable division",
            Field::PhoneticTranscription => "phonetic transcription",
            Field::Translation => "translation",
        };
        f.write_str(label)
    }
}

impl FromStr for Field {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "texto_original" | "source_text" | "source" => Ok(Field::SourceText),
            "divisao_silabica" | "syllable_division" | "syllables" => Ok(Field::SyllableDivision),
            "transcricao_ipa" | "phonetic_transcription" | "ipa" => {
                Ok(Field::PhoneticTranscription)
            }
            "traducao" | "translation" => Ok(Field::Translation),
            other => Err(KnowledgeError::UnknownField(other.to_string())),
        }
    }
}

//
// ─── KNOWLEDGE ITEM ────────────────────────────────────────────────────────────
//

/// One vocabulary or phrase record from the knowledge corpus.
///
/// Items are owned by the backend; sessions only read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    #[serde(rename = "conhecimento_id")]
    id: KnowledgeId,
    #[serde(rename = "data_hora")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "idioma")]
    language: Language,
    #[serde(rename = "tipo_conhecimento")]
    knowledge_type: KnowledgeType,
    #[serde(rename = "texto_original")]
    source_text: String,
    #[serde(rename = "transcricao_ipa", default, skip_serializing_if = "Option::is_none")]
    phonetic_transcription: Option<String>,
    #[serde(rename = "traducao")]
    translation: String,
    #[serde(rename = "divisao_silabica", default, skip_serializing_if = "Option::is_none")]
    syllable_division: Option<String>,
}

impl KnowledgeItem {
    /// Build an item with only the mandatory fields.
    ///
    /// # Errors
    ///
    /// Returns `KnowledgeError` if source text or translation is blank.
    pub fn new(
        id: KnowledgeId,
        language: Language,
        knowledge_type: KnowledgeType,
        source_text: impl Into<String>,
        translation: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, KnowledgeError> {
        let source_text = source_text.into();
        let translation = translation.into();
        if source_text.trim().is_empty() {
            return Err(KnowledgeError::EmptySourceText);
        }
        if translation.trim().is_empty() {
            return Err(KnowledgeError::EmptyTranslation);
        }
        Ok(Self {
            id,
            timestamp,
            language,
            knowledge_type,
            source_text,
            phonetic_transcription: None,
            translation,
            syllable_division: None,
        })
    }

    #[must_use]
    pub fn with_phonetic_transcription(mut self, ipa: impl Into<String>) -> Self {
        self.phonetic_transcription = Some(ipa.into());
        self
    }

    #[must_use]
    pub fn with_syllable_division(mut self, syllables: impl Into<String>) -> Self {
        self.syllable_division = Some(syllables.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &KnowledgeId {
        &self.id
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn knowledge_type(&self) -> KnowledgeType {
        self.knowledge_type
    }

    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    #[must_use]
    pub fn translation(&self) -> &str {
        &self.translation
    }

    #[must_use]
    pub fn phonetic_transcription(&self) -> Option<&str> {
        self.phonetic_transcription.as_deref()
    }

    #[must_use]
    pub fn syllable_division(&self) -> Option<&str> {
        self.syllable_division.as_deref()
    }

    /// Value of the given field, `None` when the item does not carry it.
    #[must_use]
    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::SourceText => Some(self.source_text()),
            Field::Translation => Some(self.translation()),
            Field::PhoneticTranscription => self.phonetic_transcription(),
            Field::SyllableDivision => self.syllable_division(),
        }
    }
}
