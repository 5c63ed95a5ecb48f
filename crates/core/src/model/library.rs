//! Read-only auxiliary resources served next to the knowledge corpus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One prompt definition used by the LLM-backed practices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub prompt_id: String,
    #[serde(rename = "descricao")]
    pub description: String,
    pub template: String,
    #[serde(rename = "parametros")]
    pub parameters: Vec<String>,
    #[serde(rename = "resposta_estruturada")]
    pub structured_reply: bool,
    #[serde(rename = "estrutura_esperada", default, skip_serializing_if = "Option::is_none")]
    pub expected_structure: Option<serde_json::Value>,
    #[serde(rename = "ultima_edicao")]
    pub last_edited: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBook {
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "data_atualizacao")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "marcador_de_paramentros")]
    pub parameter_marker: String,
    pub prompts: Vec<PromptEntry>,
}

impl PromptBook {
    #[must_use]
    pub fn find(&self, prompt_id: &str) -> Option<&PromptEntry> {
        self.prompts.iter().find(|p| p.prompt_id == prompt_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DialogueError {
    #[error("a dialogue needs at least one intermediate phrase")]
    NoIntermediatePhrases,
}

/// Fixed phrases framing a dialogue practice.
///
/// Always carries at least one intermediate phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDialoguePhrases", into = "RawDialoguePhrases")]
pub struct DialoguePhrases {
    greeting: String,
    farewell: String,
    intermediate: Vec<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDialoguePhrases {
    saudacao: String,
    despedida: String,
    intermediarias: Vec<String>,
}

impl DialoguePhrases {
    /// # Errors
    ///
    /// Returns `DialogueError::NoIntermediatePhrases` when `intermediate` is empty.
    pub fn new(
        greeting: impl Into<String>,
        farewell: impl Into<String>,
        intermediate: Vec<String>,
    ) -> Result<Self, DialogueError> {
        if intermediate.is_empty() {
            return Err(DialogueError::NoIntermediatePhrases);
        }
        Ok(Self {
            greeting: greeting.into(),
            farewell: farewell.into(),
            intermediate,
        })
    }

    #[must_use]
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    #[must_use]
    pub fn farewell(&self) -> &str {
        &self.farewell
    }

    #[must_use]
    pub fn intermediate(&self) -> &[String] {
        &self.intermediate
    }
}

impl TryFrom<RawDialoguePhrases> for DialoguePhrases {
    type Error = DialogueError;

    fn try_from(raw: RawDialoguePhrases) -> Result<Self, Self::Error> {
        Self::new(raw.saudacao, raw.despedida, raw.intermediarias)
    }
}

impl From<DialoguePhrases> for RawDialoguePhrases {
    fn from(phrases: DialoguePhrases) -> Self {
        Self {
            saudacao: phrases.greeting,
            despedida: phrases.farewell,
            intermediarias: phrases.intermediate,
        }
    }
}
