//! REST adapter for the practice backend.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lingua_core::model::{
    DialoguePhrases, ExerciseRecord, KnowledgeItem, PracticeHistory, PromptBook, Speed,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::media::{
    AudioClip, ChatMessage, ChatModel, SpeechSynthesizer, SpeechToText, SynthesizedAudio,
};
use crate::repository::{
    DialogueRepository, HistoryRepository, KnowledgeRepository, PromptRepository, StorageError,
};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3010";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const KNOWLEDGE_PATH: &str = "/api/base_de_conhecimento";
const HISTORY_PATH: &str = "/api/historico_de_pratica";
const PROMPTS_PATH: &str = "/api/prompts";
const DIALOGUE_PATH: &str = "/api/frases_do_dialogo";
const TRANSCRIBE_PATH: &str = "/api/transcrever-audio";
const SYNTHESIZE_PATH: &str = "/api/generate-audio";
const CHAT_PATH: &str = "/api/chat";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendConfigError {
    #[error("invalid backend url {raw:?}: {source}")]
    InvalidUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("backend url must use http or https: {0}")]
    UnsupportedScheme(String),
    #[error("invalid timeout seconds: {0:?}")]
    InvalidTimeout(String),
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl BackendConfig {
    /// # Errors
    ///
    /// Returns `BackendConfigError` when the URL does not parse or is not http(s).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendConfigError> {
        let parsed = Url::parse(base_url.trim()).map_err(|source| BackendConfigError::InvalidUrl {
            raw: base_url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackendConfigError::UnsupportedScheme(base_url.to_string()));
        }
        Ok(Self {
            base_url: parsed,
            timeout,
        })
    }

    /// Read `LINGUA_BACKEND_URL` and `LINGUA_HTTP_TIMEOUT_SECS`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `BackendConfigError` when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, BackendConfigError> {
        let base_url =
            env::var("LINGUA_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.into());
        let timeout = match env::var("LINGUA_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| BackendConfigError::InvalidTimeout(raw.clone()))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Self::new(&base_url, Duration::from_secs(timeout))
    }

    /// Full URL for an API path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

/// One client for every backend endpoint: the four resources plus speech and chat.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

fn transport_error(err: &reqwest::Error) -> StorageError {
    if err.is_decode() {
        StorageError::Serialization(err.to_string())
    } else {
        StorageError::Connection(err.to_string())
    }
}

impl HttpBackend {
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| transport_error(&e))?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn check(response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status(status.as_u16()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StorageError> {
        let url = self.config.endpoint(path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        Self::check(response)?
            .json::<T>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StorageError> {
        let url = self.config.endpoint(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        Self::check(response)?
            .json::<T>()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl KnowledgeRepository for HttpBackend {
    async fn fetch_corpus(&self) -> Result<Vec<KnowledgeItem>, StorageError> {
        self.get_json(KNOWLEDGE_PATH).await
    }
}

#[async_trait]
impl HistoryRepository for HttpBackend {
    async fn fetch_history(&self) -> Result<PracticeHistory, StorageError> {
        self.get_json(HISTORY_PATH).await
    }

    async fn append_exercise(&self, record: &ExerciseRecord) -> Result<(), StorageError> {
        // The backend echoes the updated history; only the status matters here.
        let url = self.config.endpoint(HISTORY_PATH);
        debug!(%url, exercise_id = %record.exercise_id, "POST exercise");
        let response = self
            .client
            .post(url)
            .json(record)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        Self::check(response).map(|_| ())
    }
}

#[async_trait]
impl PromptRepository for HttpBackend {
    async fn fetch_prompts(&self) -> Result<PromptBook, StorageError> {
        self.get_json(PROMPTS_PATH).await
    }
}

#[async_trait]
impl DialogueRepository for HttpBackend {
    async fn fetch_dialogue_phrases(&self) -> Result<DialoguePhrases, StorageError> {
        self.get_json(DIALOGUE_PATH).await
    }
}

#[async_trait]
impl SpeechToText for HttpBackend {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, StorageError> {
        let part = Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.mime_type)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let form = Form::new().part("audio", part);
        let url = self.config.endpoint(TRANSCRIBE_PATH);
        debug!(%url, bytes = clip.bytes.len(), "POST audio for transcription");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let body: TranscriptionResponse = Self::check(response)?
            .json()
            .await
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(body.text)
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpBackend {
    async fn synthesize(&self, text: &str, speed: Speed) -> Result<SynthesizedAudio, StorageError> {
        let body: AudioResponse = self
            .post_json(
                SYNTHESIZE_PATH,
                &AudioRequest {
                    text,
                    speed: speed.factor(),
                },
            )
            .await?;
        body.into_audio()
    }
}

#[async_trait]
impl ChatModel for HttpBackend {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, StorageError> {
        let body: ChatResponse = self.post_json(CHAT_PATH, &ChatRequest { messages }).await?;
        Ok(body.message.content)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct AudioRequest<'a> {
    text: &'a str,
    speed: f32,
}

#[derive(Debug, Deserialize)]
struct AudioResponse {
    audio: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

impl AudioResponse {
    fn into_audio(self) -> Result<SynthesizedAudio, StorageError> {
        let bytes = STANDARD
            .decode(self.audio.trim())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(SynthesizedAudio {
            bytes,
            mime_type: self.mime_type,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}
