//! Contracts for the speech and language-model services the practices lean on.
//!
//! These are black boxes: the session logic only sees text or bytes coming back.

use async_trait::async_trait;
use lingua_core::model::Speed;
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

/// A recorded learner answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl AudioClip {
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Audio produced by the text-to-speech service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl SynthesizedAudio {
    /// File extension matching the MIME type, `bin` when unknown.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.mime_type.split(';').next().unwrap_or_default().trim() {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/ogg" => "ogg",
            "audio/webm" => "webm",
            _ => "bin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a recorded clip to text.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the transcription service fails.
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, StorageError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` as speech at the given speed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the synthesis service fails.
    async fn synthesize(&self, text: &str, speed: Speed) -> Result<SynthesizedAudio, StorageError>;
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a conversation and return the assistant's reply text.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the model service fails.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_mime_type() {
        let audio = SynthesizedAudio {
            bytes: vec![1],
            mime_type: "audio/mpeg; codecs=mp3".into(),
        };
        assert_eq!(audio.extension(), "mp3");
        let unknown = SynthesizedAudio {
            bytes: vec![],
            mime_type: "application/octet-stream".into(),
        };
        assert_eq!(unknown.extension(), "bin");
    }
}
