use async_trait::async_trait;
use lingua_core::model::{
    DialoguePhrases, ExerciseRecord, KnowledgeItem, PracticeHistory, PromptBook,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend responded with status {0}")]
    Status(u16),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read access to the knowledge corpus.
///
/// The backend has no server-side filtering; callers always get the full list.
#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    /// Fetch every knowledge item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the corpus cannot be loaded.
    async fn fetch_corpus(&self) -> Result<Vec<KnowledgeItem>, StorageError>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Fetch the whole practice history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the history cannot be loaded.
    async fn fetch_history(&self) -> Result<PracticeHistory, StorageError>;

    /// Append one exercise record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record was not accepted.
    async fn append_exercise(&self, record: &ExerciseRecord) -> Result<(), StorageError>;
}

#[async_trait]
pub trait PromptRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the prompt book cannot be loaded.
    async fn fetch_prompts(&self) -> Result<PromptBook, StorageError>;
}

#[async_trait]
pub trait DialogueRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the dialogue phrases cannot be loaded.
    async fn fetch_dialogue_phrases(&self) -> Result<DialoguePhrases, StorageError>;
}

/// Simple in-memory repository implementation for testing and offline use.
///
/// Appends can be switched to fail so callers can exercise their
/// best-effort persistence paths.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    corpus: Arc<Mutex<Vec<KnowledgeItem>>>,
    history: Arc<Mutex<PracticeHistory>>,
    prompts: Arc<Mutex<Option<PromptBook>>>,
    dialogue: Arc<Mutex<Option<DialoguePhrases>>>,
    fail_appends: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_corpus(corpus: Vec<KnowledgeItem>) -> Self {
        let repo = Self::new();
        if let Ok(mut guard) = repo.corpus.lock() {
            *guard = corpus;
        }
        repo
    }

    /// Replace the corpus.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_corpus(&self, corpus: Vec<KnowledgeItem>) -> Result<(), StorageError> {
        let mut guard = self
            .corpus
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = corpus;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_prompts(&self, prompts: PromptBook) -> Result<(), StorageError> {
        let mut guard = self
            .prompts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(prompts);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_dialogue_phrases(&self, phrases: DialoguePhrases) -> Result<(), StorageError> {
        let mut guard = self
            .dialogue
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(phrases);
        Ok(())
    }

    /// Make every following `append_exercise` fail (or succeed again).
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Number of exercise records stored so far.
    #[must_use]
    pub fn exercise_count(&self) -> usize {
        self.history.lock().map_or(0, |h| h.exercises.len())
    }
}

#[async_trait]
impl KnowledgeRepository for InMemoryRepository {
    async fn fetch_corpus(&self) -> Result<Vec<KnowledgeItem>, StorageError> {
        let guard = self
            .corpus
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn fetch_history(&self) -> Result<PracticeHistory, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn append_exercise(&self, record: &ExerciseRecord) -> Result<(), StorageError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("history store unreachable".into()));
        }
        let mut guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.exercises.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl PromptRepository for InMemoryRepository {
    async fn fetch_prompts(&self) -> Result<PromptBook, StorageError> {
        let guard = self
            .prompts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clone().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl DialogueRepository for InMemoryRepository {
    async fn fetch_dialogue_phrases(&self) -> Result<DialoguePhrases, StorageError> {
        let guard = self
            .dialogue
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clone().ok_or(StorageError::NotFound)
    }
}

/// Aggregates the four resource repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub knowledge: Arc<dyn KnowledgeRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub prompts: Arc<dyn PromptRepository>,
    pub dialogue: Arc<dyn DialogueRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory(repo: InMemoryRepository) -> Self {
        Self {
            knowledge: Arc::new(repo.clone()),
            history: Arc::new(repo.clone()),
            prompts: Arc::new(repo.clone()),
            dialogue: Arc::new(repo),
        }
    }
}
