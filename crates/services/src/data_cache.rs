//! Shared snapshot of the four backend resources the practices read.
//!
//! Each resource loads independently; one failing does not block the others.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use lingua_core::model::{DialoguePhrases, KnowledgeItem, PracticeHistory, PromptBook};
use storage::{Storage, StorageError};

/// Load state of one cached resource.
///
/// A failed refresh keeps the previous data next to the error.
#[derive(Debug)]
pub struct ResourceState<T> {
    pub data: Option<Arc<T>>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

impl<T> ResourceState<T> {
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }
}

pub struct DataCache {
    storage: Storage,
    knowledge: RwLock<ResourceState<Vec<KnowledgeItem>>>,
    history: RwLock<ResourceState<PracticeHistory>>,
    prompts: RwLock<ResourceState<PromptBook>>,
    dialogue: RwLock<ResourceState<DialoguePhrases>>,
}

fn snapshot<T>(slot: &RwLock<ResourceState<T>>) -> ResourceState<T> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

async fn refresh<T, F>(
    slot: &RwLock<ResourceState<T>>,
    resource: &'static str,
    fetch: F,
) -> ResourceState<T>
where
    F: Future<Output = Result<T, StorageError>>,
{
    slot.write().unwrap_or_else(PoisonError::into_inner).loading = true;

    let fetched = fetch.await;

    let mut state = slot.write().unwrap_or_else(PoisonError::into_inner);
    state.loading = false;
    match fetched {
        Ok(data) => {
            debug!(resource, "resource loaded");
            state.data = Some(Arc::new(data));
            state.error = None;
        }
        Err(err) => {
            warn!(resource, error = %err, "resource failed to load");
            state.error = Some(format!("failed to load {resource}: {err}"));
        }
    }
    state.clone()
}

impl DataCache {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            knowledge: RwLock::default(),
            history: RwLock::default(),
            prompts: RwLock::default(),
            dialogue: RwLock::default(),
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn knowledge(&self) -> ResourceState<Vec<KnowledgeItem>> {
        snapshot(&self.knowledge)
    }

    #[must_use]
    pub fn history(&self) -> ResourceState<PracticeHistory> {
        snapshot(&self.history)
    }

    #[must_use]
    pub fn prompts(&self) -> ResourceState<PromptBook> {
        snapshot(&self.prompts)
    }

    #[must_use]
    pub fn dialogue(&self) -> ResourceState<DialoguePhrases> {
        snapshot(&self.dialogue)
    }

    pub async fn refresh_knowledge(&self) -> ResourceState<Vec<KnowledgeItem>> {
        refresh(&self.knowledge, "knowledge base", self.storage.knowledge.fetch_corpus()).await
    }

    pub async fn refresh_history(&self) -> ResourceState<PracticeHistory> {
        refresh(&self.history, "practice history", self.storage.history.fetch_history()).await
    }

    pub async fn refresh_prompts(&self) -> ResourceState<PromptBook> {
        refresh(&self.prompts, "prompts", self.storage.prompts.fetch_prompts()).await
    }

    pub async fn refresh_dialogue(&self) -> ResourceState<DialoguePhrases> {
        refresh(
            &self.dialogue,
            "dialogue phrases",
            self.storage.dialogue.fetch_dialogue_phrases(),
        )
        .await
    }

    /// Refresh all four resources concurrently.
    pub async fn refresh_all(&self) {
        tokio::join!(
            self.refresh_knowledge(),
            self.refresh_history(),
            self.refresh_prompts(),
            self.refresh_dialogue(),
        );
    }
}
