#![forbid(unsafe_code)]

pub mod http;
pub mod media;
pub mod repository;

pub use http::{BackendConfig, BackendConfigError, HttpBackend};
pub use repository::{InMemoryRepository, Storage, StorageError};

use std::sync::Arc;

impl Storage {
    /// Every resource served by one REST backend.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the HTTP client cannot be built.
    pub fn http(config: BackendConfig) -> Result<Self, StorageError> {
        let backend = Arc::new(HttpBackend::new(config)?);
        Ok(Self {
            knowledge: backend.clone(),
            history: backend.clone(),
            prompts: backend.clone(),
            dialogue: backend,
        })
    }
}
