use super::confirm::ConfirmationGate;
use crate::error::StorageError;
use crate::storage::{latest_recording, Storage};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,

    /// File recorded during this run (falls back to the latest numbered one)
    pub recording: Option<String>,

    /// Upper bound on bytes per body chunk
    pub transfer_chunk_size: usize,

    pub gate: ConfirmationGate,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, transfer_chunk_size: usize) -> Self {
        Self {
            storage,
            recording: None,
            transfer_chunk_size,
            gate: ConfirmationGate::new(),
        }
    }

    pub fn with_recording(self, path: impl Into<String>) -> Self {
        Self {
            recording: Some(path.into()),
            ..self
        }
    }

    /// File to serve on `/download`
    pub fn current_recording(&self) -> Result<Option<String>, StorageError> {
        if let Some(path) = &self.recording {
            return Ok(Some(path.clone()));
        }
        latest_recording(self.storage.as_ref())
    }
}
