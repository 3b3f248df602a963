//! Record store and navigation seams used on completion.

use af_protocol::record_models::{ChatRecord, Destination, NewChatRecord};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Failed to write record: {0}")]
    Write(String),
    #[error("Failed to read records: {0}")]
    Read(String),
}

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Navigation failed: {0}")]
    Failed(String),
}

/// Where chat records are persisted.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record and return its id.
    async fn create(&self, record: NewChatRecord) -> RecordResult<String>;

    async fn records_for_session(&self, session_id: &str) -> RecordResult<Vec<ChatRecord>>;
}

/// Moves the UI to another view.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, destination: Destination) -> Result<(), NavigationError>;
}

/// In-process record store.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<Vec<ChatRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ChatRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, record: NewChatRecord) -> RecordResult<String> {
        let id = Uuid::new_v4().to_string();
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ChatRecord::from_new(id.clone(), record));
        Ok(id)
    }

    async fn records_for_session(&self, session_id: &str) -> RecordResult<Vec<ChatRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| record.session_id == session_id)
            .cloned()
            .collect())
    }
}
