//! Persistence for digitized notices and their processing logs.
//!
//! One trait, two implementations: `FirestoreStore` talks to the hosted
//! document store over REST, `MemoryStore` backs tests and credential-less
//! development. Handlers only ever see `dyn NoticeStore`.

pub mod firestore;
pub mod memory;

pub use firestore::*;
pub use memory::*;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{NoticeRecord, ProcessingLogEntry};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Firestore project is not configured")]
    Configuration,

    #[error("Notice not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: String, value: String },

    #[error("Firestore returned error (status {status}): {body}")]
    Firestore { status: u16, body: String },

    #[error("Cannot reach Firestore at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Notice persistence.
///
/// Blocking like the rest of the pipeline; the HTTP layer bridges with
/// `spawn_blocking`.
pub trait NoticeStore: std::fmt::Debug + Send + Sync {
    /// Persist a new record and return the stored copy.
    ///
    /// Assigns a fresh id and both timestamps; the caller's values for
    /// those are ignored, so re-saving can never overwrite an existing
    /// record. Appends a "saved" processing-log entry (best effort).
    fn save(&self, record: &NoticeRecord) -> Result<NoticeRecord, StoreError>;

    fn get(&self, id: &Uuid) -> Result<Option<NoticeRecord>, StoreError>;

    /// Newest first, at most `limit` records.
    fn list(&self, limit: usize) -> Result<Vec<NoticeRecord>, StoreError>;

    /// Overwrite an existing record's fields and re-stamp `updated_at`.
    /// `created_at` keeps its stored value. `NotFound` when the id was
    /// never saved.
    fn update(&self, record: &NoticeRecord) -> Result<NoticeRecord, StoreError>;

    /// Delete the record and its log entries in one atomic batch.
    /// `false` when the id was never stored.
    fn delete(&self, id: &Uuid) -> Result<bool, StoreError>;

    /// Records without coordinates, for the retro-geocode sweep.
    fn list_missing_coordinates(&self) -> Result<Vec<NoticeRecord>, StoreError>;

    fn append_log(&self, entry: &ProcessingLogEntry) -> Result<(), StoreError>;

    /// A record's log entries in the order they happened.
    fn logs_for(&self, notice_id: &Uuid) -> Result<Vec<ProcessingLogEntry>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}
