//! Durable local persistence for campcook.
//!
//! [`LocalStore`] keeps one JSON document per key on an injected
//! [`KvBackend`]. Saves are synchronous; once `save` returns, the record
//! survives a crash. Corrupt documents are logged, dropped and reported as
//! absent so the caller can start fresh.

pub mod backend;
pub mod lock;
pub mod migrate;
mod store;

pub use backend::{FileBackend, KvBackend, MemoryBackend};
pub use lock::FileLock;
pub use store::{AttemptClaim, LocalStore, PendingEntry, SyncState, SyncedEntry, keys};

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed for {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn io(target: impl fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            target: target.to_string(),
            source,
        }
    }

    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}
