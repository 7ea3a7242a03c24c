//! Storage abstraction for persistence.

mod memory;
mod snapshot;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use crate::error::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use snapshot::DocumentSnapshot;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

/// Trait for document storage backends.
///
/// Calls are synchronous; a backend that talks to a remote service does
/// its own queueing.
pub trait Storage: Send + Sync {
    /// Save a document.
    fn save(&self, id: &str, document: &DocumentSnapshot) -> StorageResult<()>;

    /// Load a document.
    fn load(&self, id: &str) -> StorageResult<DocumentSnapshot>;

    /// Delete a document. Deleting a missing document is not an error.
    fn delete(&self, id: &str) -> StorageResult<()>;

    /// List all document IDs.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Check if a document exists.
    fn exists(&self, id: &str) -> StorageResult<bool>;
}
