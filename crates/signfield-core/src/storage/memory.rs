//! In-memory storage implementation.

use super::{DocumentSnapshot, Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, DocumentSnapshot>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, document: &DocumentSnapshot) -> StorageResult<()> {
        let mut docs = self.documents.write().map_err(lock_error)?;
        docs.insert(id.to_string(), document.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<DocumentSnapshot> {
        let docs = self.documents.read().map_err(lock_error)?;
        docs.get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let mut docs = self.documents.write().map_err(lock_error)?;
        docs.remove(id);
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let docs = self.documents.read().map_err(lock_error)?;
        Ok(docs.keys().cloned().collect())
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        let docs = self.documents.read().map_err(lock_error)?;
        Ok(docs.contains_key(id))
    }
}
