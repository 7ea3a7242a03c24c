//! Error types shared across the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Coordinate mapping failures.
///
/// None of these are faults. They mean the rendering surface has not
/// produced a usable viewport for the page yet, so the caller should skip
/// this event and try again on the next render tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("no viewport has been rendered for page {page}")]
    Unavailable { page: u32 },
    #[error("viewport for page {page} has a zero or non-finite dimension")]
    Degenerate { page: u32 },
}

/// Result type for coordinate mapping.
pub type MapResult<T> = Result<T, MapError>;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}
