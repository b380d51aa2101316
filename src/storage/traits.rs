//! Storage traits and error types
//!
//! This module defines the trait interface for result stores and
//! associated error types.

use crate::storage::{BusinessRecord, MergeOutcome};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed region file {path}: {message}")]
    MalformedRegionFile { path: PathBuf, message: String },

    #[error("Timed out after {waited_ms}ms waiting for lock {path} (another crawler is merging)")]
    LockTimeout { path: PathBuf, waited_ms: u64 },

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Background storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for result store implementations
pub trait ResultStore {
    // ===== Region Files =====

    /// Writes (fully overwrites) the region file for `region_name` and `category`
    ///
    /// # Returns
    ///
    /// The path written
    fn save_region(
        &self,
        region_name: &str,
        category: &str,
        records: &[BusinessRecord],
    ) -> StorageResult<PathBuf>;

    /// Reads back a region file written by `save_region`
    fn load_region(&self, region_name: &str, category: &str)
        -> StorageResult<Vec<BusinessRecord>>;

    /// Checks if a region file already exists (used to resume interrupted batches)
    fn region_exists(&self, region_name: &str, category: &str) -> bool;

    /// Lists every region file, sorted by path
    fn region_files(&self) -> StorageResult<Vec<PathBuf>>;

    /// Reads an arbitrary region file; a top-level object counts as one record
    fn read_region_file(&self, path: &Path) -> StorageResult<Vec<BusinessRecord>>;

    // ===== Master Result Set =====

    /// Loads the master set as raw JSON objects
    ///
    /// An absent or malformed master file yields an empty set.
    fn load_master(&self) -> StorageResult<Vec<Value>>;

    /// Appends records whose identity key is not yet in the master set
    ///
    /// Existing entries are never overwritten.
    fn merge_into_master(&self, records: &[BusinessRecord]) -> StorageResult<MergeOutcome>;
}
