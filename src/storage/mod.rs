//! Persisted cache store.
//!
//! The cache lives in the data directory as one JSONL file per table:
//! - `cache/clans.jsonl`
//! - `cache/clan_members.jsonl`
//! - `cache/matches.jsonl`
//! - `cache/mode_stats.jsonl`

mod cache;
mod jsonl;

pub use cache::*;
pub use jsonl::*;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Record not found: {0}")]
    RecordNotFound(String),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        self.cache_dir().join(table.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
