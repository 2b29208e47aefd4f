//! Shared identifiers, error type, and runtime configuration for MiniSQL.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 0-based ordinal of a slot within a heap file. Stable across inserts and
/// deletes.
pub type RecordId = i32;

/// 0-based page index within a single `.mdb` file.
pub type PageId = i32;

/// Canonical error type shared across every MiniSQL crate.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for a MiniSQL instance.
///
/// # Example
/// ```
/// use common::Config;
///
/// let config = Config::builder().buffer_pool_pages(64).build();
/// assert_eq!(config.buffer_pool_pages, 64);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Config {
    /// Directory under which `data/`, `catalog/`, `record/`, and `index/`
    /// files live.
    #[builder(default = PathBuf::from("./data"))]
    pub data_dir: PathBuf,
    /// Page size in bytes. Fixed by the on-disk format; present mainly for
    /// documentation and tests, not runtime tuning.
    #[builder(default = 4096)]
    pub page_size: usize,
    /// Maximum number of resident pages in the buffer pool.
    #[builder(default = 100)]
    pub buffer_pool_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            page_size: 4096,
            buffer_pool_pages: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_budgets() {
        let config = Config::default();
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.buffer_pool_pages, 100);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::builder()
            .data_dir(PathBuf::from("/tmp/mdb"))
            .buffer_pool_pages(10)
            .build();
        assert_eq!(config.buffer_pool_pages, 10);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/mdb"));
    }
}
