//! Task Cache
//!
//! Durable fingerprint -> (task_text, answer) store. Rows are insert-only:
//! the table's primary key decides which of several racing writers wins.

mod store;

pub use store::{TaskCache, DEFAULT_BUSY_TIMEOUT};

use crate::types::TaskRecord;
use thiserror::Error;

/// Storage-layer failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("task cache unavailable: {0}")]
    Unavailable(String),
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(TaskRecord),
    /// No row yet; the caller resolves and then races on `insert_if_absent`
    Miss,
}
