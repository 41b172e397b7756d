//! Error types for the recommendation engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ItemId;

#[derive(Debug, Error)]
pub enum RecError {
    /// The dataset could not be opened at all. Fatal at startup.
    #[error("dataset unreadable: {path}: {source}")]
    DatasetUnreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A single row could not be turned into a `RatingRecord`.
    /// The loader logs it and moves on.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An item id reached the ranker without a catalog entry.
    /// This means the index was built inconsistently.
    #[error("item {0} has no catalog entry")]
    ItemMissing(ItemId),
}

pub type Result<T> = std::result::Result<T, RecError>;
