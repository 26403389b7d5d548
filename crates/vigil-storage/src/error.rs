/// Errors that can occur within the storage layer.
///
/// Every storage failure is fatal for the check cycle that hit it; the checker
/// never persists a partial [`CheckData`](vigil_common::types::CheckData).
///
/// # Examples
///
/// ```rust
/// use vigil_storage::error::StorageError;
///
/// let err = StorageError::Unavailable("connection reset".to_string());
/// assert!(err.to_string().contains("connection reset"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failure of a persisted check.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored column holds a value that does not decode into the expected type.
    #[error("Storage: unexpected value in column '{column}': {detail}")]
    InvalidColumn { column: &'static str, detail: String },

    /// The backend could not be reached.
    #[error("Storage: backend unavailable: {0}")]
    Unavailable(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
