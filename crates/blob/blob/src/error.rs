use thiserror::Error;

/// Errors that can occur during object storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The container does not exist.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// An `If-Match` precondition failed.
    #[error("etag mismatch for blob {name}: expected {expected}")]
    ConditionNotMet {
        /// Blob the condition applied to.
        name: String,
        /// ETag the caller required.
        expected: String,
    },

    /// A container or blob name violates the naming rules.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The backend does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A storage backend error occurred.
    #[error("blob storage error: {0}")]
    Storage(String),
}
