use thiserror::Error;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue does not exist.
    #[error("queue not found: {0}")]
    NotFound(String),

    /// The queue name violates the naming rules.
    #[error("invalid queue name: {0}")]
    InvalidName(String),

    /// A storage backend error occurred.
    #[error("queue storage error: {0}")]
    Storage(String),
}
