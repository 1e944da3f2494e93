use cirrus_blob::BlobError;
use cirrus_materialize::MaterializeError;
use cirrus_queue::QueueError;
use thiserror::Error;

/// Errors returned by the storage tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Local file handling failed.
    #[error(transparent)]
    Materialize(MaterializeError),

    /// The object store rejected or failed an operation.
    #[error("{operation} failed: {source}")]
    Blob {
        /// Task step that was running.
        operation: &'static str,
        #[source]
        source: BlobError,
    },

    /// The queue store rejected or failed an operation.
    #[error("{operation} failed: {source}")]
    Queue {
        /// Task step that was running.
        operation: &'static str,
        #[source]
        source: QueueError,
    },

    /// A task property is missing or malformed.
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        /// Property name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The blob to read or download does not exist.
    #[error("blob '{name}' not found in container '{container}'")]
    BlobNotFound { container: String, name: String },

    /// The upload target exists and overwriting was not requested.
    #[error("blob '{name}' already exists in container '{container}'")]
    BlobAlreadyExists { container: String, name: String },

    /// Token acquisition failed.
    #[error("failed to obtain access token: {0}")]
    Token(String),

    /// The token service was throttled or unreachable.
    #[error("token service unavailable: {0}")]
    TokenUnavailable(String),

    /// A storage credential or client could not be built.
    #[error("storage client configuration error: {0}")]
    Configuration(String),

    /// The cancellation token fired.
    #[error("task cancelled")]
    Cancelled,
}

/// Result alias for task operations.
pub type TaskResult<T> = Result<T, TaskError>;

impl TaskError {
    pub(crate) fn blob(operation: &'static str) -> impl FnOnce(BlobError) -> Self {
        move |source| Self::Blob { operation, source }
    }

    pub(crate) fn queue(operation: &'static str) -> impl FnOnce(QueueError) -> Self {
        move |source| Self::Queue { operation, source }
    }

    pub(crate) fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Only backend failures and transient token errors qualify; bad input,
    /// missing objects and precondition failures never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Blob {
                source: BlobError::Storage(_),
                ..
            }
            | Self::Queue {
                source: QueueError::Storage(_),
                ..
            }
            | Self::TokenUnavailable(_) => true,
            Self::Materialize(MaterializeError::Io { source, .. }) => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

impl From<MaterializeError> for TaskError {
    fn from(err: MaterializeError) -> Self {
        match err {
            MaterializeError::Cancelled => Self::Cancelled,
            other => Self::Materialize(other),
        }
    }
}

/// Classify an identity service error string into a [`TaskError`].
///
/// Throttling, timeouts and connection problems become
/// [`TaskError::TokenUnavailable`]; anything else is a plain
/// [`TaskError::Token`].
pub fn classify_azure_error(error_str: &str) -> TaskError {
    let lower = error_str.to_lowercase();
    let transient = lower.contains("429")
        || lower.contains("throttl")
        || lower.contains("too many")
        || lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connect")
        || lower.contains("dns")
        || lower.contains("network");
    if transient {
        TaskError::TokenUnavailable(error_str.to_owned())
    } else {
        TaskError::Token(error_str.to_owned())
    }
}
