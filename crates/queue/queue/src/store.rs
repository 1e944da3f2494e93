use async_trait::async_trait;

use crate::error::QueueError;
use crate::types::QueueMessage;

/// Queue storage backend the queue tasks talk to.
///
/// Every operation except create and delete fails with
/// [`QueueError::NotFound`] when the queue is missing.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Create the queue unless it exists. Returns `true` if it was created.
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<bool, QueueError>;

    /// Delete the queue and its messages. Returns `true` if it existed.
    async fn delete_queue_if_exists(&self, queue: &str) -> Result<bool, QueueError>;

    /// Append a message to the back of the queue.
    async fn enqueue(&self, queue: &str, content: &str) -> Result<QueueMessage, QueueError>;

    /// Look at the front message without removing it.
    async fn peek(&self, queue: &str) -> Result<Option<QueueMessage>, QueueError>;

    /// Remove and return the front message.
    async fn dequeue(&self, queue: &str) -> Result<Option<QueueMessage>, QueueError>;

    /// Approximate number of messages in the queue.
    async fn approximate_length(&self, queue: &str) -> Result<u64, QueueError>;
}
