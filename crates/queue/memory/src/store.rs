use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use cirrus_queue::error::QueueError;
use cirrus_queue::store::QueueStore;
use cirrus_queue::types::{QueueMessage, validate_queue_name};

/// In-memory [`QueueStore`] backed by a [`DashMap`] of FIFO queues.
///
/// Lengths are exact rather than approximate. Messages are removed on
/// dequeue; there is no visibility timeout.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    queues: DashMap<String, VecDeque<QueueMessage>>,
}

impl MemoryQueueStore {
    /// Create a new store with no queues.
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(queue: &str) -> QueueError {
    QueueError::NotFound(queue.to_owned())
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<bool, QueueError> {
        validate_queue_name(queue)?;
        let created = match self.queues.entry(queue.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(VecDeque::new());
                true
            }
        };
        debug!(queue, created, "create queue if not exists");
        Ok(created)
    }

    async fn delete_queue_if_exists(&self, queue: &str) -> Result<bool, QueueError> {
        validate_queue_name(queue)?;
        Ok(self.queues.remove(queue).is_some())
    }

    async fn enqueue(&self, queue: &str, content: &str) -> Result<QueueMessage, QueueError> {
        validate_queue_name(queue)?;
        let mut messages = self.queues.get_mut(queue).ok_or_else(|| not_found(queue))?;
        let message = QueueMessage {
            id: Uuid::new_v4().to_string(),
            content: content.to_owned(),
            inserted_at: Utc::now(),
            dequeue_count: 0,
        };
        messages.push_back(message.clone());
        debug!(queue, id = %message.id, depth = messages.len(), "message enqueued");
        Ok(message)
    }

    async fn peek(&self, queue: &str) -> Result<Option<QueueMessage>, QueueError> {
        validate_queue_name(queue)?;
        let messages = self.queues.get(queue).ok_or_else(|| not_found(queue))?;
        Ok(messages.front().cloned())
    }

    async fn dequeue(&self, queue: &str) -> Result<Option<QueueMessage>, QueueError> {
        validate_queue_name(queue)?;
        let mut messages = self.queues.get_mut(queue).ok_or_else(|| not_found(queue))?;
        Ok(messages.pop_front().map(|mut message| {
            message.dequeue_count += 1;
            message
        }))
    }

    async fn approximate_length(&self, queue: &str) -> Result<u64, QueueError> {
        validate_queue_name(queue)?;
        let messages = self.queues.get(queue).ok_or_else(|| not_found(queue))?;
        Ok(messages.len() as u64)
    }
}
