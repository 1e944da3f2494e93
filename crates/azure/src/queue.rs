use std::sync::Arc;

use cirrus_materialize::ensure_not_cancelled;
use cirrus_queue::store::QueueStore;
use cirrus_queue::types::validate_queue_name;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{
    QueueConnection, QueueLengthResult, QueueMessageInput, QueueOperationResult, QueueOptions,
    QueuePeekResult,
};
use crate::error::{TaskError, TaskResult};

/// Queue tasks over a [`QueueStore`].
///
/// Each task either returns its error or, with
/// [`QueueOptions::throw_error_on_failure`] unset, folds it into a
/// `success = false` result whose `info` carries the message.
#[derive(Clone)]
pub struct QueueTasks {
    store: Arc<dyn QueueStore>,
}

impl std::fmt::Debug for QueueTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueTasks").finish_non_exhaustive()
    }
}

/// Return `result`, or turn its error into a failure value when the caller
/// asked for failures to be reported rather than raised.
fn settle<T>(
    options: QueueOptions,
    result: TaskResult<T>,
    failed: impl FnOnce(String) -> T,
) -> TaskResult<T> {
    match result {
        Err(err) if !options.throw_error_on_failure => {
            warn!(error = %err, "queue task failed");
            Ok(failed(err.to_string()))
        }
        other => other,
    }
}

fn failure(info: String) -> QueueOperationResult {
    QueueOperationResult {
        success: false,
        info,
    }
}

fn prepare(connection: &QueueConnection, cancel: Option<&CancellationToken>) -> TaskResult<()> {
    ensure_not_cancelled(cancel)?;
    validate_queue_name(&connection.queue_name).map_err(TaskError::queue("validate queue"))?;
    ensure_not_cancelled(cancel)?;
    Ok(())
}

impl QueueTasks {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    /// Create the queue. Reports `success = false` if it already exists.
    #[instrument(skip(self, connection, cancel), fields(queue = %connection.queue_name))]
    pub async fn create_queue(
        &self,
        connection: &QueueConnection,
        options: QueueOptions,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueOperationResult> {
        settle(options, self.try_create_queue(connection, cancel).await, failure)
    }

    /// Delete the queue. Reports `success = false` if it does not exist.
    #[instrument(skip(self, connection, cancel), fields(queue = %connection.queue_name))]
    pub async fn delete_queue(
        &self,
        connection: &QueueConnection,
        options: QueueOptions,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueOperationResult> {
        settle(options, self.try_delete_queue(connection, cancel).await, failure)
    }

    /// Approximate number of messages in the queue.
    #[instrument(skip(self, connection, cancel), fields(queue = %connection.queue_name))]
    pub async fn get_queue_length(
        &self,
        connection: &QueueConnection,
        options: QueueOptions,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueLengthResult> {
        let result = self.try_get_queue_length(connection, cancel).await;
        settle(options, result, |info| QueueLengthResult {
            success: false,
            info: Some(info),
            count: 0,
        })
    }

    /// Append a message, creating the queue first when asked to.
    #[instrument(skip(self, connection, message, cancel), fields(queue = %connection.queue_name))]
    pub async fn insert_message(
        &self,
        connection: &QueueConnection,
        message: &QueueMessageInput,
        options: QueueOptions,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueOperationResult> {
        let result = self.try_insert_message(connection, message, cancel).await;
        settle(options, result, failure)
    }

    /// Content of the front message, left in the queue.
    #[instrument(skip(self, connection, cancel), fields(queue = %connection.queue_name))]
    pub async fn peek_next_message(
        &self,
        connection: &QueueConnection,
        options: QueueOptions,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueuePeekResult> {
        let result = self.try_peek_next_message(connection, cancel).await;
        settle(options, result, |info| QueuePeekResult {
            success: false,
            info: Some(info),
            content: None,
        })
    }

    /// Remove the front message.
    #[instrument(skip(self, connection, cancel), fields(queue = %connection.queue_name))]
    pub async fn delete_message(
        &self,
        connection: &QueueConnection,
        options: QueueOptions,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueOperationResult> {
        settle(options, self.try_delete_message(connection, cancel).await, failure)
    }

    async fn try_create_queue(
        &self,
        connection: &QueueConnection,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueOperationResult> {
        prepare(connection, cancel)?;
        let queue = connection.queue_name.as_str();
        let created = self
            .store
            .create_queue_if_not_exists(queue)
            .await
            .map_err(TaskError::queue("create queue"))?;
        if !created {
            return Ok(failure(format!("Queue named '{queue}' already exists.")));
        }
        info!("queue created");
        Ok(QueueOperationResult {
            success: true,
            info: format!("Queue '{queue}' created."),
        })
    }

    async fn try_delete_queue(
        &self,
        connection: &QueueConnection,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueOperationResult> {
        prepare(connection, cancel)?;
        let queue = connection.queue_name.as_str();
        let deleted = self
            .store
            .delete_queue_if_exists(queue)
            .await
            .map_err(TaskError::queue("delete queue"))?;
        if !deleted {
            return Ok(failure(format!("Queue '{queue}' not found.")));
        }
        info!("queue deleted");
        Ok(QueueOperationResult {
            success: true,
            info: format!("Queue '{queue}' deleted."),
        })
    }

    async fn try_get_queue_length(
        &self,
        connection: &QueueConnection,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueLengthResult> {
        prepare(connection, cancel)?;
        let count = self
            .store
            .approximate_length(&connection.queue_name)
            .await
            .map_err(TaskError::queue("get queue length"))?;
        ensure_not_cancelled(cancel)?;
        debug!(count, "queue length fetched");
        Ok(QueueLengthResult {
            success: true,
            info: None,
            count,
        })
    }

    async fn try_insert_message(
        &self,
        connection: &QueueConnection,
        message: &QueueMessageInput,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueOperationResult> {
        prepare(connection, cancel)?;
        let queue = connection.queue_name.as_str();
        if message.create_queue {
            self.store
                .create_queue_if_not_exists(queue)
                .await
                .map_err(TaskError::queue("create queue"))?;
        }
        let inserted = self
            .store
            .enqueue(queue, &message.content)
            .await
            .map_err(TaskError::queue("insert message"))?;
        info!(message_id = %inserted.id, "message inserted");
        Ok(QueueOperationResult {
            success: true,
            info: format!("Message added to queue '{queue}'."),
        })
    }

    async fn try_peek_next_message(
        &self,
        connection: &QueueConnection,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueuePeekResult> {
        prepare(connection, cancel)?;
        let queue = connection.queue_name.as_str();
        let peeked = self
            .store
            .peek(queue)
            .await
            .map_err(TaskError::queue("peek message"))?;
        Ok(match peeked {
            Some(message) => QueuePeekResult {
                success: true,
                info: None,
                content: Some(message.content),
            },
            None => QueuePeekResult {
                success: false,
                info: Some(format!("Message not found in queue '{queue}'")),
                content: None,
            },
        })
    }

    async fn try_delete_message(
        &self,
        connection: &QueueConnection,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<QueueOperationResult> {
        prepare(connection, cancel)?;
        let queue = connection.queue_name.as_str();
        let removed = self
            .store
            .dequeue(queue)
            .await
            .map_err(TaskError::queue("delete message"))?;
        let Some(message) = removed else {
            return Ok(failure(format!(
                "Could not delete message: Message not found in queue '{queue}'"
            )));
        };
        info!(message_id = %message.id, "message deleted");
        Ok(QueueOperationResult {
            success: true,
            info: format!("Deleted next message in queue '{queue}'"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_passes_errors_through_by_default() {
        let result: TaskResult<QueueOperationResult> = Err(TaskError::Cancelled);
        assert!(matches!(
            settle(QueueOptions::default(), result, failure),
            Err(TaskError::Cancelled)
        ));
    }

    #[test]
    fn settle_reports_errors_on_request() {
        let result: TaskResult<QueueOperationResult> = Err(TaskError::Cancelled);
        let settled = settle(QueueOptions::report_failures(), result, failure).unwrap();
        assert!(!settled.success);
        assert_eq!(settled.info, "task cancelled");
    }

    #[test]
    fn invalid_queue_name_is_rejected_before_the_store() {
        let err = prepare(&QueueConnection::new("Bad_Queue"), None).unwrap_err();
        assert!(matches!(err, TaskError::Queue { operation: "validate queue", .. }));
    }
}
