use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cirrus_azure::{QueueConnection, QueueMessageInput, QueueOptions, QueueTasks, TaskError};
use cirrus_queue::QueueError;
use cirrus_queue_memory::MemoryQueueStore;

fn tasks() -> QueueTasks {
    QueueTasks::new(Arc::new(MemoryQueueStore::new()))
}

#[tokio::test]
async fn queue_round_trip() {
    let tasks = tasks();
    let connection = QueueConnection::new("orders");
    let options = QueueOptions::default();

    let created = tasks.create_queue(&connection, options, None).await.unwrap();
    assert!(created.success);
    assert_eq!(created.info, "Queue 'orders' created.");

    for body in ["first", "second"] {
        let inserted = tasks
            .insert_message(&connection, &QueueMessageInput::new(body), options, None)
            .await
            .unwrap();
        assert!(inserted.success);
    }

    let length = tasks.get_queue_length(&connection, options, None).await.unwrap();
    assert!(length.success);
    assert_eq!(length.count, 2);

    let peeked = tasks.peek_next_message(&connection, options, None).await.unwrap();
    assert!(peeked.success);
    assert_eq!(peeked.content.as_deref(), Some("first"));

    let deleted = tasks.delete_message(&connection, options, None).await.unwrap();
    assert!(deleted.success);
    let peeked = tasks.peek_next_message(&connection, options, None).await.unwrap();
    assert_eq!(peeked.content.as_deref(), Some("second"));

    let removed = tasks.delete_queue(&connection, options, None).await.unwrap();
    assert!(removed.success);
    assert_eq!(removed.info, "Queue 'orders' deleted.");
}

#[tokio::test]
async fn repeated_create_and_delete_report_failure() {
    let tasks = tasks();
    let connection = QueueConnection::new("orders");
    let options = QueueOptions::default();

    tasks.create_queue(&connection, options, None).await.unwrap();
    let again = tasks.create_queue(&connection, options, None).await.unwrap();
    assert!(!again.success);
    assert_eq!(again.info, "Queue named 'orders' already exists.");

    tasks.delete_queue(&connection, options, None).await.unwrap();
    let again = tasks.delete_queue(&connection, options, None).await.unwrap();
    assert!(!again.success);
    assert_eq!(again.info, "Queue 'orders' not found.");
}

#[tokio::test]
async fn empty_queue_peek_and_delete_report_failure() {
    let tasks = tasks();
    let connection = QueueConnection::new("empty");
    let options = QueueOptions::default();
    tasks.create_queue(&connection, options, None).await.unwrap();

    let peeked = tasks.peek_next_message(&connection, options, None).await.unwrap();
    assert!(!peeked.success);
    assert!(peeked.content.is_none());
    assert_eq!(peeked.info.as_deref(), Some("Message not found in queue 'empty'"));

    let deleted = tasks.delete_message(&connection, options, None).await.unwrap();
    assert!(!deleted.success);
}

#[tokio::test]
async fn insert_creates_the_queue_by_default() {
    let tasks = tasks();
    let connection = QueueConnection::new("lazy");
    let options = QueueOptions::default();

    let inserted = tasks
        .insert_message(&connection, &QueueMessageInput::new("hello"), options, None)
        .await
        .unwrap();
    assert!(inserted.success);
    assert_eq!(inserted.info, "Message added to queue 'lazy'.");
    let length = tasks.get_queue_length(&connection, options, None).await.unwrap();
    assert_eq!(length.count, 1);
}

#[tokio::test]
async fn missing_queue_raises_by_default() {
    let tasks = tasks();
    let connection = QueueConnection::new("missing");

    let err = tasks
        .insert_message(
            &connection,
            &QueueMessageInput::new("hello").with_create_queue(false),
            QueueOptions::default(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskError::Queue {
            operation: "insert message",
            source: QueueError::NotFound(_),
        }
    ));
}

#[tokio::test]
async fn failures_are_reported_when_not_raising() {
    let tasks = tasks();
    let connection = QueueConnection::new("missing");
    let options = QueueOptions::report_failures();

    let length = tasks.get_queue_length(&connection, options, None).await.unwrap();
    assert!(!length.success);
    assert_eq!(length.count, 0);
    assert!(length.info.unwrap().contains("queue not found: missing"));

    let peeked = tasks.peek_next_message(&connection, options, None).await.unwrap();
    assert!(!peeked.success);
    assert!(peeked.info.unwrap().contains("queue not found"));

    let invalid = tasks
        .create_queue(&QueueConnection::new("No_Such-Name"), options, None)
        .await
        .unwrap();
    assert!(!invalid.success);
    assert!(invalid.info.contains("invalid queue name"));
}

#[tokio::test]
async fn cancellation_is_honoured() {
    let tasks = tasks();
    let token = CancellationToken::new();
    token.cancel();

    let err = tasks
        .create_queue(
            &QueueConnection::new("orders"),
            QueueOptions::default(),
            Some(&token),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::Cancelled));

    let reported = tasks
        .create_queue(
            &QueueConnection::new("orders"),
            QueueOptions::report_failures(),
            Some(&token),
        )
        .await
        .unwrap();
    assert!(!reported.success);
    assert_eq!(reported.info, "task cancelled");
}
