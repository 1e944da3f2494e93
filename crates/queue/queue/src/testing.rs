use crate::error::QueueError;
use crate::store::QueueStore;

/// Run the queue store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any backend call fails unexpectedly.
pub async fn run_store_conformance_tests(store: &dyn QueueStore) -> Result<(), QueueError> {
    test_queue_lifecycle(store).await?;
    test_missing_queue(store).await?;
    test_fifo(store).await?;
    test_peek_does_not_remove(store).await?;
    Ok(())
}

async fn test_queue_lifecycle(store: &dyn QueueStore) -> Result<(), QueueError> {
    let queue = "conformance-lifecycle";
    assert!(store.create_queue_if_not_exists(queue).await?);
    assert!(
        !store.create_queue_if_not_exists(queue).await?,
        "second create should report an existing queue"
    );
    assert!(store.delete_queue_if_exists(queue).await?);
    assert!(!store.delete_queue_if_exists(queue).await?);
    Ok(())
}

async fn test_missing_queue(store: &dyn QueueStore) -> Result<(), QueueError> {
    let queue = "conformance-missing";
    assert!(matches!(
        store.enqueue(queue, "x").await,
        Err(QueueError::NotFound(_))
    ));
    assert!(matches!(
        store.peek(queue).await,
        Err(QueueError::NotFound(_))
    ));
    assert!(matches!(
        store.approximate_length(queue).await,
        Err(QueueError::NotFound(_))
    ));
    Ok(())
}

async fn test_fifo(store: &dyn QueueStore) -> Result<(), QueueError> {
    let queue = "conformance-fifo";
    store.create_queue_if_not_exists(queue).await?;
    for body in ["first", "second", "third"] {
        store.enqueue(queue, body).await?;
    }
    assert_eq!(store.approximate_length(queue).await?, 3);

    let first = store.dequeue(queue).await?;
    assert_eq!(first.map(|m| m.content).as_deref(), Some("first"));
    let second = store.dequeue(queue).await?;
    assert_eq!(second.map(|m| m.content).as_deref(), Some("second"));
    assert_eq!(store.approximate_length(queue).await?, 1);

    store.dequeue(queue).await?;
    assert!(store.dequeue(queue).await?.is_none());
    assert_eq!(store.approximate_length(queue).await?, 0);
    store.delete_queue_if_exists(queue).await?;
    Ok(())
}

async fn test_peek_does_not_remove(store: &dyn QueueStore) -> Result<(), QueueError> {
    let queue = "conformance-peek";
    store.create_queue_if_not_exists(queue).await?;
    assert!(store.peek(queue).await?.is_none());

    let inserted = store.enqueue(queue, "hello").await?;
    let peeked = store.peek(queue).await?;
    assert_eq!(peeked.as_ref().map(|m| m.id.as_str()), Some(inserted.id.as_str()));
    assert_eq!(store.approximate_length(queue).await?, 1);
    store.delete_queue_if_exists(queue).await?;
    Ok(())
}
