use bytes::Bytes;

use crate::error::BlobError;
use crate::store::ObjectStore;
use crate::types::{BlobKind, DeleteOptions, PutOptions};

/// Run the object store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
/// The suite creates and deletes its own containers.
///
/// # Errors
///
/// Returns an error if any backend call fails unexpectedly.
pub async fn run_store_conformance_tests(store: &dyn ObjectStore) -> Result<(), BlobError> {
    test_container_lifecycle(store).await?;
    test_missing_container(store).await?;
    test_put_and_get(store).await?;
    test_overwrite_changes_etag(store).await?;
    test_delete(store).await?;
    test_delete_if_match(store).await?;
    test_flat_listing(store).await?;
    test_hierarchical_listing(store).await?;
    Ok(())
}

async fn test_container_lifecycle(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let container = "conformance-lifecycle";
    assert!(!store.container_exists(container).await?);
    assert!(store.create_container_if_not_exists(container).await?);
    assert!(
        !store.create_container_if_not_exists(container).await?,
        "second create should report an existing container"
    );
    assert!(store.container_exists(container).await?);
    assert!(store.delete_container_if_exists(container).await?);
    assert!(!store.delete_container_if_exists(container).await?);
    Ok(())
}

async fn test_missing_container(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let container = "conformance-missing";
    assert!(!store.object_exists(container, "a.txt").await?);
    let put = store
        .put_object(container, "a.txt", Bytes::from_static(b"x"), &PutOptions::default())
        .await;
    assert!(
        matches!(put, Err(BlobError::ContainerNotFound(_))),
        "put into a missing container should fail"
    );
    Ok(())
}

async fn test_put_and_get(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let container = "conformance-put";
    store.create_container_if_not_exists(container).await?;
    let options = PutOptions::default()
        .with_kind(BlobKind::Append)
        .with_content_type("text/plain")
        .with_content_encoding("utf-8");
    let entry = store
        .put_object(container, "docs/readme.txt", Bytes::from_static(b"hello"), &options)
        .await?;
    assert_eq!(entry.name, "docs/readme.txt");
    assert_eq!(entry.kind, BlobKind::Append);
    assert!(entry.etag.is_some());
    assert!(entry.uri.ends_with("/conformance-put/docs/readme.txt"));

    assert!(store.object_exists(container, "docs/readme.txt").await?);
    let stored = store
        .get_object(container, "docs/readme.txt")
        .await?
        .ok_or_else(|| BlobError::NotFound("docs/readme.txt".into()))?;
    assert_eq!(stored.data.as_ref(), b"hello");
    assert_eq!(stored.content_type.as_deref(), Some("text/plain"));
    assert_eq!(stored.content_encoding.as_deref(), Some("utf-8"));
    assert_eq!(stored.entry, entry);

    assert!(store.get_object(container, "nope.txt").await?.is_none());
    store.delete_container_if_exists(container).await?;
    Ok(())
}

async fn test_overwrite_changes_etag(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let container = "conformance-overwrite";
    store.create_container_if_not_exists(container).await?;
    let first = store
        .put_object(container, "a.txt", Bytes::from_static(b"one"), &PutOptions::default())
        .await?;
    let second = store
        .put_object(container, "a.txt", Bytes::from_static(b"two"), &PutOptions::default())
        .await?;
    assert_ne!(first.etag, second.etag, "overwrite should produce a new etag");
    let stored = store.get_object(container, "a.txt").await?;
    assert_eq!(stored.map(|s| s.data), Some(Bytes::from_static(b"two")));
    store.delete_container_if_exists(container).await?;
    Ok(())
}

async fn test_delete(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let container = "conformance-delete";
    store.create_container_if_not_exists(container).await?;
    store
        .put_object(container, "a.txt", Bytes::from_static(b"x"), &PutOptions::default())
        .await?;
    assert!(
        store
            .delete_object(container, "a.txt", &DeleteOptions::default())
            .await?
    );
    assert!(!store.object_exists(container, "a.txt").await?);
    assert!(
        !store
            .delete_object(container, "a.txt", &DeleteOptions::default())
            .await?,
        "deleting a missing blob should return false"
    );
    store.delete_container_if_exists(container).await?;
    Ok(())
}

async fn test_delete_if_match(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let container = "conformance-ifmatch";
    store.create_container_if_not_exists(container).await?;
    let entry = store
        .put_object(container, "a.txt", Bytes::from_static(b"x"), &PutOptions::default())
        .await?;

    let stale = DeleteOptions {
        if_match: Some("0x000000000000000".into()),
        ..DeleteOptions::default()
    };
    let result = store.delete_object(container, "a.txt", &stale).await;
    assert!(matches!(result, Err(BlobError::ConditionNotMet { .. })));
    assert!(store.object_exists(container, "a.txt").await?);

    let current = DeleteOptions {
        if_match: entry.etag,
        ..DeleteOptions::default()
    };
    assert!(store.delete_object(container, "a.txt", &current).await?);
    store.delete_container_if_exists(container).await?;
    Ok(())
}

async fn seed_tree(store: &dyn ObjectStore, container: &str) -> Result<(), BlobError> {
    store.create_container_if_not_exists(container).await?;
    for name in ["root.txt", "logs/a.log", "logs/b.log", "logs/2026/c.log", "data/x.csv"] {
        store
            .put_object(container, name, Bytes::from_static(b"x"), &PutOptions::default())
            .await?;
    }
    Ok(())
}

async fn test_flat_listing(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let container = "conformance-flat";
    seed_tree(store, container).await?;

    let all = store.list_objects(container, None, true).await?;
    assert_eq!(all.len(), 5);
    assert!(all.iter().all(|e| e.kind == BlobKind::Block));

    let logs = store.list_objects(container, Some("logs/"), true).await?;
    let mut names: Vec<_> = logs.into_iter().map(|e| e.name).collect();
    names.sort();
    assert_eq!(names, vec!["logs/2026/c.log", "logs/a.log", "logs/b.log"]);

    store.delete_container_if_exists(container).await?;
    Ok(())
}

async fn test_hierarchical_listing(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let container = "conformance-tree";
    seed_tree(store, container).await?;

    let top = store.list_objects(container, None, false).await?;
    let mut dirs: Vec<_> = top
        .iter()
        .filter(|e| e.kind == BlobKind::Directory)
        .map(|e| e.name.as_str())
        .collect();
    dirs.sort_unstable();
    assert_eq!(dirs, vec!["data/", "logs/"]);
    assert!(
        top.iter()
            .any(|e| e.name == "root.txt" && e.kind == BlobKind::Block)
    );
    assert_eq!(top.len(), 3);

    let logs = store.list_objects(container, Some("logs/"), false).await?;
    assert_eq!(logs.len(), 3);
    assert!(
        logs.iter()
            .any(|e| e.name == "logs/2026/" && e.kind == BlobKind::Directory && e.etag.is_none())
    );

    store.delete_container_if_exists(container).await?;
    Ok(())
}
