use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BlobError;
use crate::types::{DeleteOptions, ObjectEntry, PutOptions, StoredObject};

/// Object storage backend the blob tasks talk to.
///
/// Implementations wrap a real storage client (or an in-process map for
/// tests) and must be `Send + Sync` and safe for concurrent access. Nothing in
/// this trait retries; retry policy belongs to the implementation or its
/// caller.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether the container exists.
    async fn container_exists(&self, container: &str) -> Result<bool, BlobError>;

    /// Create the container unless it exists. Returns `true` if it was created.
    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool, BlobError>;

    /// Delete the container and everything in it. Returns `true` if it existed.
    async fn delete_container_if_exists(&self, container: &str) -> Result<bool, BlobError>;

    /// Whether a blob exists. A missing container counts as a missing blob.
    async fn object_exists(&self, container: &str, name: &str) -> Result<bool, BlobError>;

    /// Store `data` under `name`, replacing any existing blob, and return the
    /// new listing entry.
    ///
    /// Fails with [`BlobError::ContainerNotFound`] if the container is missing.
    async fn put_object(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        options: &PutOptions,
    ) -> Result<ObjectEntry, BlobError>;

    /// Fetch a blob. Returns `None` if it does not exist.
    async fn get_object(
        &self,
        container: &str,
        name: &str,
    ) -> Result<Option<StoredObject>, BlobError>;

    /// Delete a blob. Returns `true` if it existed.
    ///
    /// Fails with [`BlobError::ConditionNotMet`] when `options.if_match` is
    /// set and differs from the current ETag.
    async fn delete_object(
        &self,
        container: &str,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<bool, BlobError>;

    /// List the container.
    ///
    /// A flat listing returns every blob whose name starts with `prefix`. A
    /// hierarchical listing collapses names with a further `/` after the
    /// prefix into one [`BlobKind::Directory`](crate::BlobKind::Directory)
    /// entry per virtual directory.
    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
        flat: bool,
    ) -> Result<Vec<ObjectEntry>, BlobError>;
}
