use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use cirrus_blob::error::BlobError;
use cirrus_blob::store::ObjectStore;
use cirrus_blob::types::{
    DeleteOptions, ObjectEntry, PutOptions, SnapshotDeleteOption, StoredObject,
    collapse_directories, validate_blob_name, validate_container_name,
};

/// Endpoint of the local development storage account.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// First ETag handed out; 15 hex digits like the service's.
const ETAG_SEED: u64 = 0x8DC_0000_0000_0000;

type Container = BTreeMap<String, StoredObject>;

/// In-memory [`ObjectStore`] backed by a [`DashMap`] of containers.
///
/// Blobs are kept in name order so listings come back sorted. There are no
/// snapshots: [`SnapshotDeleteOption::DeleteSnapshotsOnly`] leaves the base
/// blob in place.
#[derive(Debug)]
pub struct MemoryObjectStore {
    endpoint: String,
    containers: DashMap<String, Container>,
    etag_counter: AtomicU64,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }
}

impl MemoryObjectStore {
    /// Create an empty store that reports URIs under [`DEFAULT_ENDPOINT`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that reports URIs under `endpoint`.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_owned(),
            containers: DashMap::new(),
            etag_counter: AtomicU64::new(ETAG_SEED),
        }
    }

    fn uri(&self, container: &str, name: &str) -> String {
        format!("{}/{container}/{name}", self.endpoint)
    }

    fn next_etag(&self) -> String {
        let value = self.etag_counter.fetch_add(1, Ordering::Relaxed);
        format!("0x{value:015X}")
    }
}

fn etags_match(expected: &str, current: &str) -> bool {
    expected.trim_matches('"') == current.trim_matches('"')
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn container_exists(&self, container: &str) -> Result<bool, BlobError> {
        Ok(self.containers.contains_key(container))
    }

    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool, BlobError> {
        validate_container_name(container)?;
        let created = match self.containers.entry(container.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(Container::new());
                true
            }
        };
        debug!(container, created, "create container if not exists");
        Ok(created)
    }

    async fn delete_container_if_exists(&self, container: &str) -> Result<bool, BlobError> {
        Ok(self.containers.remove(container).is_some())
    }

    async fn object_exists(&self, container: &str, name: &str) -> Result<bool, BlobError> {
        Ok(self
            .containers
            .get(container)
            .is_some_and(|blobs| blobs.contains_key(name)))
    }

    async fn put_object(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        options: &PutOptions,
    ) -> Result<ObjectEntry, BlobError> {
        validate_blob_name(name)?;
        if !options.kind.is_blob() {
            return Err(BlobError::Unsupported(format!(
                "cannot upload a {} blob",
                options.kind
            )));
        }
        let mut blobs = self
            .containers
            .get_mut(container)
            .ok_or_else(|| BlobError::ContainerNotFound(container.to_owned()))?;

        let entry = ObjectEntry {
            name: name.to_owned(),
            kind: options.kind,
            uri: self.uri(container, name),
            etag: Some(self.next_etag()),
        };
        debug!(
            container,
            name,
            size = data.len(),
            parallel_operations = options.parallel_operations,
            "storing blob"
        );
        blobs.insert(
            name.to_owned(),
            StoredObject {
                entry: entry.clone(),
                data,
                content_type: options.content_type.clone(),
                content_encoding: options.content_encoding.clone(),
                last_modified: Utc::now(),
            },
        );
        Ok(entry)
    }

    async fn get_object(
        &self,
        container: &str,
        name: &str,
    ) -> Result<Option<StoredObject>, BlobError> {
        Ok(self
            .containers
            .get(container)
            .and_then(|blobs| blobs.get(name).cloned()))
    }

    async fn delete_object(
        &self,
        container: &str,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<bool, BlobError> {
        let Some(mut blobs) = self.containers.get_mut(container) else {
            return Ok(false);
        };
        let Some(existing) = blobs.get(name) else {
            return Ok(false);
        };

        if let Some(expected) = options.if_match.as_deref() {
            let current = existing.entry.etag.as_deref().unwrap_or_default();
            if !etags_match(expected, current) {
                return Err(BlobError::ConditionNotMet {
                    name: name.to_owned(),
                    expected: expected.to_owned(),
                });
            }
        }

        if options.snapshots == SnapshotDeleteOption::DeleteSnapshotsOnly {
            debug!(container, name, "no snapshots to delete");
            return Ok(true);
        }
        Ok(blobs.remove(name).is_some())
    }

    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
        flat: bool,
    ) -> Result<Vec<ObjectEntry>, BlobError> {
        let blobs = self
            .containers
            .get(container)
            .ok_or_else(|| BlobError::ContainerNotFound(container.to_owned()))?;
        let prefix = prefix.unwrap_or_default();

        let matching = blobs
            .range(prefix.to_owned()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, stored)| stored.entry.clone());
        if flat {
            return Ok(matching.collect());
        }
        Ok(collapse_directories(prefix, matching, |directory| {
            self.uri(container, directory)
        }))
    }
}
