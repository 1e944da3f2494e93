//! Task property and output types.
//!
//! Properties deserialize from the host's configuration with the same
//! defaults the tasks have always had; outputs serialize back to it.

use std::path::PathBuf;

use cirrus_blob::types::{BlobKind, DEFAULT_PARALLEL_OPERATIONS, ObjectEntry, SnapshotDeleteOption};
use cirrus_materialize::{CollisionPolicy, WrittenFile};
use serde::{Deserialize, Serialize};

use crate::error::{TaskError, TaskResult};

const fn default_true() -> bool {
    true
}

const fn default_parallel_operations() -> u32 {
    DEFAULT_PARALLEL_OPERATIONS
}

/// Reject blank required properties.
pub(crate) fn require(field: &'static str, value: &str) -> TaskResult<()> {
    if value.trim().is_empty() {
        return Err(TaskError::invalid_input(field, "must not be blank"));
    }
    Ok(())
}

/// `None` for a missing or blank optional property; anything else is passed
/// through as given.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Blob properties
// ---------------------------------------------------------------------------

/// Which container to list and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlobsSource {
    pub container_name: String,
    /// List every blob (`true`) or one directory level (`false`).
    #[serde(default = "default_true")]
    pub flat_blob_listing: bool,
    /// Only list names starting with this prefix. Blank lists everything.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl ListBlobsSource {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            flat_blob_listing: true,
            prefix: None,
        }
    }

    #[must_use]
    pub fn with_flat_blob_listing(mut self, flat: bool) -> Self {
        self.flat_blob_listing = flat;
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// The blob to download or read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadBlobSource {
    pub container_name: String,
    pub blob_name: String,
    #[serde(default)]
    pub blob_type: BlobKind,
    /// Charset label used to decode the blob. Blank means the blob's own
    /// content encoding, falling back to UTF-8.
    #[serde(default)]
    pub encoding: Option<String>,
}

impl DownloadBlobSource {
    pub fn new(container_name: impl Into<String>, blob_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            blob_name: blob_name.into(),
            blob_type: BlobKind::Block,
            encoding: None,
        }
    }

    #[must_use]
    pub fn with_blob_type(mut self, blob_type: BlobKind) -> Self {
        self.blob_type = blob_type;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

/// Where a downloaded blob is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadBlobDestination {
    pub directory: PathBuf,
    /// What to do when the file already exists.
    #[serde(default)]
    pub file_exists_operation: CollisionPolicy,
}

impl DownloadBlobDestination {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            file_exists_operation: CollisionPolicy::Error,
        }
    }

    #[must_use]
    pub fn with_file_exists_operation(mut self, policy: CollisionPolicy) -> Self {
        self.file_exists_operation = policy;
        self
    }
}

/// The blob to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBlobTarget {
    pub blob_name: String,
    /// Only delete when the blob's ETag equals this value. Blank skips the
    /// check.
    #[serde(default)]
    pub verify_etag_when_deleting: Option<String>,
    #[serde(default)]
    pub blob_type: BlobKind,
    #[serde(default)]
    pub snapshot_delete_option: SnapshotDeleteOption,
}

impl DeleteBlobTarget {
    pub fn new(blob_name: impl Into<String>) -> Self {
        Self {
            blob_name: blob_name.into(),
            verify_etag_when_deleting: None,
            blob_type: BlobKind::Block,
            snapshot_delete_option: SnapshotDeleteOption::IncludeSnapshots,
        }
    }

    #[must_use]
    pub fn with_verify_etag(mut self, etag: impl Into<String>) -> Self {
        self.verify_etag_when_deleting = Some(etag.into());
        self
    }

    #[must_use]
    pub fn with_snapshot_delete_option(mut self, option: SnapshotDeleteOption) -> Self {
        self.snapshot_delete_option = option;
        self
    }
}

/// Container holding the blob a task works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobConnection {
    pub container_name: String,
}

impl BlobConnection {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
        }
    }
}

/// The container to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteContainerTarget {
    pub container_name: String,
}

impl DeleteContainerTarget {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
        }
    }
}

/// The local file to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadInput {
    pub source_file: PathBuf,
    /// Upload the raw bytes instead of re-encoding the text.
    #[serde(default)]
    pub contents_only: bool,
    /// Gzip the payload before uploading.
    #[serde(default)]
    pub compress: bool,
}

impl UploadInput {
    pub fn new(source_file: impl Into<PathBuf>) -> Self {
        Self {
            source_file: source_file.into(),
            contents_only: false,
            compress: false,
        }
    }

    #[must_use]
    pub fn with_contents_only(mut self, contents_only: bool) -> Self {
        self.contents_only = contents_only;
        self
    }

    #[must_use]
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Where and how a file is uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDestination {
    pub container_name: String,
    #[serde(default)]
    pub create_container_if_it_does_not_exist: bool,
    #[serde(default)]
    pub blob_type: BlobKind,
    /// Blob name to use instead of the source file name.
    #[serde(default)]
    pub rename_to: Option<String>,
    /// Explicit `Content-Type`. Blank guesses it from the file name.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Charset label for re-encoded uploads. Blank means UTF-8 with BOM.
    #[serde(default)]
    pub file_encoding: Option<String>,
    /// Replace an existing blob of the same name.
    #[serde(default = "default_true")]
    pub overwrite: bool,
    /// Concurrent transfer operations for this upload.
    #[serde(default = "default_parallel_operations")]
    pub parallel_operations: u32,
}

impl UploadDestination {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            create_container_if_it_does_not_exist: false,
            blob_type: BlobKind::Block,
            rename_to: None,
            content_type: None,
            file_encoding: None,
            overwrite: true,
            parallel_operations: DEFAULT_PARALLEL_OPERATIONS,
        }
    }

    #[must_use]
    pub fn with_create_container(mut self, create: bool) -> Self {
        self.create_container_if_it_does_not_exist = create;
        self
    }

    #[must_use]
    pub fn with_blob_type(mut self, blob_type: BlobKind) -> Self {
        self.blob_type = blob_type;
        self
    }

    #[must_use]
    pub fn with_rename_to(mut self, rename_to: impl Into<String>) -> Self {
        self.rename_to = Some(rename_to.into());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_file_encoding(mut self, file_encoding: impl Into<String>) -> Self {
        self.file_encoding = Some(file_encoding.into());
        self
    }

    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn with_parallel_operations(mut self, parallel_operations: u32) -> Self {
        self.parallel_operations = parallel_operations;
        self
    }
}

// ---------------------------------------------------------------------------
// Blob outputs
// ---------------------------------------------------------------------------

/// One listed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobData {
    /// `Block`, `Append`, `Page` or `Directory`.
    pub blob_type: String,
    pub uri: String,
    pub name: String,
    pub etag: Option<String>,
}

impl From<ObjectEntry> for BlobData {
    fn from(entry: ObjectEntry) -> Self {
        Self {
            blob_type: entry.kind.as_str().to_owned(),
            uri: entry.uri,
            name: entry.name,
            etag: entry.etag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlobsOutput {
    pub blobs: Vec<BlobData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadBlobOutput {
    pub file_name: String,
    pub directory: PathBuf,
    pub full_path: PathBuf,
}

impl From<WrittenFile> for DownloadBlobOutput {
    fn from(written: WrittenFile) -> Self {
        Self {
            file_name: written.file_name,
            directory: written.directory,
            full_path: written.full_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadBlobContentOutput {
    pub content: String,
}

/// Result of a blob or container delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutput {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutput {
    pub source_file: PathBuf,
    pub uri: String,
}

// ---------------------------------------------------------------------------
// Queue properties and outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConnection {
    pub queue_name: String,
}

impl QueueConnection {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessageInput {
    pub content: String,
    /// Create the queue first when it does not exist.
    #[serde(default = "default_true")]
    pub create_queue: bool,
}

impl QueueMessageInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            create_queue: true,
        }
    }

    #[must_use]
    pub fn with_create_queue(mut self, create_queue: bool) -> Self {
        self.create_queue = create_queue;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueOptions {
    /// Return failures as errors (`true`) or as `success = false` results.
    #[serde(default = "default_true")]
    pub throw_error_on_failure: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            throw_error_on_failure: true,
        }
    }
}

impl QueueOptions {
    /// Options that report failures in the result instead of returning them.
    pub fn report_failures() -> Self {
        Self {
            throw_error_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueOperationResult {
    pub success: bool,
    pub info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueLengthResult {
    pub success: bool,
    pub info: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePeekResult {
    pub success: bool,
    pub info: Option<String>,
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Storage account
// ---------------------------------------------------------------------------

/// Where an SDK-backed store connects and how it authenticates.
///
/// With `tenant_id`, `client_id` and `client_credential` all set the store
/// signs in as that service principal; otherwise it uses the Azure CLI login.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AzureStorageConfig {
    /// Storage account name; the endpoint is derived from it.
    pub account_name: Option<String>,
    /// Endpoint override, e.g. Azurite's `http://127.0.0.1:10000/devstoreaccount1`.
    pub endpoint_url: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_credential: Option<String>,
}

impl std::fmt::Debug for AzureStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureStorageConfig")
            .field("account_name", &self.account_name)
            .field("endpoint_url", &self.endpoint_url)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_credential",
                &self.client_credential.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl AzureStorageConfig {
    pub fn new(account_name: impl Into<String>) -> Self {
        Self {
            account_name: Some(account_name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    #[must_use]
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn with_client_credential(mut self, client_credential: impl Into<String>) -> Self {
        self.client_credential = Some(client_credential.into());
        self
    }

    /// Blob service endpoint: the override if set, otherwise
    /// `https://{account_name}.blob.core.windows.net`.
    pub fn blob_endpoint(&self) -> TaskResult<String> {
        if let Some(endpoint) = non_blank(self.endpoint_url.as_deref()) {
            return Ok(endpoint.trim().trim_end_matches('/').to_owned());
        }
        let account = non_blank(self.account_name.as_deref()).ok_or_else(|| {
            TaskError::invalid_input("account_name", "required when endpoint_url is not set")
        })?;
        Ok(format!("https://{}.blob.core.windows.net", account.trim()))
    }

    /// Service-principal triple, when every part of it is present.
    pub fn service_principal(&self) -> Option<(&str, &str, &str)> {
        Some((
            non_blank(self.tenant_id.as_deref())?,
            non_blank(self.client_id.as_deref())?,
            non_blank(self.client_credential.as_deref())?,
        ))
    }
}

// ---------------------------------------------------------------------------
// OAuth
// ---------------------------------------------------------------------------

/// Client-credential token request. The secret is redacted in `Debug`.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthProperties {
    /// Authority URL, e.g. `https://login.microsoftonline.com/{tenant}`.
    pub auth_context_url: String,
    /// Resource the token is for, e.g. `https://storage.azure.com`.
    pub resource: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthProperties")
            .field("auth_context_url", &self.auth_context_url)
            .field("resource", &self.resource)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl OAuthProperties {
    pub fn new(
        auth_context_url: impl Into<String>,
        resource: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            auth_context_url: auth_context_url.into(),
            resource: resource.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}
