//! [`ObjectStore`] over the Azure Blob Storage SDK.

use async_trait::async_trait;
use azure_core::error::ErrorKind;
use azure_core::http::headers::{
    CONTENT_ENCODING, CONTENT_TYPE, ETAG, HeaderName, Headers, LAST_MODIFIED,
};
use azure_storage_blob::BlobServiceClient;
use azure_storage_blob::models::{
    AppendBlobClientCreateOptions, BlobClientDeleteOptions,
    BlobContainerClientListBlobFlatSegmentOptions, BlobType, BlockBlobClientUploadOptions,
    DeleteSnapshotsOptionType,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use tracing::{debug, error, info, instrument};

use cirrus_blob::{
    BlobError, BlobKind, DeleteOptions, ObjectEntry, ObjectStore, PutOptions,
    SnapshotDeleteOption, StoredObject, collapse_directories, validate_blob_name,
    validate_container_name,
};

use crate::auth::build_azure_credential;
use crate::config::AzureStorageConfig;
use crate::error::{TaskError, TaskResult};

const BLOB_TYPE: HeaderName = HeaderName::from_static("x-ms-blob-type");

/// Blob store backed by a storage account.
///
/// Block and append blobs can be written. Page blobs need 512-byte aligned
/// writes and are rejected on upload; they can still be listed, read and
/// deleted.
pub struct AzureObjectStore {
    service: BlobServiceClient,
    endpoint: String,
}

impl std::fmt::Debug for AzureObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureObjectStore")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl AzureObjectStore {
    /// Build a service client for the account in `config`.
    pub fn new(config: &AzureStorageConfig) -> TaskResult<Self> {
        let endpoint = config.blob_endpoint()?;
        let credential = build_azure_credential(config)?;
        let service = BlobServiceClient::new(&endpoint, Some(credential), None)
            .map_err(|e| TaskError::Configuration(format!("blob client error: {e}")))?;
        info!(endpoint = %endpoint, "blob service client ready");
        Ok(Self { service, endpoint })
    }

    fn uri(&self, container: &str, name: &str) -> String {
        format!("{}/{container}/{name}", self.endpoint)
    }

    async fn entry(&self, container: &str, name: &str) -> Result<ObjectEntry, BlobError> {
        let response = self
            .service
            .blob_client(container, name)
            .get_properties(None)
            .await
            .map_err(|e| storage_error(&e, container, Some(name)))?;
        Ok(entry_from_headers(
            self.uri(container, name),
            name,
            response.headers(),
        ))
    }
}

#[async_trait]
impl ObjectStore for AzureObjectStore {
    #[instrument(skip(self), fields(backend = "azure"))]
    async fn container_exists(&self, container: &str) -> Result<bool, BlobError> {
        let result = self
            .service
            .blob_container_client(container)
            .get_properties(None)
            .await
            .map(drop)
            .map_err(|e| storage_error(&e, container, None));
        Ok(absent_on_missing(result)?.is_some())
    }

    #[instrument(skip(self), fields(backend = "azure"))]
    async fn create_container_if_not_exists(&self, container: &str) -> Result<bool, BlobError> {
        validate_container_name(container)?;
        match self
            .service
            .blob_container_client(container)
            .create_container(None)
            .await
        {
            Ok(_) => {
                info!(container, "container created");
                Ok(true)
            }
            Err(e) if error_code(&e) == Some("ContainerAlreadyExists") => Ok(false),
            Err(e) => Err(storage_error(&e, container, None)),
        }
    }

    #[instrument(skip(self), fields(backend = "azure"))]
    async fn delete_container_if_exists(&self, container: &str) -> Result<bool, BlobError> {
        let result = self
            .service
            .blob_container_client(container)
            .delete_container(None)
            .await
            .map(drop)
            .map_err(|e| storage_error(&e, container, None));
        let deleted = absent_on_missing(result)?.is_some();
        if deleted {
            info!(container, "container deleted");
        }
        Ok(deleted)
    }

    #[instrument(skip(self), fields(backend = "azure"))]
    async fn object_exists(&self, container: &str, name: &str) -> Result<bool, BlobError> {
        let result = self
            .service
            .blob_client(container, name)
            .get_properties(None)
            .await
            .map(drop)
            .map_err(|e| storage_error(&e, container, Some(name)));
        Ok(absent_on_missing(result)?.is_some())
    }

    #[instrument(skip(self, data, options), fields(backend = "azure", kind = %options.kind))]
    async fn put_object(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        options: &PutOptions,
    ) -> Result<ObjectEntry, BlobError> {
        validate_blob_name(name)?;
        let blob_client = self.service.blob_client(container, name);
        let length = data.len() as u64;
        debug!(
            size = length,
            parallel_operations = options.parallel_operations,
            "uploading blob"
        );

        match options.kind {
            BlobKind::Block => {
                let upload_options = BlockBlobClientUploadOptions {
                    blob_content_type: options.content_type.clone(),
                    blob_content_encoding: options.content_encoding.clone(),
                    ..Default::default()
                };
                blob_client
                    .upload(data.into(), true, length, Some(upload_options))
                    .await
                    .map_err(|e| storage_error(&e, container, Some(name)))?;
            }
            BlobKind::Append => {
                let append_client = blob_client.append_blob_client();
                let create_options = AppendBlobClientCreateOptions {
                    blob_content_type: options.content_type.clone(),
                    blob_content_encoding: options.content_encoding.clone(),
                    ..Default::default()
                };
                append_client
                    .create(Some(create_options))
                    .await
                    .map_err(|e| storage_error(&e, container, Some(name)))?;
                if length > 0 {
                    append_client
                        .append_block(data.into(), length, None)
                        .await
                        .map_err(|e| storage_error(&e, container, Some(name)))?;
                }
            }
            BlobKind::Page | BlobKind::Directory => {
                return Err(BlobError::Unsupported(format!(
                    "cannot upload a {} blob",
                    options.kind
                )));
            }
        }

        info!(size = length, "blob uploaded");
        self.entry(container, name).await
    }

    #[instrument(skip(self), fields(backend = "azure"))]
    async fn get_object(
        &self,
        container: &str,
        name: &str,
    ) -> Result<Option<StoredObject>, BlobError> {
        let response = match self.service.blob_client(container, name).download(None).await {
            Ok(response) => response,
            Err(e) => return absent_on_missing(Err(storage_error(&e, container, Some(name)))),
        };

        let headers = response.headers();
        let entry = entry_from_headers(self.uri(container, name), name, headers);
        let content_type = headers.get_optional_str(&CONTENT_TYPE).map(str::to_owned);
        let content_encoding = headers
            .get_optional_str(&CONTENT_ENCODING)
            .map(str::to_owned);
        let last_modified = last_modified(headers);

        let data: Bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| storage_error(&e, container, Some(name)))?;
        debug!(size = data.len(), "blob downloaded");

        Ok(Some(StoredObject {
            entry,
            data,
            content_type,
            content_encoding,
            last_modified,
        }))
    }

    #[instrument(skip(self, options), fields(backend = "azure"))]
    async fn delete_object(
        &self,
        container: &str,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<bool, BlobError> {
        let delete_options = BlobClientDeleteOptions {
            delete_snapshots: snapshot_option(options.snapshots),
            if_match: options.if_match.clone(),
            ..Default::default()
        };
        match self
            .service
            .blob_client(container, name)
            .delete(Some(delete_options))
            .await
        {
            Ok(_) => {
                info!("blob deleted");
                Ok(true)
            }
            Err(e) if error_code(&e) == Some("ConditionNotMet") => {
                Err(BlobError::ConditionNotMet {
                    name: name.to_owned(),
                    expected: options.if_match.clone().unwrap_or_default(),
                })
            }
            Err(e) => {
                absent_on_missing::<()>(Err(storage_error(&e, container, Some(name))))
                    .map(|_| false)
            }
        }
    }

    #[instrument(skip(self), fields(backend = "azure"))]
    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
        flat: bool,
    ) -> Result<Vec<ObjectEntry>, BlobError> {
        let list_options = BlobContainerClientListBlobFlatSegmentOptions {
            prefix: prefix.map(str::to_owned),
            ..Default::default()
        };
        let mut items = self
            .service
            .blob_container_client(container)
            .list_blobs(Some(list_options))
            .map_err(|e| storage_error(&e, container, None))?;

        let mut entries = Vec::new();
        while let Some(item) = items
            .try_next()
            .await
            .map_err(|e| storage_error(&e, container, None))?
        {
            let Some(name) = item.name.and_then(|name| name.content) else {
                continue;
            };
            let properties = item.properties;
            entries.push(ObjectEntry {
                uri: self.uri(container, &name),
                kind: listed_kind(properties.as_ref().and_then(|p| p.blob_type.as_ref())),
                etag: properties
                    .as_ref()
                    .and_then(|p| p.etag.as_ref())
                    .map(ToString::to_string),
                name,
            });
        }
        debug!(count = entries.len(), "blobs listed");

        if flat {
            return Ok(entries);
        }
        Ok(collapse_directories(
            prefix.unwrap_or_default(),
            entries,
            |directory| self.uri(container, directory),
        ))
    }
}

/// The service's `x-ms-error-code` for a failed request.
fn error_code(err: &azure_core::Error) -> Option<&str> {
    match err.kind() {
        ErrorKind::HttpResponse { error_code, .. } => error_code.as_deref(),
        _ => None,
    }
}

fn storage_error(err: &azure_core::Error, container: &str, name: Option<&str>) -> BlobError {
    let mapped = classify_storage_error(error_code(err), container, name, err.to_string());
    if let BlobError::Storage(message) = &mapped {
        error!(error = %message, container, name, "blob storage request failed");
    } else {
        debug!(error = %mapped, "blob storage request rejected");
    }
    mapped
}

/// Map a storage service error code onto [`BlobError`].
///
/// Missing containers and blobs keep their own variants so callers can treat
/// them as absence; everything unrecognised is a [`BlobError::Storage`].
pub fn classify_storage_error(
    code: Option<&str>,
    container: &str,
    name: Option<&str>,
    message: String,
) -> BlobError {
    match (code, name) {
        (Some("ContainerNotFound"), _) => BlobError::ContainerNotFound(container.to_owned()),
        (Some("BlobNotFound"), Some(name)) => {
            BlobError::NotFound(format!("{container}/{name}"))
        }
        (Some("InvalidResourceName" | "InvalidUri"), _) => BlobError::InvalidName(message),
        _ => BlobError::Storage(message),
    }
}

/// `Ok(None)` when the blob or its container is missing.
fn absent_on_missing<T>(result: Result<T, BlobError>) -> Result<Option<T>, BlobError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(BlobError::NotFound(_) | BlobError::ContainerNotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn snapshot_option(option: SnapshotDeleteOption) -> Option<DeleteSnapshotsOptionType> {
    match option {
        SnapshotDeleteOption::None => None,
        SnapshotDeleteOption::IncludeSnapshots => Some(DeleteSnapshotsOptionType::Include),
        SnapshotDeleteOption::DeleteSnapshotsOnly => Some(DeleteSnapshotsOptionType::Only),
    }
}

fn listed_kind(blob_type: Option<&BlobType>) -> BlobKind {
    match blob_type {
        Some(BlobType::AppendBlob) => BlobKind::Append,
        Some(BlobType::PageBlob) => BlobKind::Page,
        _ => BlobKind::Block,
    }
}

fn header_kind(value: Option<&str>) -> BlobKind {
    match value {
        Some("AppendBlob") => BlobKind::Append,
        Some("PageBlob") => BlobKind::Page,
        _ => BlobKind::Block,
    }
}

fn entry_from_headers(uri: String, name: &str, headers: &Headers) -> ObjectEntry {
    ObjectEntry {
        name: name.to_owned(),
        kind: header_kind(headers.get_optional_str(&BLOB_TYPE)),
        uri,
        etag: headers.get_optional_str(&ETAG).map(str::to_owned),
    }
}

/// `Last-Modified` is an RFC 1123 date; a missing or garbled one reads as now.
fn last_modified(headers: &Headers) -> DateTime<Utc> {
    headers
        .get_optional_str(&LAST_MODIFIED)
        .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
        .map_or_else(Utc::now, |value| value.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn error_codes_map_to_blob_errors() {
        let missing_blob = classify_storage_error(
            Some("BlobNotFound"),
            "reports",
            Some("a.txt"),
            "404".to_owned(),
        );
        assert!(
            matches!(missing_blob, BlobError::NotFound(ref path) if path == "reports/a.txt")
        );

        let missing_container =
            classify_storage_error(Some("ContainerNotFound"), "reports", None, "404".to_owned());
        assert!(
            matches!(missing_container, BlobError::ContainerNotFound(ref c) if c == "reports")
        );

        let throttled = classify_storage_error(
            Some("ServerBusy"),
            "reports",
            Some("a.txt"),
            "503 server busy".to_owned(),
        );
        assert!(matches!(throttled, BlobError::Storage(ref m) if m == "503 server busy"));

        let no_code = classify_storage_error(None, "reports", None, "connection reset".to_owned());
        assert!(matches!(no_code, BlobError::Storage(_)));
    }

    #[test]
    fn missing_objects_read_as_absent() {
        let blob = absent_on_missing::<u8>(Err(BlobError::NotFound("reports/a.txt".into())));
        assert!(blob.unwrap().is_none());

        let container = absent_on_missing::<u8>(Err(BlobError::ContainerNotFound("r".into())));
        assert!(container.unwrap().is_none());

        assert_eq!(absent_on_missing(Ok(7)).unwrap(), Some(7));
        assert!(absent_on_missing::<u8>(Err(BlobError::Storage("boom".into()))).is_err());
    }

    #[test]
    fn snapshot_options() {
        assert!(snapshot_option(SnapshotDeleteOption::None).is_none());
        assert!(matches!(
            snapshot_option(SnapshotDeleteOption::IncludeSnapshots),
            Some(DeleteSnapshotsOptionType::Include)
        ));
        assert!(matches!(
            snapshot_option(SnapshotDeleteOption::DeleteSnapshotsOnly),
            Some(DeleteSnapshotsOptionType::Only)
        ));
    }

    #[test]
    fn entry_is_read_from_response_headers() {
        let mut headers = Headers::new();
        headers.insert(BLOB_TYPE, "AppendBlob");
        headers.insert(ETAG, "\"0x8DC0000000000A1\"");
        headers.insert(LAST_MODIFIED, "Tue, 06 Jan 2026 10:15:00 GMT");

        let entry = entry_from_headers(
            "https://acct.blob.core.windows.net/reports/a.log".to_owned(),
            "a.log",
            &headers,
        );
        assert_eq!(entry.name, "a.log");
        assert_eq!(entry.kind, BlobKind::Append);
        assert_eq!(entry.etag.as_deref(), Some("\"0x8DC0000000000A1\""));
        assert_eq!(
            last_modified(&headers),
            Utc.with_ymd_and_hms(2026, 1, 6, 10, 15, 0).unwrap()
        );
    }

    #[test]
    fn unknown_blob_type_is_a_block_blob() {
        assert_eq!(header_kind(None), BlobKind::Block);
        assert_eq!(header_kind(Some("BlockBlob")), BlobKind::Block);
        assert_eq!(header_kind(Some("PageBlob")), BlobKind::Page);
        assert_eq!(listed_kind(None), BlobKind::Block);
        assert_eq!(listed_kind(Some(&BlobType::PageBlob)), BlobKind::Page);
    }

    #[test]
    fn store_requires_an_account_or_endpoint() {
        let err = AzureObjectStore::new(&AzureStorageConfig::default()).unwrap_err();
        assert!(matches!(err, TaskError::InvalidInput { field: "account_name", .. }));
    }
}
