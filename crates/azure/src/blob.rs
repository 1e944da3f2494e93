use std::sync::Arc;

use bytes::Bytes;
use cirrus_blob::store::ObjectStore;
use cirrus_blob::types::{BlobKind, DeleteOptions, PutOptions, StoredObject};
use cirrus_materialize::{
    SourceFile, StreamOptions, TextEncoding, build_upload_stream, decode_content,
    ensure_not_cancelled, write_text_to_file,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{
    BlobConnection, BlobData, DeleteBlobTarget, DeleteContainerTarget, DeleteOutput,
    DownloadBlobDestination, DownloadBlobOutput, DownloadBlobSource, ListBlobsOutput,
    ListBlobsSource, ReadBlobContentOutput, UploadDestination, UploadInput, UploadOutput,
    non_blank, require,
};
use crate::error::{TaskError, TaskResult};

/// Blob storage tasks over an [`ObjectStore`].
#[derive(Clone)]
pub struct BlobTasks {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for BlobTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobTasks").finish_non_exhaustive()
    }
}

impl BlobTasks {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// List the blobs of a container, flat or one directory level deep.
    #[instrument(skip(self, source), fields(container = %source.container_name))]
    pub async fn list_blobs(&self, source: &ListBlobsSource) -> TaskResult<ListBlobsOutput> {
        require("container_name", &source.container_name)?;
        let prefix = non_blank(source.prefix.as_deref());

        let entries = self
            .store
            .list_objects(&source.container_name, prefix, source.flat_blob_listing)
            .await
            .map_err(TaskError::blob("list blobs"))?;

        debug!(count = entries.len(), flat = source.flat_blob_listing, "blobs listed");
        Ok(ListBlobsOutput {
            blobs: entries.into_iter().map(BlobData::from).collect(),
        })
    }

    /// Download a text blob to a local file.
    ///
    /// The file is named after the last segment of the blob name and written
    /// in the encoding the blob was decoded with.
    #[instrument(
        skip(self, source, destination, cancel),
        fields(container = %source.container_name, blob = %source.blob_name)
    )]
    pub async fn download_blob(
        &self,
        source: &DownloadBlobSource,
        destination: &DownloadBlobDestination,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<DownloadBlobOutput> {
        let (content, encoding) = self.fetch_text(source, cancel).await?;
        ensure_not_cancelled(cancel)?;

        let file_name = local_file_name(&source.blob_name)?;
        let written = write_text_to_file(
            &content,
            &destination.directory,
            file_name,
            encoding,
            destination.file_exists_operation,
        )?;
        info!(path = %written.full_path.display(), "blob downloaded");
        Ok(written.into())
    }

    /// Read a text blob into memory.
    #[instrument(
        skip(self, source, cancel),
        fields(container = %source.container_name, blob = %source.blob_name)
    )]
    pub async fn read_blob_content(
        &self,
        source: &DownloadBlobSource,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<ReadBlobContentOutput> {
        let (content, _) = self.fetch_text(source, cancel).await?;
        Ok(ReadBlobContentOutput { content })
    }

    /// Delete a blob. A missing blob counts as deleted.
    #[instrument(
        skip(self, target, connection, cancel),
        fields(container = %connection.container_name, blob = %target.blob_name)
    )]
    pub async fn delete_blob(
        &self,
        target: &DeleteBlobTarget,
        connection: &BlobConnection,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<DeleteOutput> {
        ensure_not_cancelled(cancel)?;
        require("container_name", &connection.container_name)?;
        require("blob_name", &target.blob_name)?;
        ensure_blob_kind("blob_type", target.blob_type)?;

        let container = connection.container_name.as_str();
        let exists = self
            .store
            .object_exists(container, &target.blob_name)
            .await
            .map_err(TaskError::blob("check blob"))?;
        if !exists {
            debug!("blob does not exist, nothing to delete");
            return Ok(DeleteOutput { success: true });
        }
        ensure_not_cancelled(cancel)?;

        let options = DeleteOptions {
            snapshots: target.snapshot_delete_option,
            if_match: non_blank(target.verify_etag_when_deleting.as_deref()).map(str::to_owned),
        };
        let success = self
            .store
            .delete_object(container, &target.blob_name, &options)
            .await
            .map_err(TaskError::blob("delete blob"))?;

        info!(success, etag_checked = options.if_match.is_some(), "blob delete finished");
        Ok(DeleteOutput { success })
    }

    /// Delete a container and everything in it. A missing container counts
    /// as deleted.
    #[instrument(skip(self, target, cancel), fields(container = %target.container_name))]
    pub async fn delete_container(
        &self,
        target: &DeleteContainerTarget,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<DeleteOutput> {
        ensure_not_cancelled(cancel)?;
        require("container_name", &target.container_name)?;

        let exists = self
            .store
            .container_exists(&target.container_name)
            .await
            .map_err(TaskError::blob("check container"))?;
        if !exists {
            debug!("container does not exist, nothing to delete");
            return Ok(DeleteOutput { success: true });
        }

        let success = self
            .store
            .delete_container_if_exists(&target.container_name)
            .await
            .map_err(TaskError::blob("delete container"))?;
        info!(success, "container delete finished");
        Ok(DeleteOutput { success })
    }

    /// Upload a local file as a blob.
    ///
    /// The source is read, re-encoded and compressed before the store is
    /// touched, so a missing file fails without any remote side effect.
    #[instrument(
        skip(self, input, destination, cancel),
        fields(
            container = %destination.container_name,
            source = %input.source_file.display(),
        )
    )]
    pub async fn upload_file(
        &self,
        input: &UploadInput,
        destination: &UploadDestination,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<UploadOutput> {
        ensure_not_cancelled(cancel)?;

        let source = SourceFile::inspect(&input.source_file)?;
        let encoding = TextEncoding::parse(destination.file_encoding.as_deref().unwrap_or_default())?;
        let options = StreamOptions::new(encoding)
            .with_compress(input.compress)
            .with_contents_only(input.contents_only);
        let stream = build_upload_stream(&source, &options, cancel)?;

        require("container_name", &destination.container_name)?;
        ensure_blob_kind("blob_type", destination.blob_type)?;
        if destination.parallel_operations == 0 {
            return Err(TaskError::invalid_input(
                "parallel_operations",
                "must be at least 1",
            ));
        }

        let blob_name = match non_blank(destination.rename_to.as_deref()) {
            Some(name) => name.to_owned(),
            None => source
                .file_name()
                .ok_or_else(|| {
                    TaskError::invalid_input("source_file", "has no usable file name")
                })?
                .to_owned(),
        };
        let content_type = match non_blank(destination.content_type.as_deref()) {
            Some(content_type) => content_type.to_owned(),
            None => mime_guess::from_path(&blob_name)
                .first_or_octet_stream()
                .essence_str()
                .to_owned(),
        };

        let container = destination.container_name.as_str();
        if destination.create_container_if_it_does_not_exist {
            let created = self
                .store
                .create_container_if_not_exists(container)
                .await
                .map_err(TaskError::blob("create container"))?;
            if created {
                info!("container created");
            }
        }
        ensure_not_cancelled(cancel)?;

        if !destination.overwrite {
            let exists = self
                .store
                .object_exists(container, &blob_name)
                .await
                .map_err(TaskError::blob("check blob"))?;
            if exists {
                return Err(TaskError::BlobAlreadyExists {
                    container: container.to_owned(),
                    name: blob_name,
                });
            }
        }

        let put = PutOptions::default()
            .with_kind(destination.blob_type)
            .with_content_type(content_type)
            .with_content_encoding(options.content_encoding())
            .with_parallel_operations(destination.parallel_operations);
        debug!(
            blob = %blob_name,
            size = stream.len(),
            compressed = stream.is_compressed(),
            "uploading blob"
        );
        let entry = self
            .store
            .put_object(container, &blob_name, Bytes::from(stream.into_bytes()), &put)
            .await
            .map_err(TaskError::blob("upload blob"))?;

        info!(uri = %entry.uri, "file uploaded");
        Ok(UploadOutput {
            source_file: input.source_file.clone(),
            uri: entry.uri,
        })
    }

    async fn fetch_text(
        &self,
        source: &DownloadBlobSource,
        cancel: Option<&CancellationToken>,
    ) -> TaskResult<(String, TextEncoding)> {
        ensure_not_cancelled(cancel)?;
        require("container_name", &source.container_name)?;
        require("blob_name", &source.blob_name)?;
        ensure_blob_kind("blob_type", source.blob_type)?;
        let explicit = non_blank(source.encoding.as_deref())
            .map(TextEncoding::parse)
            .transpose()?;

        let blob = self
            .store
            .get_object(&source.container_name, &source.blob_name)
            .await
            .map_err(TaskError::blob("download blob"))?
            .ok_or_else(|| TaskError::BlobNotFound {
                container: source.container_name.clone(),
                name: source.blob_name.clone(),
            })?;
        ensure_not_cancelled(cancel)?;

        if blob.entry.kind != source.blob_type {
            warn!(
                requested = %source.blob_type,
                stored = %blob.entry.kind,
                "blob type differs from the requested type"
            );
        }

        let encoding = explicit.unwrap_or_else(|| stored_encoding(&blob));
        let content = decode_content(&blob.data, blob.content_encoding.as_deref(), encoding)?;
        debug!(size = blob.data.len(), %encoding, "blob content decoded");
        Ok((content, encoding))
    }
}

/// Charset recorded on the blob, or UTF-8 when it names none.
fn stored_encoding(blob: &StoredObject) -> TextEncoding {
    blob.content_encoding
        .as_deref()
        .and_then(TextEncoding::from_content_encoding)
        .unwrap_or(TextEncoding::Utf8)
}

/// The local name for a downloaded blob: its last `/` segment.
fn local_file_name(blob_name: &str) -> TaskResult<&str> {
    blob_name
        .rsplit('/')
        .next()
        .filter(|segment| !segment.trim().is_empty())
        .ok_or_else(|| TaskError::invalid_input("blob_name", "does not end in a file name"))
}

fn ensure_blob_kind(field: &'static str, kind: BlobKind) -> TaskResult<()> {
    if kind.is_blob() {
        Ok(())
    } else {
        Err(TaskError::invalid_input(field, format!("{kind} is not a blob type")))
    }
}
