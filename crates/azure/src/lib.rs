//! Azure storage tasks.
//!
//! Thin task adapters over pluggable storage collaborators:
//!
//! - [`BlobTasks`] lists, uploads, downloads, reads and deletes blobs over an
//!   [`ObjectStore`](cirrus_blob::ObjectStore)
//! - [`QueueTasks`] manages queues and their messages over a
//!   [`QueueStore`](cirrus_queue::QueueStore)
//! - [`get_access_token`] fetches OAuth tokens through a [`TokenProvider`];
//!   the `identity` feature adds one backed by `azure_identity`
//! - the `blob` feature adds [`AzureObjectStore`](storage::AzureObjectStore),
//!   an [`ObjectStore`](cirrus_blob::ObjectStore) over `azure_storage_blob`
//!
//! Local file handling is done by `cirrus-materialize`.

pub mod blob;
pub mod config;
pub mod error;
pub mod oauth;
pub mod queue;

#[cfg(feature = "identity")]
pub mod auth;
#[cfg(feature = "blob")]
pub mod storage;

pub use blob::BlobTasks;
pub use config::{
    AzureStorageConfig, BlobConnection, BlobData, DeleteBlobTarget, DeleteContainerTarget,
    DeleteOutput, DownloadBlobDestination, DownloadBlobOutput, DownloadBlobSource,
    ListBlobsOutput, ListBlobsSource, OAuthProperties, QueueConnection, QueueLengthResult,
    QueueMessageInput, QueueOperationResult, QueueOptions, QueuePeekResult,
    ReadBlobContentOutput, UploadDestination, UploadInput, UploadOutput,
};
pub use error::{TaskError, TaskResult, classify_azure_error};
pub use oauth::{TokenProvider, get_access_token};
pub use queue::QueueTasks;

#[cfg(feature = "identity")]
pub use auth::{AzureIdentityTokenProvider, build_azure_credential};
#[cfg(feature = "blob")]
pub use storage::{AzureObjectStore, classify_storage_error};
