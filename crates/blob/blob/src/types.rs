use std::collections::BTreeSet;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BlobError;

/// Default number of concurrent transfer operations for a single upload.
pub const DEFAULT_PARALLEL_OPERATIONS: u32 = 64;

const MAX_BLOB_NAME_LEN: usize = 1024;

/// Kind of item in a container listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlobKind {
    /// Block blob, the general-purpose kind.
    #[default]
    Block,
    /// Append blob, optimized for append-only writes.
    Append,
    /// Page blob, random-access 512-byte pages.
    Page,
    /// Virtual directory produced by a hierarchical listing.
    Directory,
}

impl BlobKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "Block",
            Self::Append => "Append",
            Self::Page => "Page",
            Self::Directory => "Directory",
        }
    }

    /// Whether blobs of this kind can be written.
    pub const fn is_blob(self) -> bool {
        !matches!(self, Self::Directory)
    }
}

impl fmt::Display for BlobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to a blob's snapshots when the blob is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapshotDeleteOption {
    /// Delete only the base blob; fails on the service if snapshots exist.
    None,
    /// Delete the blob together with its snapshots.
    #[default]
    IncludeSnapshots,
    /// Delete the snapshots and keep the base blob.
    DeleteSnapshotsOnly,
}

/// One item of a container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Blob name, or the directory prefix (ending in `/`) for directories.
    pub name: String,
    pub kind: BlobKind,
    /// Absolute URI of the item.
    pub uri: String,
    /// Current ETag. Directories have none.
    pub etag: Option<String>,
}

/// Options for [`ObjectStore::put_object`](crate::ObjectStore::put_object).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub kind: BlobKind,
    /// `Content-Type` stored with the blob.
    pub content_type: Option<String>,
    /// `Content-Encoding` stored with the blob.
    pub content_encoding: Option<String>,
    /// Concurrent transfer operations for this upload. Backends that do not
    /// split uploads ignore it.
    pub parallel_operations: u32,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            kind: BlobKind::Block,
            content_type: None,
            content_encoding: None,
            parallel_operations: DEFAULT_PARALLEL_OPERATIONS,
        }
    }
}

impl PutOptions {
    #[must_use]
    pub fn with_kind(mut self, kind: BlobKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_content_encoding(mut self, content_encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(content_encoding.into());
        self
    }

    #[must_use]
    pub fn with_parallel_operations(mut self, parallel_operations: u32) -> Self {
        self.parallel_operations = parallel_operations;
        self
    }
}

/// Options for [`ObjectStore::delete_object`](crate::ObjectStore::delete_object).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub snapshots: SnapshotDeleteOption,
    /// Only delete when the blob's current ETag equals this value.
    pub if_match: Option<String>,
}

/// A blob as returned by [`ObjectStore::get_object`](crate::ObjectStore::get_object).
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub entry: ObjectEntry,
    /// Raw body.
    pub data: Bytes,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// Fold a name-ordered flat listing under `prefix` into a hierarchical one.
///
/// A blob with a further `/` after `prefix` is replaced by a single
/// [`BlobKind::Directory`] entry for its first virtual directory, whose URI
/// comes from `directory_uri`. Entries outside `prefix` are dropped.
pub fn collapse_directories(
    prefix: &str,
    entries: impl IntoIterator<Item = ObjectEntry>,
    directory_uri: impl Fn(&str) -> String,
) -> Vec<ObjectEntry> {
    let mut collapsed = Vec::new();
    let mut seen = BTreeSet::new();
    for entry in entries {
        let Some(rest) = entry.name.strip_prefix(prefix) else {
            continue;
        };
        match rest.find('/') {
            Some(slash) => {
                let directory = &entry.name[..prefix.len() + slash + 1];
                if seen.insert(directory.to_owned()) {
                    collapsed.push(ObjectEntry {
                        name: directory.to_owned(),
                        kind: BlobKind::Directory,
                        uri: directory_uri(directory),
                        etag: None,
                    });
                }
            }
            None => collapsed.push(entry),
        }
    }
    collapsed
}

/// Check a container name against the Azure naming rules: 3-63 characters of
/// lowercase letters, digits and single dashes, starting and ending with a
/// letter or digit. `$root` is also accepted.
pub fn validate_container_name(name: &str) -> Result<(), BlobError> {
    if name == "$root" {
        return Ok(());
    }
    let invalid = |reason: &str| BlobError::InvalidName(format!("container '{name}': {reason}"));
    if !(3..=63).contains(&name.len()) {
        return Err(invalid("must be 3-63 characters long"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(invalid("only lowercase letters, digits and '-' are allowed"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    if name.contains("--") {
        return Err(invalid("consecutive '-' are not allowed"));
    }
    Ok(())
}

/// Check a blob name: 1-1024 characters, not blank.
pub fn validate_blob_name(name: &str) -> Result<(), BlobError> {
    if name.trim().is_empty() {
        return Err(BlobError::InvalidName("blob name is empty".to_owned()));
    }
    if name.chars().count() > MAX_BLOB_NAME_LEN {
        return Err(BlobError::InvalidName(format!(
            "blob name exceeds {MAX_BLOB_NAME_LEN} characters"
        )));
    }
    Ok(())
}
