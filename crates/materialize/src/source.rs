use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{MaterializeError, MaterializeResult};

/// A local file selected for upload.
///
/// Captures the path, whether a regular file exists there and its length at
/// inspection time. Directories count as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    exists: bool,
    len: u64,
}

impl SourceFile {
    /// Inspect `path` without opening it.
    ///
    /// A missing path is not an error here; [`SourceFile::exists`] reports it.
    pub fn inspect(path: impl Into<PathBuf>) -> MaterializeResult<Self> {
        let path = path.into();
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Self {
                len: meta.len(),
                exists: true,
                path,
            }),
            Ok(_) => Ok(Self {
                path,
                exists: false,
                len: 0,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self {
                path,
                exists: false,
                len: 0,
            }),
            Err(source) => Err(MaterializeError::io("inspect source", path, source)),
        }
    }

    /// Path as given to [`SourceFile::inspect`].
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Length in bytes, zero when the file does not exist.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Final path component, if it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    pub(crate) fn ensure_exists(&self) -> MaterializeResult<()> {
        if self.exists {
            Ok(())
        } else {
            Err(MaterializeError::SourceNotFound {
                path: self.path.clone(),
            })
        }
    }

    /// Read the whole file. The handle is closed before this returns.
    pub(crate) fn read(&self) -> MaterializeResult<Vec<u8>> {
        fs::read(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                MaterializeError::SourceNotFound {
                    path: self.path.clone(),
                }
            } else {
                MaterializeError::io("read source", &self.path, source)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TestFile.xml");
        fs::write(&path, "<root/>").unwrap();

        let source = SourceFile::inspect(&path).unwrap();
        assert!(source.exists());
        assert_eq!(source.len(), 7);
        assert_eq!(source.file_name(), Some("TestFile.xml"));
        assert!(source.ensure_exists().is_ok());
    }

    #[test]
    fn inspect_missing_file() {
        let source = SourceFile::inspect("NonExistingFile").unwrap();
        assert!(!source.exists());
        assert!(source.is_empty());
        assert!(matches!(
            source.ensure_exists(),
            Err(MaterializeError::SourceNotFound { .. })
        ));
    }

    #[test]
    fn directory_is_not_a_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceFile::inspect(dir.path()).unwrap();
        assert!(!source.exists());
    }

    #[test]
    fn read_after_removal_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        fs::write(&path, "soon gone").unwrap();
        let source = SourceFile::inspect(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            source.read(),
            Err(MaterializeError::SourceNotFound { .. })
        ));
    }
}
