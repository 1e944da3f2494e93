use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::compress::gunzip;
use crate::encoding::TextEncoding;
use crate::error::{MaterializeError, MaterializeResult};
use crate::names::{CollisionPolicy, resolve_destination_name};

/// Where a text write landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    /// Final file name after collision handling.
    pub file_name: String,
    /// Directory the file was written to.
    pub directory: PathBuf,
    /// `directory` joined with `file_name`.
    pub full_path: PathBuf,
}

/// Write `content` to `directory/base_name` in `encoding`, honouring
/// `policy` when the name is taken.
///
/// The encoding's preamble is written first. Under [`CollisionPolicy::Error`]
/// and [`CollisionPolicy::Rename`] the file is created exclusively, so a name
/// that appears between probing and writing is never overwritten; rename
/// moves on to the next free name.
pub fn write_text_to_file(
    content: &str,
    directory: &Path,
    base_name: &str,
    encoding: TextEncoding,
    policy: CollisionPolicy,
) -> MaterializeResult<WrittenFile> {
    let mut bytes = encoding.preamble().to_vec();
    bytes.extend(encoding.encode(content)?);

    let file_name = match policy {
        CollisionPolicy::Overwrite => {
            let file_name = resolve_destination_name(base_name, directory, policy)?;
            let path = directory.join(&file_name);
            fs::write(&path, &bytes)
                .map_err(|source| MaterializeError::io("write destination", path, source))?;
            file_name
        }
        CollisionPolicy::Error | CollisionPolicy::Rename => {
            write_exclusive(&bytes, directory, base_name, policy)?
        }
    };

    let full_path = directory.join(&file_name);
    info!(
        path = %full_path.display(),
        size = bytes.len(),
        encoding = %encoding,
        "text written to file"
    );
    Ok(WrittenFile {
        file_name,
        directory: directory.to_path_buf(),
        full_path,
    })
}

fn write_exclusive(
    bytes: &[u8],
    directory: &Path,
    base_name: &str,
    policy: CollisionPolicy,
) -> MaterializeResult<String> {
    loop {
        let file_name = resolve_destination_name(base_name, directory, policy)?;
        let path = directory.join(&file_name);
        match create_new(&path, bytes) {
            Ok(()) => return Ok(file_name),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if policy == CollisionPolicy::Rename {
                    debug!(
                        path = %path.display(),
                        "destination claimed concurrently, trying the next name"
                    );
                    continue;
                }
                return Err(MaterializeError::DestinationExists { path });
            }
            Err(source) => return Err(MaterializeError::io("write destination", path, source)),
        }
    }
}

fn create_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.flush()
}

/// Read a file written by [`write_text_to_file`] with the same encoding.
pub fn read_text_from_file(path: &Path, encoding: TextEncoding) -> MaterializeResult<String> {
    let bytes = fs::read(path).map_err(|source| MaterializeError::io("read file", path, source))?;
    encoding.decode_strict(&bytes)
}

/// Decode a downloaded blob body.
///
/// A `gzip` content encoding is inflated first; the remaining bytes are
/// decoded with `encoding`, letting a leading byte-order mark override it.
pub fn decode_content(
    body: &[u8],
    content_encoding: Option<&str>,
    encoding: TextEncoding,
) -> MaterializeResult<String> {
    let gzipped = content_encoding.is_some_and(|value| value.trim().eq_ignore_ascii_case("gzip"));
    if gzipped {
        let inflated = gunzip(body).map_err(|source| MaterializeError::Decompress { source })?;
        encoding.decode_document(&inflated)
    } else {
        encoding.decode_document(body)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::compress::gzip;

    const EXISTING: &str = "existing_file.txt";

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(EXISTING), "I'm walking here! I'm walking here!").unwrap();
        dir
    }

    fn txt_count(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "txt"))
            .count()
    }

    #[test]
    fn ten_renames_produce_eleven_files() {
        let dir = fixture();
        for _ in 0..10 {
            write_text_to_file(
                "You can't handle the truth!",
                dir.path(),
                EXISTING,
                TextEncoding::Utf8,
                CollisionPolicy::Rename,
            )
            .unwrap();
        }
        assert_eq!(txt_count(dir.path()), 11);
        for index in 1..=10 {
            assert!(dir.path().join(format!("existing_file({index}).txt")).is_file());
        }
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("report.txt"))
            .unwrap();

        let written = write_text_to_file(
            "x",
            dir.path(),
            "report.txt",
            TextEncoding::Utf8,
            CollisionPolicy::Rename,
        )
        .unwrap();
        assert_eq!(written.file_name, "report(1).txt");
        assert_eq!(fs::read_to_string(&written.full_path).unwrap(), "x");
        assert!(!dir.path().join("nowhere").exists());

        let err = write_text_to_file(
            "x",
            dir.path(),
            "report.txt",
            TextEncoding::Utf8,
            CollisionPolicy::Error,
        )
        .unwrap_err();
        assert!(matches!(err, MaterializeError::DestinationExists { .. }));
    }

    #[test]
    fn rename_reports_final_name() {
        let dir = fixture();
        let written = write_text_to_file(
            "content",
            dir.path(),
            EXISTING,
            TextEncoding::Utf8,
            CollisionPolicy::Rename,
        )
        .unwrap();
        assert_eq!(written.file_name, "existing_file(1).txt");
        assert_eq!(written.directory, dir.path());
        assert_eq!(written.full_path, dir.path().join("existing_file(1).txt"));
    }

    #[test]
    fn error_policy_leaves_existing_untouched() {
        let dir = fixture();
        let err = write_text_to_file(
            "replacement",
            dir.path(),
            EXISTING,
            TextEncoding::Utf8,
            CollisionPolicy::Error,
        )
        .unwrap_err();
        assert!(matches!(err, MaterializeError::DestinationExists { .. }));
        assert_eq!(
            fs::read_to_string(dir.path().join(EXISTING)).unwrap(),
            "I'm walking here! I'm walking here!"
        );
    }

    #[test]
    fn overwrite_replaces_content() {
        let dir = fixture();
        let written = write_text_to_file(
            "replacement",
            dir.path(),
            EXISTING,
            TextEncoding::Utf8,
            CollisionPolicy::Overwrite,
        )
        .unwrap();
        assert_eq!(written.file_name, EXISTING);
        assert_eq!(fs::read_to_string(&written.full_path).unwrap(), "replacement");
        assert_eq!(txt_count(dir.path()), 1);
    }

    #[test]
    fn roundtrip_in_every_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            (TextEncoding::Utf8, "plain ütf-8 ✓"),
            (TextEncoding::Utf8Bom, "\u{feff}leading mark kept"),
            (TextEncoding::Utf16Le, "ütf-16 𝄞 little"),
            (TextEncoding::Utf16Be, "ütf-16 𝄞 big"),
            (TextEncoding::Utf32Le, "ütf-32 𝄞"),
            (TextEncoding::Ascii, "just ascii"),
            (TextEncoding::Latin1, "latin-1 café"),
        ];
        for (index, (encoding, text)) in cases.into_iter().enumerate() {
            let name = format!("case{index}.txt");
            let written = write_text_to_file(
                text,
                dir.path(),
                &name,
                encoding,
                CollisionPolicy::Error,
            )
            .unwrap();
            assert_eq!(
                read_text_from_file(&written.full_path, encoding).unwrap(),
                text,
                "{encoding}"
            );
        }
    }

    #[test]
    fn bom_encodings_write_preamble() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_text_to_file(
            "x",
            dir.path(),
            "bom.txt",
            TextEncoding::Utf8Bom,
            CollisionPolicy::Error,
        )
        .unwrap();
        assert_eq!(fs::read(written.full_path).unwrap(), vec![0xEF, 0xBB, 0xBF, b'x']);
    }

    #[test]
    fn unrepresentable_text_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_text_to_file(
            "naïve",
            dir.path(),
            "ascii.txt",
            TextEncoding::Ascii,
            CollisionPolicy::Error,
        )
        .unwrap_err();
        assert!(matches!(err, MaterializeError::Unrepresentable { .. }));
        assert!(!dir.path().join("ascii.txt").exists());
    }

    #[test]
    fn missing_directory_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = write_text_to_file(
            "x",
            &missing,
            "a.txt",
            TextEncoding::Utf8,
            CollisionPolicy::Overwrite,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MaterializeError::Io {
                operation: "write destination",
                ..
            }
        ));
    }

    #[test]
    fn decode_content_inflates_gzip() {
        let body = gzip("compressed body".as_bytes()).unwrap();
        let text = decode_content(&body, Some("gzip"), TextEncoding::Utf8).unwrap();
        assert_eq!(text, "compressed body");
    }

    #[test]
    fn decode_content_reports_bad_gzip() {
        let err = decode_content(b"plain", Some("GZIP"), TextEncoding::Utf8).unwrap_err();
        assert!(matches!(err, MaterializeError::Decompress { .. }));
    }

    #[test]
    fn decode_content_plain() {
        let body = TextEncoding::Utf16Le.encode("wide").unwrap();
        let text = decode_content(&body, Some("utf-16"), TextEncoding::Utf16Le).unwrap();
        assert_eq!(text, "wide");
    }
}
