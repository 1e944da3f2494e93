use std::io::{self, Cursor, Read, Seek, SeekFrom};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::compress::gzip;
use crate::encoding::TextEncoding;
use crate::ensure_not_cancelled;
use crate::error::{MaterializeError, MaterializeResult};
use crate::source::SourceFile;

/// How a [`SourceFile`] is turned into an upload stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamOptions {
    /// Gzip the payload.
    pub compress: bool,
    /// Send the file bytes as they are instead of re-encoding the text.
    pub contents_only: bool,
    /// Target encoding for re-encoded text.
    pub encoding: TextEncoding,
}

impl StreamOptions {
    /// Create options with the given encoding, no compression and text
    /// re-encoding enabled.
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            compress: false,
            contents_only: false,
            encoding,
        }
    }

    #[must_use]
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    #[must_use]
    pub fn with_contents_only(mut self, contents_only: bool) -> Self {
        self.contents_only = contents_only;
        self
    }

    /// Value for the blob `Content-Encoding` header.
    pub fn content_encoding(&self) -> &'static str {
        if self.compress {
            "gzip"
        } else {
            self.encoding.web_name()
        }
    }
}

/// A fully buffered, seekable upload body.
///
/// Always positioned at its start when returned from
/// [`build_upload_stream`]. Holds no file handle.
#[derive(Debug)]
pub enum UploadStream {
    /// Plain bytes, either raw file contents or re-encoded text.
    Raw(Cursor<Vec<u8>>),
    /// A complete gzip member.
    Compressed(Cursor<Vec<u8>>),
}

impl UploadStream {
    /// Total length of the body in bytes.
    pub fn len(&self) -> u64 {
        self.cursor().get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cursor().get_ref().is_empty()
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed(_))
    }

    /// The whole body regardless of the read position.
    pub fn as_bytes(&self) -> &[u8] {
        self.cursor().get_ref()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Raw(cursor) | Self::Compressed(cursor) => cursor.into_inner(),
        }
    }

    fn cursor(&self) -> &Cursor<Vec<u8>> {
        match self {
            Self::Raw(cursor) | Self::Compressed(cursor) => cursor,
        }
    }

    fn cursor_mut(&mut self) -> &mut Cursor<Vec<u8>> {
        match self {
            Self::Raw(cursor) | Self::Compressed(cursor) => cursor,
        }
    }
}

impl Read for UploadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor_mut().read(buf)
    }
}

impl Seek for UploadStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor_mut().seek(pos)
    }
}

/// Build an upload body from `source`.
///
/// With `contents_only` the file bytes are used verbatim. Otherwise the file
/// is decoded as text (a leading byte-order mark wins, else
/// `options.encoding`) and re-encoded with `options.encoding`. With
/// `compress` the result is gzipped into memory so the length is known up
/// front.
///
/// The file is read and closed before any encoding or compression happens,
/// so no handle outlives this call even on failure.
pub fn build_upload_stream(
    source: &SourceFile,
    options: &StreamOptions,
    cancel: Option<&CancellationToken>,
) -> MaterializeResult<UploadStream> {
    ensure_not_cancelled(cancel)?;
    source.ensure_exists()?;

    let raw = source.read()?;
    let payload = if options.contents_only {
        raw
    } else {
        let text = options.encoding.decode_document(&raw)?;
        options.encoding.encode(&text)?
    };

    ensure_not_cancelled(cancel)?;

    if !options.compress {
        debug!(
            path = %source.path().display(),
            size = payload.len(),
            encoding = %options.encoding,
            "built raw upload stream"
        );
        return Ok(UploadStream::Raw(Cursor::new(payload)));
    }

    let compressed =
        gzip(&payload).map_err(|err| MaterializeError::io("compress source", source.path(), err))?;
    debug!(
        path = %source.path().display(),
        original_size = payload.len(),
        compressed_size = compressed.len(),
        "built gzip upload stream"
    );
    Ok(UploadStream::Compressed(Cursor::new(compressed)))
}
