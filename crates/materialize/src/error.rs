use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::encoding::TextEncoding;

/// Result type for materialization operations.
pub type MaterializeResult<T> = Result<T, MaterializeError>;

/// Errors produced while building upload streams or writing local files.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The source file to read does not exist.
    #[error("source file {} does not exist", path.display())]
    SourceNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The destination file already exists and the collision policy forbids
    /// touching it.
    #[error("destination file '{}' already exists", path.display())]
    DestinationExists {
        /// Path of the existing file.
        path: PathBuf,
    },

    /// An I/O failure while reading, probing or writing a file.
    #[error("i/o failure during {operation} on {}: {source}", path.display())]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An option was out of range (unknown encoding, malformed file name).
    #[error("invalid option {field}: {reason}")]
    InvalidOption {
        /// Option that failed validation.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Text contains a character the target encoding cannot express.
    #[error("character {character:?} cannot be represented in {encoding}")]
    Unrepresentable {
        /// Target encoding.
        encoding: TextEncoding,
        /// First offending character.
        character: char,
    },

    /// Bytes are not valid in the encoding used to decode them.
    #[error("content is not valid {encoding}")]
    Undecodable {
        /// Encoding used for decoding.
        encoding: TextEncoding,
    },

    /// A gzip body could not be decompressed.
    #[error("failed to decompress gzip content: {source}")]
    Decompress {
        /// Underlying decoder error.
        #[source]
        source: io::Error,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl MaterializeError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_option(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn io_helper_keeps_source() {
        let err = MaterializeError::io("read source", "/tmp/a.txt", io::Error::other("boom"));
        assert!(matches!(err, MaterializeError::Io { operation: "read source", .. }));
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "i/o failure during read source on /tmp/a.txt: boom"
        );
    }

    #[test]
    fn error_display() {
        let err = MaterializeError::DestinationExists {
            path: PathBuf::from("out/report.txt"),
        };
        assert_eq!(
            err.to_string(),
            "destination file 'out/report.txt' already exists"
        );

        let err = MaterializeError::invalid_option("encoding", "unsupported encoding 'ebcdic'");
        assert_eq!(
            err.to_string(),
            "invalid option encoding: unsupported encoding 'ebcdic'"
        );

        let err = MaterializeError::Unrepresentable {
            encoding: TextEncoding::Ascii,
            character: 'é',
        };
        assert_eq!(
            err.to_string(),
            "character 'é' cannot be represented in us-ascii"
        );
    }
}
