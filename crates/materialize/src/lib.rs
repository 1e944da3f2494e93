//! File materialization for the Cirrus storage tasks.
//!
//! Turns local files into upload-ready byte streams and writes downloaded
//! text back to disk:
//!
//! - [`build_upload_stream`] reads a [`SourceFile`] into a fully buffered
//!   [`UploadStream`], optionally re-encoding text and gzip-compressing it.
//! - [`resolve_destination_name`] applies a [`CollisionPolicy`] to a
//!   destination file name, generating `name(1).ext`, `name(2).ext`, ... on
//!   rename.
//! - [`write_text_to_file`] resolves the name and writes text in a chosen
//!   [`TextEncoding`].
//!
//! Every call is independent; nothing here keeps state between calls.

pub mod compress;
pub mod encoding;
pub mod error;
pub mod names;
pub mod source;
pub mod stream;
pub mod write;

pub use encoding::TextEncoding;
pub use error::{MaterializeError, MaterializeResult};
pub use names::{CollisionPolicy, next_free_name, resolve_destination_name};
pub use source::SourceFile;
pub use stream::{StreamOptions, UploadStream, build_upload_stream};
pub use write::{WrittenFile, decode_content, read_text_from_file, write_text_to_file};

use tokio_util::sync::CancellationToken;

/// Fail with [`MaterializeError::Cancelled`] if the optional token has fired.
pub fn ensure_not_cancelled(cancel: Option<&CancellationToken>) -> MaterializeResult<()> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        return Err(MaterializeError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_never_cancels() {
        assert!(ensure_not_cancelled(None).is_ok());
    }

    #[test]
    fn fired_token_cancels() {
        let token = CancellationToken::new();
        assert!(ensure_not_cancelled(Some(&token)).is_ok());
        token.cancel();
        assert!(matches!(
            ensure_not_cancelled(Some(&token)),
            Err(MaterializeError::Cancelled)
        ));
    }
}
