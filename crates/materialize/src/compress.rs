//! Whole-buffer gzip helpers.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// Gzip `payload` into a new buffer.
pub fn gzip(payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::default());
    encoder.write_all(payload)?;
    encoder.finish()
}

/// Inflate a complete gzip member.
pub fn gunzip(compressed: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut out = Vec::with_capacity(compressed.len().saturating_mul(2));
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
