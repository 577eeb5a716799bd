//! LZMA codec, grounded in the `x-tor-lzma` content-encoding used elsewhere
//! in the example pack (tor directory client/server, via `lzma-rs`).

use std::io::Cursor;

use crate::errors::{CompressError, Result};

/// Compress `input` as a standalone LZMA stream.
pub fn encode(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    lzma_rs::lzma_compress(&mut Cursor::new(input), &mut output)
        .map_err(|e| CompressError::Lzma(e.to_string()))?;
    Ok(output)
}

/// Decompress an LZMA stream produced by [`encode`].
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    lzma_rs::lzma_decompress(&mut Cursor::new(input), &mut output)
        .map_err(|e| CompressError::Lzma(e.to_string()))?;
    Ok(output)
}
