//! Compression codec errors.

use thiserror::Error;

/// Failure compressing or decompressing a frame payload.
#[derive(Error, Debug)]
pub enum CompressError {
    /// The LZO codec failed.
    #[error("lzo error: {0}")]
    Lzo(String),
    /// The LZMA codec failed.
    #[error("lzma error: {0}")]
    Lzma(String),
    /// An LZO-compressed buffer was missing or had a truncated length prefix.
    #[error("lzo buffer truncated: needs at least 8 bytes, got {0}")]
    LzoTruncated(usize),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CompressError>;
