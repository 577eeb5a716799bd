//! Stream compression codecs for HOMCC frame payloads.
//!
//! Two pluggable codecs, `lzo` and `lzma`, each a stream encode/decode pair
//! over a byte buffer. The codec for an outbound message comes from the
//! sending host's configured `compression`; the codec for an inbound
//! message comes from the frame header's `compression_kind` byte
//! (`homcc_proto::CompressionKind`). This crate owns the dispatch between
//! the two; it never decides which codec to use.

pub mod errors;
mod lzma;
mod lzo;

pub use errors::{CompressError, Result};
use homcc_proto::CompressionKind;

/// Compress `payload` per `kind`. A no-op for [`CompressionKind::None`].
pub fn encode(kind: CompressionKind, payload: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(payload.to_vec()),
        CompressionKind::Lzo => lzo::encode(payload),
        CompressionKind::Lzma => lzma::encode(payload),
    }
}

/// Decompress `payload` per `kind`. A no-op for [`CompressionKind::None`].
pub fn decode(kind: CompressionKind, payload: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(payload.to_vec()),
        CompressionKind::Lzo => lzo::decode(payload),
        CompressionKind::Lzma => lzma::decode(payload),
    }
}
