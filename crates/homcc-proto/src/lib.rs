//! HOMCC wire protocol: frame header, frame codec, and message bodies.
//!
//! This crate has no I/O of its own. It defines the 16-byte [`FrameHeader`],
//! the [`Frame`] that pairs a header with payload bytes, the [`Message`]
//! enum of the six message kinds the protocol carries, and the
//! [`ProtocolError`] taxonomy for malformed input. `homcc-client` and
//! `homcc-server` build the actual TCP read/write loop around these types;
//! `homcc-compress` implements the codecs named by a frame's
//! `compression_kind` byte.

pub mod compression;
pub mod digest;
pub mod errors;
mod frame;
mod header;
pub mod opcode;
pub mod payloads;

pub use compression::CompressionKind;
pub use digest::{Digest, DigestParseError};
pub use errors::{ProtocolError, Result};
pub use frame::{Frame, DEFAULT_MAX_PAYLOAD_BYTES};
pub use header::FrameHeader;
pub use opcode::MessageType;
pub use payloads::{
    ArgumentRequest, CompilationResult, ConnectionRefused, DependencyRequest, FileTransfer, Message,
    ObjectFile,
};
