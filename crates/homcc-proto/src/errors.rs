//! Wire-level protocol errors.

use thiserror::Error;

/// Errors that can occur while framing or parsing wire messages.
///
/// These are the protocol-layer error kinds named in the error handling
/// design: `ProtocolOverflow`, `ProtocolVersion`, `ProtocolMalformed`, and
/// `PeerClosed`. Higher layers (`homcc-core`) fold these into the broader
/// `HomccError` taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes were available than the fixed header requires.
    #[error("frame header too short: expected {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Bytes required for a complete header.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The leading magic bytes did not match `"HOMC"`.
    #[error("invalid magic bytes")]
    InvalidMagic,

    /// The header's version byte is not one we speak.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The header's `message_type` byte has no known meaning.
    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),

    /// The header's `compression_kind` byte has no known meaning.
    #[error("unknown compression kind: {0}")]
    UnknownCompressionKind(u8),

    /// The header declares a payload larger than the configured cap.
    #[error("payload too large: {size} bytes exceeds cap of {max} bytes")]
    PayloadTooLarge {
        /// Declared payload size.
        size: u64,
        /// Configured cap.
        max: u64,
    },

    /// Fewer payload bytes arrived than the header declared; the peer is
    /// gone or the frame was cut short.
    #[error("frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload bytes the header declared.
        expected: u64,
        /// Payload bytes actually present.
        actual: u64,
    },

    /// The connection closed cleanly with no bytes pending a new frame.
    #[error("peer closed the connection")]
    PeerClosed,

    /// A structured body failed to decode as JSON, or decoded to the wrong
    /// shape for its message type.
    #[error("malformed message body: {0}")]
    Malformed(String),

    /// A `FileTransfer` body's fixed sub-header was inconsistent with the
    /// bytes that followed it.
    #[error("malformed file transfer body: {0}")]
    MalformedFileTransfer(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;
