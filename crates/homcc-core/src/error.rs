//! The error taxonomy the error handling design names.
//!
//! One enum realizes every kind in the design: protocol-layer kinds convert
//! in from `homcc_proto::ProtocolError` at the session/job boundary, and the
//! rest are produced directly by `homcc-core`, `homcc-sandbox`,
//! `homcc-client`, and `homcc-server`.

use std::io;

use homcc_compress::CompressError;
use homcc_proto::ProtocolError;
use thiserror::Error;

/// Every error kind a HOMCC client or server session can produce.
#[derive(Error, Debug)]
pub enum HomccError {
    /// Decoder received more payload than the configured cap allows.
    #[error("protocol overflow: {0}")]
    ProtocolOverflow(String),

    /// Peer speaks a version this build does not.
    #[error("protocol version mismatch: {0}")]
    ProtocolVersion(String),

    /// A frame or message body was structurally invalid.
    #[error("malformed protocol message: {0}")]
    ProtocolMalformed(String),

    /// The connection ended mid-message.
    #[error("peer closed the connection")]
    PeerClosed,

    /// A transferred file's content did not hash to its declared digest.
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// A single blob exceeds the cache's byte budget even when empty.
    #[error("cache entry too large: {size} bytes exceeds budget of {budget} bytes")]
    CacheTooLarge {
        /// Size of the rejected blob.
        size: u64,
        /// Configured cache byte budget.
        budget: u64,
    },

    /// The requested chroot profile or container is not present.
    #[error("sandbox unavailable: {0}")]
    SandboxUnavailable(String),

    /// The compiler argv cannot be safely rewritten for remote execution.
    #[error("unsupported argv: {0}")]
    UnsupportedArgv(String),

    /// A per-message or per-job deadline was exceeded.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The server declined the connection; it is at its concurrency limit.
    #[error("refused: {0}")]
    Refused(String),

    /// A digest string failed to parse.
    #[error("invalid digest: {0}")]
    InvalidDigest(#[from] homcc_proto::DigestParseError),

    /// Config or hosts file content was invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying I/O failure (filesystem, socket).
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl HomccError {
    /// The process exit code a client reports for this error kind, per the
    /// error handling design's "otherwise a defined nonzero code per error
    /// kind" clause.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Refused(_) => 2,
            Self::Timeout(_) => 3,
            Self::IntegrityError(_) => 4,
            Self::SandboxUnavailable(_) => 5,
            Self::UnsupportedArgv(_) | Self::Config(_) | Self::InvalidDigest(_) => 1,
            Self::ProtocolOverflow(_)
            | Self::ProtocolVersion(_)
            | Self::ProtocolMalformed(_)
            | Self::PeerClosed
            | Self::CacheTooLarge { .. }
            | Self::Io(_) => 1,
        }
    }
}

impl From<ProtocolError> for HomccError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::PayloadTooLarge { .. } => Self::ProtocolOverflow(err.to_string()),
            ProtocolError::UnsupportedVersion(_) => Self::ProtocolVersion(err.to_string()),
            ProtocolError::PeerClosed | ProtocolError::FrameTruncated { .. } => Self::PeerClosed,
            ProtocolError::FrameTooShort { .. }
            | ProtocolError::InvalidMagic
            | ProtocolError::UnknownMessageType(_)
            | ProtocolError::UnknownCompressionKind(_)
            | ProtocolError::Malformed(_)
            | ProtocolError::MalformedFileTransfer(_) => Self::ProtocolMalformed(err.to_string()),
        }
    }
}

impl From<CompressError> for HomccError {
    fn from(err: CompressError) -> Self {
        Self::ProtocolMalformed(err.to_string())
    }
}

/// Convenience alias used throughout this crate and its dependents.
pub type Result<T> = std::result::Result<T, HomccError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_maps_to_its_own_exit_code() {
        assert_eq!(HomccError::Refused("limit".to_string()).exit_code(), 2);
    }

    #[test]
    fn protocol_errors_convert_by_kind() {
        let overflow = HomccError::from(ProtocolError::PayloadTooLarge { size: 10, max: 5 });
        assert!(matches!(overflow, HomccError::ProtocolOverflow(_)));

        let closed = HomccError::from(ProtocolError::PeerClosed);
        assert!(matches!(closed, HomccError::PeerClosed));

        let malformed = HomccError::from(ProtocolError::InvalidMagic);
        assert!(matches!(malformed, HomccError::ProtocolMalformed(_)));
    }

    #[test]
    fn compress_errors_are_protocol_malformed() {
        let err = HomccError::from(CompressError::LzoTruncated(3));
        assert!(matches!(err, HomccError::ProtocolMalformed(_)));
    }
}
