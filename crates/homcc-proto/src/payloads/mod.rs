//! Message bodies: one Rust type per wire message kind.
//!
//! Structured bodies (`ArgumentRequest`, `DependencyRequest`,
//! `CompilationResult`, `ConnectionRefused`) are JSON so the format stays
//! language-neutral. `FileTransfer` has its own compact binary body to avoid
//! double-encoding large file content. `FilesSent` carries no body at all;
//! its presence on the wire is the entire message.

mod argument_request;
mod compilation_result;
mod connection_refused;
mod dependency_request;
mod file_transfer;

use bytes::{Bytes, BytesMut};

pub use self::{
    argument_request::ArgumentRequest,
    compilation_result::{CompilationResult, ObjectFile},
    connection_refused::ConnectionRefused,
    dependency_request::DependencyRequest,
    file_transfer::FileTransfer,
};
use crate::{
    errors::{ProtocolError, Result},
    frame::Frame,
    opcode::MessageType,
};

/// A decoded message body, tagged by the wire message it came from.
///
/// Mirrors [`MessageType`] exactly: every variant maps to exactly one
/// message type, enforced by the exhaustive matches in [`Message::encode`],
/// [`Message::decode`], and [`Message::message_type`].
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// See [`ArgumentRequest`].
    ArgumentRequest(ArgumentRequest),
    /// See [`DependencyRequest`].
    DependencyRequest(DependencyRequest),
    /// See [`FileTransfer`].
    FileTransfer(FileTransfer),
    /// Marks the end of a `FileTransfer` sequence. Carries no data.
    FilesSent,
    /// See [`CompilationResult`].
    CompilationResult(CompilationResult),
    /// See [`ConnectionRefused`].
    ConnectionRefused(ConnectionRefused),
}

impl Message {
    /// The message type this variant maps to.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::ArgumentRequest(_) => MessageType::ArgumentRequest,
            Self::DependencyRequest(_) => MessageType::DependencyRequest,
            Self::FileTransfer(_) => MessageType::FileTransfer,
            Self::FilesSent => MessageType::FilesSent,
            Self::CompilationResult(_) => MessageType::CompilationResult,
            Self::ConnectionRefused(_) => MessageType::ConnectionRefused,
        }
    }

    /// Serialize the body to bytes. Does not apply compression; callers pass
    /// these bytes through `homcc-compress` before framing if the host
    /// config requests it.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] if a JSON body fails to serialize (only
    /// possible for pathological inputs such as non-finite floats, which this
    /// protocol never produces).
    pub fn encode_body(&self) -> Result<Bytes> {
        match self {
            Self::ArgumentRequest(inner) => to_json_bytes(inner),
            Self::DependencyRequest(inner) => to_json_bytes(inner),
            Self::FileTransfer(inner) => {
                let mut buf = BytesMut::new();
                inner.encode(&mut buf);
                Ok(buf.freeze())
            },
            Self::FilesSent => Ok(Bytes::new()),
            Self::CompilationResult(inner) => to_json_bytes(inner),
            Self::ConnectionRefused(inner) => to_json_bytes(inner),
        }
    }

    /// Parse a body given the message type that named it (from a frame
    /// header already validated by [`Frame::decode`]).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] or [`ProtocolError::MalformedFileTransfer`]
    /// if `bytes` doesn't match the shape its message type requires.
    pub fn decode_body(message_type: MessageType, bytes: &[u8]) -> Result<Self> {
        Ok(match message_type {
            MessageType::ArgumentRequest => Self::ArgumentRequest(from_json_bytes(bytes)?),
            MessageType::DependencyRequest => Self::DependencyRequest(from_json_bytes(bytes)?),
            MessageType::FileTransfer => Self::FileTransfer(FileTransfer::decode(bytes)?),
            MessageType::FilesSent => Self::FilesSent,
            MessageType::CompilationResult => Self::CompilationResult(from_json_bytes(bytes)?),
            MessageType::ConnectionRefused => Self::ConnectionRefused(from_json_bytes(bytes)?),
        })
    }

    /// Build an uncompressed [`Frame`] from this message.
    ///
    /// Compression is applied by the caller (which owns the host's
    /// negotiated `compression_kind`) before or after this step; this
    /// function always writes `compression_kind = 0` and leaves it to the
    /// caller to rewrite the header if it compresses the body.
    pub fn into_frame(self) -> Result<Frame> {
        let body = self.encode_body()?;
        Ok(Frame::new(self.message_type(), 0, body))
    }

    /// Parse a message from a decoded frame whose payload is already
    /// decompressed.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownMessageType`] if the header's `message_type`
    /// byte is unrecognized; otherwise as [`Message::decode_body`].
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let message_type = MessageType::from_u8(frame.header.message_type())
            .ok_or(ProtocolError::UnknownMessageType(frame.header.message_type()))?;
        Self::decode_body(message_type, &frame.payload)
    }
}

fn to_json_bytes<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value).map(Bytes::from).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

fn from_json_bytes<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bytes::Bytes as RawBytes;

    use super::*;
    use crate::digest::Digest;

    #[test]
    fn argument_request_round_trips_through_frame() {
        let message = Message::ArgumentRequest(ArgumentRequest {
            args: vec!["-c".to_string(), "main.c".to_string()],
            cwd: "/work".to_string(),
            target_profile: None,
            docker_container: None,
            dependency_hashes: BTreeMap::from([("main.c".to_string(), Digest::of(b"int main(){}"))]),
        });

        let frame = message.clone().into_frame().expect("should build frame");
        let decoded = Message::from_frame(&frame).expect("should parse");
        assert_eq!(message, decoded);
    }

    #[test]
    fn files_sent_has_empty_body() {
        let frame = Message::FilesSent.into_frame().expect("should build frame");
        assert_eq!(frame.payload.len(), 0);
        assert_eq!(Message::from_frame(&frame).expect("should parse"), Message::FilesSent);
    }

    #[test]
    fn file_transfer_round_trips_through_frame() {
        let message = Message::FileTransfer(FileTransfer {
            path: "/usr/include/stdio.h".to_string(),
            digest: Digest::of(b"stdio"),
            content: RawBytes::from_static(b"stdio"),
        });
        let frame = message.clone().into_frame().expect("should build frame");
        let decoded = Message::from_frame(&frame).expect("should parse");
        assert_eq!(message, decoded);
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let mut frame = Message::FilesSent.into_frame().expect("should build frame");
        frame.header = crate::header::FrameHeader::new(200, 0);
        let err = Message::from_frame(&frame).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageType(200)));
    }
}
