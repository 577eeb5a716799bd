//! Frame type combining header and payload bytes.

use bytes::{BufMut, Bytes};

use crate::{
    errors::{ProtocolError, Result},
    header::FrameHeader,
    opcode::MessageType,
};

/// Default cap on a single frame's payload length (2 GiB), per the wire
/// protocol's decoder requirement.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// A complete wire frame: header plus raw (possibly compressed) payload
/// bytes.
///
/// This is a pure data holder; it does not know how to decode the payload
/// into a [`crate::Message`] or decompress it. See [`crate::Message::encode`]
/// and [`crate::Message::decode`] for that layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header.
    pub header: FrameHeader,
    /// Raw payload bytes, compressed per `header.compression_kind()`.
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame, filling in the header's `payload_length` from
    /// `payload`.
    #[must_use]
    pub fn new(message_type: MessageType, compression_kind: u8, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let mut header = FrameHeader::new(message_type.to_u8(), compression_kind);
        header.set_payload_length(payload.len() as u64);
        Self { header, payload }
    }

    /// Encode this frame (header then payload) into `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);
    }

    /// Decode a frame from a complete in-memory buffer, enforcing
    /// `max_payload_bytes` as the decoder's configured cap.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::PayloadTooLarge`] if the header declares a payload
    ///   larger than `max_payload_bytes`.
    /// - [`ProtocolError::FrameTruncated`] if `bytes` holds fewer payload
    ///   bytes than declared.
    pub fn decode(bytes: &[u8], max_payload_bytes: u64) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let payload_length = header.payload_length();

        if payload_length > max_payload_bytes {
            return Err(ProtocolError::PayloadTooLarge { size: payload_length, max: max_payload_bytes });
        }

        let available = bytes.len().saturating_sub(FrameHeader::SIZE) as u64;
        if available < payload_length {
            return Err(ProtocolError::FrameTruncated { expected: payload_length, actual: available });
        }

        let start = FrameHeader::SIZE;
        let end = start + payload_length as usize;
        let payload = Bytes::copy_from_slice(&bytes[start..end]);

        Ok(Self { header: *header, payload })
    }
}
