//! Frame header implementation with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 16-byte structure serialized as raw binary,
//! all integers big-endian. It carries only what a dispatcher needs to
//! decide how to read the rest of the frame: magic, version, message type,
//! compression, and payload length.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Fixed 16-byte frame header (big-endian network byte order).
///
/// Layout: `magic(4) + version(1) + message_type(1) + compression_kind(1) +
/// reserved(1) + payload_length(8)`.
///
/// # Security
///
/// `#[repr(C, packed)]` with zerocopy traits lets this struct be cast
/// directly from untrusted network bytes: every 16-byte pattern is a valid
/// `FrameHeader`, so parsing cannot produce undefined behavior. Semantic
/// validation (magic, version, payload cap) happens in [`FrameHeader::from_bytes`]
/// after the cast.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 4],
    version: u8,
    pub(crate) message_type: u8,
    pub(crate) compression_kind: u8,
    reserved: u8,
    pub(crate) payload_length: [u8; 8],
}

impl FrameHeader {
    /// Size of the serialized header in bytes.
    pub const SIZE: usize = 16;

    /// Magic number: `"HOMC"` in ASCII.
    pub const MAGIC: u32 = 0x484F_4D43;

    /// Current protocol version.
    pub const VERSION: u8 = 1;

    /// Construct a header for the given message type and compression kind.
    /// `payload_length` is filled in by [`crate::Frame::new`].
    #[must_use]
    pub fn new(message_type: u8, compression_kind: u8) -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            message_type,
            compression_kind,
            reserved: 0,
            payload_length: 0u64.to_be_bytes(),
        }
    }

    /// Parse a header from the front of `bytes` (zero-copy, safe).
    ///
    /// Validates magic and version but not `payload_length` against a cap —
    /// that check depends on a caller-configured limit and is done by
    /// [`crate::Frame::decode`].
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooShort`] if fewer than [`Self::SIZE`] bytes
    ///   are available.
    /// - [`ProtocolError::InvalidMagic`] if the magic bytes don't match.
    /// - [`ProtocolError::UnsupportedVersion`] if the version byte is unknown.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        Ok(header)
    }

    /// Serialize to a fixed-size byte array.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Protocol magic number.
    #[must_use]
    pub fn magic(&self) -> u32 {
        u32::from_be_bytes(self.magic)
    }

    /// Protocol version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Raw `message_type` byte.
    #[must_use]
    pub fn message_type(&self) -> u8 {
        self.message_type
    }

    /// Raw `compression_kind` byte.
    #[must_use]
    pub fn compression_kind(&self) -> u8 {
        self.compression_kind
    }

    /// Declared payload length in bytes.
    #[must_use]
    pub fn payload_length(&self) -> u64 {
        u64::from_be_bytes(self.payload_length)
    }

    pub(crate) fn set_payload_length(&mut self, len: u64) {
        self.payload_length = len.to_be_bytes();
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("magic", &format!("{:#010x}", self.magic()))
            .field("version", &self.version())
            .field("message_type", &self.message_type())
            .field("compression_kind", &self.compression_kind())
            .field("payload_length", &self.payload_length())
            .finish()
    }
}

impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.magic == other.magic
            && self.version == other.version
            && self.message_type == other.message_type
            && self.compression_kind == other.compression_kind
            && self.payload_length == other.payload_length
    }
}

impl Eq for FrameHeader {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for FrameHeader {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            (any::<u8>(), any::<u8>(), any::<u64>())
                .prop_map(|(message_type, compression_kind, payload_length)| {
                    let mut header = FrameHeader::new(message_type, compression_kind);
                    header.set_payload_length(payload_length);
                    header
                })
                .boxed()
        }
    }

    proptest! {
        #[test]
        fn header_round_trips_through_bytes(header in any::<FrameHeader>()) {
            let bytes = header.to_bytes();
            let parsed = FrameHeader::from_bytes(&bytes).expect("should parse");
            prop_assert_eq!(*parsed, header);
        }
    }

    #[test]
    fn rejects_short_buffer() {
        let err = FrameHeader::from_bytes(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooShort { expected: 16, actual: 4 }));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = [0u8; FrameHeader::SIZE];
        bytes[0..4].copy_from_slice(b"NOPE");
        let err = FrameHeader::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidMagic);
    }

    #[test]
    fn rejects_bad_version() {
        let mut header = FrameHeader::new(1, 0);
        header.version = 99;
        let bytes = header.to_bytes();
        let err = FrameHeader::from_bytes(&bytes).unwrap_err();
        assert_eq!(err, ProtocolError::UnsupportedVersion(99));
    }
}
