//! Message type tag carried in the frame header's `message_type` byte.

/// The six message kinds the wire protocol carries.
///
/// Values are stable across versions; new kinds are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Client → server: compiler invocation plus the digests it already has.
    ArgumentRequest = 1,
    /// Server → client: the subset of digests the server still needs.
    DependencyRequest = 2,
    /// Client → server: one file's content, sent once per needed digest.
    FileTransfer = 3,
    /// Client → server: marks the end of a `FileTransfer` sequence.
    FilesSent = 4,
    /// Server → client: compiler outcome and artifacts.
    CompilationResult = 5,
    /// Server → client: the server is saturated; client should fall back.
    ConnectionRefused = 6,
}

impl MessageType {
    /// Encode as the wire byte value.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte value. `None` if unrecognized.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ArgumentRequest),
            2 => Some(Self::DependencyRequest),
            3 => Some(Self::FileTransfer),
            4 => Some(Self::FilesSent),
            5 => Some(Self::CompilationResult),
            6 => Some(Self::ConnectionRefused),
            _ => None,
        }
    }
}
