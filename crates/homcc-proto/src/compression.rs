//! The `compression_kind` byte carried in every frame header.
//!
//! Compression is negotiated per-message, not per-connection: each frame
//! carries its own codec tag so a single connection can freely mix
//! compressed and uncompressed frames. `homcc-compress` implements the
//! actual codecs; this crate only owns the wire tag.

/// Which codec, if any, compresses a frame's payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CompressionKind {
    /// Payload bytes are sent as-is.
    #[default]
    None = 0,
    /// Payload is LZO-compressed.
    Lzo = 1,
    /// Payload is LZMA-compressed.
    Lzma = 2,
}

impl CompressionKind {
    /// Encode as the wire byte value.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte value. `None` if unrecognized.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Lzo),
            2 => Some(Self::Lzma),
            _ => None,
        }
    }
}

impl std::str::FromStr for CompressionKind {
    type Err = String;

    /// Parses the config-file/CLI spelling (`none`, `lzo`, `lzma`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lzo" => Ok(Self::Lzo),
            "lzma" => Ok(Self::Lzma),
            other => Err(format!("unknown compression kind: {other}")),
        }
    }
}

impl std::fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Lzo => "lzo",
            Self::Lzma => "lzma",
        };
        write!(f, "{name}")
    }
}
