//! `FileTransfer` — one uploaded dependency.
//!
//! Unlike the other message bodies this one is not JSON: the content bytes
//! of a header file can be large, and double-encoding them through a text
//! format would waste bandwidth on exactly the low-bandwidth links HOMCC
//! targets. Instead the body has its own small fixed sub-header followed by
//! three raw byte strings.

use bytes::{Buf, BufMut, Bytes};

use crate::{
    digest::Digest,
    errors::{ProtocolError, Result},
};

/// Fixed sub-header preceding the three variable-length fields:
/// `path_len(u32) + digest_len(u32) + content_len(u64)`.
const SUB_HEADER_LEN: usize = 4 + 4 + 8;

/// One dependency file's content, addressed by path and digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransfer {
    /// Original path as the client's scanner recorded it.
    pub path: String,
    /// Digest of `content`; the server must verify this before trusting it.
    pub digest: Digest,
    /// Exact file bytes.
    pub content: Bytes,
}

impl FileTransfer {
    /// Encode as `path_len + digest_len + content_len` followed by the three
    /// byte strings.
    pub fn encode(&self, dst: &mut impl BufMut) {
        let path_bytes = self.path.as_bytes();
        let digest_hex = self.digest.to_hex();
        let digest_bytes = digest_hex.as_bytes();

        dst.put_u32(path_bytes.len() as u32);
        dst.put_u32(digest_bytes.len() as u32);
        dst.put_u64(self.content.len() as u64);
        dst.put_slice(path_bytes);
        dst.put_slice(digest_bytes);
        dst.put_slice(&self.content);
    }

    /// Decode from a complete in-memory payload.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MalformedFileTransfer`] if the sub-header's declared
    /// lengths don't match the bytes actually present, or the digest field
    /// is not valid hex.
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SUB_HEADER_LEN {
            return Err(ProtocolError::MalformedFileTransfer(format!(
                "payload shorter than sub-header: {} bytes",
                bytes.len()
            )));
        }

        let path_len = bytes.get_u32() as usize;
        let digest_len = bytes.get_u32() as usize;
        let content_len = bytes.get_u64() as usize;

        let expected = path_len
            .checked_add(digest_len)
            .and_then(|sum| sum.checked_add(content_len))
            .ok_or_else(|| ProtocolError::MalformedFileTransfer("length overflow".to_string()))?;

        if bytes.remaining() != expected {
            return Err(ProtocolError::MalformedFileTransfer(format!(
                "declared {expected} bytes of fields, found {}",
                bytes.remaining()
            )));
        }

        let path_bytes = bytes.copy_to_bytes(path_len);
        let digest_bytes = bytes.copy_to_bytes(digest_len);
        let content = bytes.copy_to_bytes(content_len);

        let path = String::from_utf8(path_bytes.to_vec())
            .map_err(|e| ProtocolError::MalformedFileTransfer(format!("path is not utf-8: {e}")))?;
        let digest_str = std::str::from_utf8(&digest_bytes)
            .map_err(|e| ProtocolError::MalformedFileTransfer(format!("digest is not utf-8: {e}")))?;
        let digest = digest_str
            .parse::<Digest>()
            .map_err(|e| ProtocolError::MalformedFileTransfer(format!("invalid digest: {e}")))?;

        Ok(Self { path, digest, content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let transfer = FileTransfer {
            path: "/usr/include/stdio.h".to_string(),
            digest: Digest::of(b"stdio contents"),
            content: Bytes::from_static(b"stdio contents"),
        };

        let mut buf = Vec::new();
        transfer.encode(&mut buf);
        let decoded = FileTransfer::decode(&buf).expect("should decode");
        assert_eq!(transfer, decoded);
    }

    #[test]
    fn round_trips_empty_content() {
        let transfer =
            FileTransfer { path: "empty.h".to_string(), digest: Digest::of(b""), content: Bytes::new() };
        let mut buf = Vec::new();
        transfer.encode(&mut buf);
        let decoded = FileTransfer::decode(&buf).expect("should decode");
        assert_eq!(transfer, decoded);
    }

    #[test]
    fn rejects_inconsistent_lengths() {
        let transfer = FileTransfer {
            path: "a.h".to_string(),
            digest: Digest::of(b"a"),
            content: Bytes::from_static(b"a"),
        };
        let mut buf = Vec::new();
        transfer.encode(&mut buf);
        buf.pop();
        let err = FileTransfer::decode(&buf).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFileTransfer(_)));
    }
}
