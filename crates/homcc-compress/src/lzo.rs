//! LZO codec.
//!
//! `minilzo`'s decompressor needs the uncompressed length up front, so we
//! prefix every compressed buffer with an 8-byte big-endian length of the
//! original bytes.

use crate::errors::{CompressError, Result};

const LEN_PREFIX: usize = 8;

/// Compress `input`, prefixed with its uncompressed length.
pub fn encode(input: &[u8]) -> Result<Vec<u8>> {
    let compressed = minilzo::compress(input).map_err(|e| CompressError::Lzo(format!("{e:?}")))?;

    let mut out = Vec::with_capacity(LEN_PREFIX + compressed.len());
    out.extend_from_slice(&(input.len() as u64).to_be_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decompress a buffer produced by [`encode`].
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    if input.len() < LEN_PREFIX {
        return Err(CompressError::LzoTruncated(input.len()));
    }

    let mut len_bytes = [0u8; LEN_PREFIX];
    len_bytes.copy_from_slice(&input[..LEN_PREFIX]);
    let uncompressed_len = u64::from_be_bytes(len_bytes) as usize;
    let compressed = &input[LEN_PREFIX..];

    minilzo::decompress(compressed, uncompressed_len).map_err(|e| CompressError::Lzo(format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn round_trips_arbitrary_bytes(input in proptest::collection::vec(any::<u8>(), 0..8192)) {
            let compressed = encode(&input).expect("should compress");
            let decompressed = decode(&compressed).expect("should decompress");
            prop_assert_eq!(decompressed, input);
        }
    }

    #[test]
    fn empty_input_round_trips() {
        let compressed = encode(&[]).expect("should compress");
        let decompressed = decode(&compressed).expect("should decompress");
        assert!(decompressed.is_empty());
    }

    #[test]
    fn rejects_truncated_prefix() {
        let err = decode(&[0u8; 4]).unwrap_err();
        assert!(matches!(err, CompressError::LzoTruncated(4)));
    }
}
