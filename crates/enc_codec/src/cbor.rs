//! CBOR helpers for snapshot payloads.
//!
//! Struct fields are emitted in declaration order and collections keep their
//! iteration order, so encoding the same snapshot twice yields the same bytes
//! as long as callers avoid hash-ordered maps.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a value to CBOR bytes.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn to_canonical_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CodecError::Cbor(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR for `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::Cbor(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        blob: Vec<u8>,
        tags: Vec<String>,
    }

    fn sample() -> Sample {
        Sample {
            name: "vault".to_string(),
            blob: vec![0, 1, 2, 255],
            tags: vec!["a".into(), "b".into()],
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = to_canonical_cbor(&sample()).unwrap();
        let b = to_canonical_cbor(&sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn decode_recovers_value() {
        let bytes = to_canonical_cbor(&sample()).unwrap();
        let decoded: Sample = from_cbor(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn decode_garbage_fails() {
        let result: CodecResult<Sample> = from_cbor(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(CodecError::Cbor(_))));
    }

    #[test]
    fn decode_wrong_shape_fails() {
        let bytes = to_canonical_cbor(&42u32).unwrap();
        let result: CodecResult<Sample> = from_cbor(&bytes);
        assert!(result.is_err());
    }
}
