//! Reversible transforms tried by the layered decoder.
//!
//! Each transform reports an explicit outcome so callers (and tests) can
//! distinguish "did not apply to this input" from "applied but the input
//! was corrupt". Neither outcome aborts an analysis; the pipeline falls
//! back to the untransformed bytes.

use std::io::Read;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use flate2::read::GzDecoder;

/// Outcome of one transform stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// The transform applied; output bytes follow.
    Applied(Vec<u8>),
    /// The input is not in this transform's domain.
    NotApplicable,
    /// The input claimed this encoding but failed to convert.
    Malformed,
}

impl TransformOutcome {
    pub fn into_applied(self) -> Option<Vec<u8>> {
        match self {
            TransformOutcome::Applied(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TransformOutcome::Applied(_))
    }
}

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')
}

/// Standard-alphabet base64 decoding, tolerant of ASCII whitespace.
///
/// Paste bodies wrap encoded blobs across lines; whitespace is stripped
/// before the alphabet check so a wrapped blob still decodes.
pub fn decode_base64(input: &[u8]) -> TransformOutcome {
    let stripped: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if stripped.is_empty() || !stripped.iter().copied().all(is_base64_byte) {
        return TransformOutcome::NotApplicable;
    }
    match BASE64_STANDARD.decode(&stripped) {
        Ok(bytes) => TransformOutcome::Applied(bytes),
        Err(_) => TransformOutcome::Malformed,
    }
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Gzip inflation with an output cap.
///
/// Inputs without the gzip magic are not applicable; inputs that carry the
/// magic but fail to inflate, or inflate past `max_out` bytes, are
/// malformed.
pub fn decompress_gzip(input: &[u8], max_out: u64) -> TransformOutcome {
    if input.len() < 2 || input[..2] != GZIP_MAGIC {
        return TransformOutcome::NotApplicable;
    }
    let mut out = Vec::new();
    let mut decoder = GzDecoder::new(input).take(max_out.saturating_add(1));
    match decoder.read_to_end(&mut out) {
        Ok(_) if out.len() as u64 > max_out => TransformOutcome::Malformed,
        Ok(_) => TransformOutcome::Applied(out),
        Err(_) => TransformOutcome::Malformed,
    }
}

/// Single-byte XOR. Involutive: applying the same key twice is identity.
pub fn xor_with_key(input: &[u8], key: u8) -> Vec<u8> {
    input.iter().map(|b| b ^ key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn base64_applies_to_clean_input() {
        let outcome = decode_base64(b"aGVsbG8gd29ybGQ=");
        assert_eq!(outcome, TransformOutcome::Applied(b"hello world".to_vec()));
    }

    #[test]
    fn base64_tolerates_wrapped_lines() {
        let outcome = decode_base64(b"aGVsbG8g\nd29ybGQ=\n");
        assert_eq!(outcome, TransformOutcome::Applied(b"hello world".to_vec()));
    }

    #[test]
    fn base64_not_applicable_to_binary() {
        assert_eq!(
            decode_base64(&[0x7f, b'E', b'L', b'F']),
            TransformOutcome::NotApplicable
        );
        assert_eq!(decode_base64(b""), TransformOutcome::NotApplicable);
    }

    #[test]
    fn base64_malformed_on_bad_padding() {
        // Alphabet-clean but not a valid encoding.
        assert_eq!(decode_base64(b"aGVsbG8"), TransformOutcome::Malformed);
    }

    #[test]
    fn gzip_round_trip() {
        let original = b"payload payload payload".to_vec();
        let outcome = decompress_gzip(&gzip(&original), 1 << 20);
        assert_eq!(outcome, TransformOutcome::Applied(original));
    }

    #[test]
    fn gzip_not_applicable_without_magic() {
        assert_eq!(
            decompress_gzip(b"plain text", 1 << 20),
            TransformOutcome::NotApplicable
        );
    }

    #[test]
    fn gzip_malformed_on_truncated_stream() {
        let mut compressed = gzip(b"payload payload payload");
        compressed.truncate(compressed.len() / 2);
        assert_eq!(
            decompress_gzip(&compressed, 1 << 20),
            TransformOutcome::Malformed
        );
    }

    #[test]
    fn gzip_cap_rejects_bombs() {
        let compressed = gzip(&vec![0u8; 4096]);
        assert_eq!(decompress_gzip(&compressed, 128), TransformOutcome::Malformed);
    }

    #[test]
    fn xor_round_trip_all_keys() {
        let payload = b"\x00\x01\x7f\x80\xfftest".to_vec();
        for key in 0..=255u8 {
            assert_eq!(xor_with_key(&xor_with_key(&payload, key), key), payload);
        }
    }

    #[test]
    fn xor_key_zero_is_identity() {
        let payload = b"unchanged".to_vec();
        assert_eq!(xor_with_key(&payload, 0), payload);
    }
}
