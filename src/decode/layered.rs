//! Layered decode search.
//!
//! Given raw bytes, determine whether they encode a recognizable binary
//! artifact. The search space is bounded: base64, gzip, and a single-byte
//! XOR sweep over the full key range. The sweep dominates per-candidate
//! cost (256 × decode+inflate+identify), which is why the pipeline
//! parallelizes across candidates rather than across keys.

use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::core::attempt::DecodeAttempt;
use crate::decode::identify::{InferSniffer, TypePolicy, TypeSniffer};
use crate::decode::transforms::{decode_base64, decompress_gzip, xor_with_key};

/// Result of one pass through the decode→decompress→identify stages.
struct StagedHit {
    encoding_chain: Vec<String>,
    compression_chain: Vec<String>,
    detected_type: String,
    payload: Vec<u8>,
}

impl StagedHit {
    fn into_attempt(self, xor_key: Option<u8>) -> DecodeAttempt {
        let mut encoding_chain = self.encoding_chain;
        if let Some(key) = xor_key {
            encoding_chain.insert(0, format!("xor(0x{:02x})", key));
        }
        DecodeAttempt {
            encoding_chain,
            compression_chain: self.compression_chain,
            xor_key,
            detected_type: self.detected_type,
            payload: self.payload,
        }
    }
}

pub struct LayeredDecoder {
    sniffer: Box<dyn TypeSniffer>,
    policy: TypePolicy,
    min_payload_len: usize,
    max_inflated_bytes: u64,
}

impl LayeredDecoder {
    /// Discovery-engine decoder: infer-backed sniffer, exact allow-list.
    pub fn new(cfg: &DecoderConfig) -> Self {
        Self::with_sniffer(
            Box::new(InferSniffer),
            TypePolicy::exact(cfg.allow_types.clone()),
            cfg,
        )
    }

    /// Decoder with a caller-chosen sniffer and match policy. The archive
    /// extraction phase uses this with its prefix policy.
    pub fn with_sniffer(
        sniffer: Box<dyn TypeSniffer>,
        policy: TypePolicy,
        cfg: &DecoderConfig,
    ) -> Self {
        Self {
            sniffer,
            policy,
            min_payload_len: cfg.min_payload_len,
            max_inflated_bytes: cfg.max_inflated_bytes,
        }
    }

    fn identify_allowed(&self, data: &[u8]) -> Option<String> {
        self.sniffer.identify(data).filter(|t| self.policy.permits(t))
    }

    /// One pass of the ordered stages: base64 decode, gzip inflate, then
    /// identification of the most-processed bytes available (inflated,
    /// else decoded, else the input itself). Transform misses fall back to
    /// the previous stage's bytes.
    fn run_stages(&self, input: &[u8]) -> Option<StagedHit> {
        let decoded = decode_base64(input).into_applied();
        let working = decoded.as_deref().unwrap_or(input);
        let inflated = decompress_gzip(working, self.max_inflated_bytes).into_applied();

        let finished: &[u8] = inflated
            .as_deref()
            .or(decoded.as_deref())
            .unwrap_or(input);
        let detected_type = self.identify_allowed(finished)?;

        let mut encoding_chain = Vec::new();
        if decoded.is_some() {
            encoding_chain.push("base64".to_string());
        }
        let mut compression_chain = Vec::new();
        if inflated.is_some() {
            compression_chain.push("gzip".to_string());
        }
        Some(StagedHit {
            encoding_chain,
            compression_chain,
            detected_type,
            payload: finished.to_vec(),
        })
    }

    /// Search for recoverable payloads in `body`.
    ///
    /// Returns one attempt per successful unmasking: at most one for the
    /// direct and decode/decompress paths, plus one per XOR key that
    /// independently yields an allow-listed type. An empty result is the
    /// expected common case, not an error.
    pub fn analyze(&self, body: &[u8]) -> Vec<DecodeAttempt> {
        // Direct identification short-circuits the whole search.
        if let Some(detected_type) = self.identify_allowed(body) {
            debug!(mime = %detected_type, "direct match, skipping search");
            return vec![DecodeAttempt {
                encoding_chain: Vec::new(),
                compression_chain: Vec::new(),
                xor_key: None,
                detected_type,
                payload: body.to_vec(),
            }];
        }

        if let Some(hit) = self.run_stages(body) {
            debug!(mime = %hit.detected_type, "match after decode stages");
            return vec![hit.into_attempt(None)];
        }

        // Exhaustive single-byte XOR sweep over the original bytes. Key 0
        // is included for uniformity; it repeats the staged pass above,
        // which already returned None, so it cannot duplicate a hit.
        let mut attempts = Vec::new();
        for key in 0u8..255 {
            let xored = xor_with_key(body, key);
            if let Some(hit) = self.run_stages(&xored) {
                if self.min_payload_len > 0 && hit.payload.len() < self.min_payload_len {
                    trace!(key, len = hit.payload.len(), "suppressing short XOR match");
                    continue;
                }
                debug!(key, mime = %hit.detected_type, "XOR sweep match");
                attempts.push(hit.into_attempt(Some(key)));
            }
        }
        attempts
    }
}
