//! Decode attempts and per-paste analysis results.

use serde::{Deserialize, Serialize};

/// One successful unmasking of a payload from a paste body.
///
/// Chains record the transforms that fired, outermost first. A direct
/// identification has empty chains; an XOR-sweep hit carries its key both
/// structurally and as an `xor(0xNN)` label in the encoding chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeAttempt {
    pub encoding_chain: Vec<String>,
    pub compression_chain: Vec<String>,
    pub xor_key: Option<u8>,
    pub detected_type: String,
    #[serde(skip)]
    pub payload: Vec<u8>,
}

impl DecodeAttempt {
    /// Human-readable transform summary for reports, e.g.
    /// `xor(0x2a) | base64 + gzip`.
    pub fn chain_summary(&self) -> String {
        let enc = if self.encoding_chain.is_empty() {
            "-".to_string()
        } else {
            self.encoding_chain.join(" | ")
        };
        let comp = if self.compression_chain.is_empty() {
            "-".to_string()
        } else {
            self.compression_chain.join(" | ")
        };
        format!("{} + {}", enc, comp)
    }
}

/// Reputation service verdict for one content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reputation {
    /// Detection ratio, e.g. `"17/70"`, or `"n/a"` when unknown.
    pub detection: String,
    /// Link to the service's report for this digest.
    pub permalink: String,
}

impl Reputation {
    /// The neutral pair returned for misses, transport failures, and
    /// disabled lookups. Never blocks archiving.
    pub fn not_found() -> Self {
        Self {
            detection: "n/a".to_string(),
            permalink: "File not found in reputation service".to_string(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.detection != "n/a"
    }
}

/// One recovered payload with its identity and reputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub attempt: DecodeAttempt,
    /// Hex SHA-256 of the payload bytes.
    pub digest: String,
    pub reputation: Reputation,
}

/// Aggregated analysis output for one candidate paste.
///
/// Owned by the orchestrator once collected; only produced when at least
/// one attempt succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub key: String,
    pub entropy: f64,
    pub findings: Vec<Finding>,
}
