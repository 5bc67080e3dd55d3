//! Configuration for the payload discovery pipeline.
//!
//! Provides centralized configuration for all components with sensible
//! defaults, serde (de)serialization for config files, and environment
//! variable overrides for every boundary value so deployments can retarget
//! directories, services, and thresholds without code changes.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiftError};

/// Master configuration for the discovery engine and archive manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Filesystem roots for paste input and recovered output.
    pub paths: PathsConfig,
    /// Entropy candidate filter configuration.
    pub filter: FilterConfig,
    /// Layered decoder configuration.
    pub decoder: DecoderConfig,
    /// Worker pool configuration.
    pub pool: PoolConfig,
    /// External reputation service configuration.
    pub reputation: ReputationConfig,
    /// Archive manager and external archiver configuration.
    pub archive: ArchiveConfig,
}

impl SiftConfig {
    /// Load configuration from a JSON file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut cfg: SiftConfig = serde_json::from_str(&raw)?;
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Build a configuration from defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = SiftConfig::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Apply `PASTESIFT_*` environment variables over the current values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = env::var("PASTESIFT_PASTE_ROOT") {
            self.paths.paste_root = PathBuf::from(v);
        }
        if let Ok(v) = env::var("PASTESIFT_ARTIFACT_DIR") {
            self.paths.artifact_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("PASTESIFT_MALWARE_ROOT") {
            self.paths.malware_root = PathBuf::from(v);
        }
        if let Ok(v) = env::var("PASTESIFT_ENTROPY_THRESHOLD") {
            self.filter.entropy_threshold = parse_var("PASTESIFT_ENTROPY_THRESHOLD", &v)?;
        }
        if let Ok(v) = env::var("PASTESIFT_WORKERS") {
            self.pool.workers = parse_var("PASTESIFT_WORKERS", &v)?;
        }
        if let Ok(v) = env::var("PASTESIFT_REPUTATION_URL") {
            self.reputation.url = v;
        }
        if let Ok(v) = env::var("PASTESIFT_REPUTATION_KEY") {
            self.reputation.api_key = v;
        }
        if let Ok(v) = env::var("PASTESIFT_REPUTATION_DELAY_SECS") {
            self.reputation.delay_secs = parse_var("PASTESIFT_REPUTATION_DELAY_SECS", &v)?;
        }
        if let Ok(v) = env::var("PASTESIFT_ARCHIVER_URL") {
            self.archive.archiver_url = v;
        }
        if let Ok(v) = env::var("PASTESIFT_ARCHIVER_TOKEN") {
            self.archive.archiver_token = v;
        }
        if let Ok(v) = env::var("PASTESIFT_ARCHIVE_PASSPHRASE") {
            self.archive.passphrase = v;
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| SiftError::Config(format!("invalid value for {}: {:?}", name, raw)))
}

/// Filesystem roots used by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the date-partitioned paste tree (`root/year/month/day/key`).
    pub paste_root: PathBuf,
    /// Flat directory for payloads recovered by the discovery engine.
    pub artifact_dir: PathBuf,
    /// Root for per-directory malware sub-archives.
    pub malware_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            paste_root: PathBuf::from("pastes"),
            artifact_dir: PathBuf::from("recovered"),
            malware_root: PathBuf::from("extracted_malware"),
        }
    }
}

/// Entropy candidate filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum Shannon entropy (bits/byte) for a paste to become a candidate.
    pub entropy_threshold: f64,
    /// Substrings whose presence disqualifies a paste regardless of entropy.
    pub skip_markers: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            entropy_threshold: 5.75,
            skip_markers: crate::filter::default_skip_markers(),
        }
    }
}

/// Layered decoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Mime types that count as a recovered payload.
    pub allow_types: Vec<String>,
    /// Minimum payload length for XOR-sweep matches; 0 disables the check.
    pub min_payload_len: usize,
    /// Cap on inflated output during decompression.
    pub max_inflated_bytes: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            allow_types: crate::decode::default_allow_types(),
            min_payload_len: 0,
            max_inflated_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Queue poll timeout, in seconds, between cancellation checks.
    pub poll_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            poll_timeout_secs: 3,
        }
    }
}

/// External reputation service configuration.
///
/// An empty `url` disables lookups; every digest then reports the neutral
/// not-found pair without touching the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// Reputation service endpoint.
    pub url: String,
    /// API credential sent with each lookup.
    pub api_key: String,
    /// Mandatory delay between consecutive lookups, system-wide.
    pub delay_secs: u64,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            delay_secs: 16,
            timeout_secs: 30,
        }
    }
}

/// Archive manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Mime prefixes eligible for the malware sub-archive.
    pub extract_allow_prefixes: Vec<String>,
    /// Specific mime types excluded from the malware sub-archive.
    pub extract_deny_types: Vec<String>,
    /// External archiver endpoint; empty disables submission.
    pub archiver_url: String,
    /// Bearer token for the archiver endpoint.
    pub archiver_token: String,
    /// Access passphrase forwarded with each submission.
    pub passphrase: String,
    /// Source tag forwarded with each submission.
    pub source_tag: String,
    /// Per-request timeout for archiver submissions.
    pub timeout_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            extract_allow_prefixes: vec!["application".to_string(), "image".to_string()],
            extract_deny_types: vec![
                "application/pdf".to_string(),
                "application/gzip".to_string(),
                "application/zip".to_string(),
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/gif".to_string(),
            ],
            archiver_url: String::new(),
            archiver_token: String::new(),
            passphrase: String::new(),
            source_tag: "pastebin".to_string(),
            timeout_secs: 30,
        }
    }
}
