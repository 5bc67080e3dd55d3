//! pastesift: discovery of obfuscated binary payloads in harvested pastes.
//!
//! The pipeline scores landed paste records by Shannon entropy, pushes the
//! high-entropy candidates through a layered decode search (base64, gzip,
//! single-byte XOR brute force) to unmask recognizable binary artifacts,
//! checks recovered payloads against an external reputation service, and
//! persists them for triage. A separate archive manager consolidates
//! closed daily partitions into append-only zip archives with a
//! verify-before-delete safety protocol, and maintains a filtered malware
//! sub-archive that is forwarded to an external archiver.
//!
//! Scraping, the search UI, indexing, and notification delivery are
//! external collaborators; this crate covers the discovery core.

/// Crash-safe paste archiving and recovered-artifact storage
pub mod archive;
/// Configuration surface for every component
pub mod config;
/// Core data types module
pub mod core;
/// Layered decode engine
pub mod decode;
/// Error types
pub mod error;
/// Entropy-based candidate filtering
pub mod filter;
/// Content digests
pub mod hashing;
/// Tracing setup
pub mod logging;
/// Worker pool and run orchestration
pub mod pipeline;
/// Rate-limited reputation lookups
pub mod reputation;

pub use archive::ArchiveManager;
pub use config::SiftConfig;
pub use error::{Result, SiftError};
pub use pipeline::Orchestrator;
