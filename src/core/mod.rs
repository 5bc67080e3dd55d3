//! Core data types for paste payload discovery.

pub mod attempt;
pub mod paste;
pub mod report;

// Re-exports for convenient access under crate::core::*
pub use attempt::{AnalysisResult, DecodeAttempt, Finding, Reputation};
pub use paste::{partition_path, target_date, Candidate, PasteRecord};
pub use report::{ArchiveRunReport, DirectoryReport, PoolStats, RunSummary};
