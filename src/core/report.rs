//! Run summaries for the discovery engine and the archive manager.
//!
//! The text rendering is the operator-facing report: candidates processed,
//! payloads recovered, reputation verdicts, and worker anomalies. Delivery
//! (mail, chat, stdout) is the caller's concern.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::attempt::AnalysisResult;

/// Worker pool outcome for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Workers spawned.
    pub workers: usize,
    /// Workers that died without processing their sentinel. Reported as an
    /// operational anomaly, never auto-restarted.
    pub panicked: usize,
}

impl PoolStats {
    pub fn has_anomalies(&self) -> bool {
        self.panicked > 0
    }
}

/// Aggregated output of one discovery run over a partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Partition date analyzed.
    pub date: NaiveDate,
    /// Paste files examined.
    pub scanned: usize,
    /// Pastes that passed the entropy filter.
    pub candidates: usize,
    /// Per-paste results, sorted ascending by entropy.
    pub results: Vec<AnalysisResult>,
    pub pool: PoolStats,
}

impl RunSummary {
    /// Total recovered payloads across all results.
    pub fn payloads_recovered(&self) -> usize {
        self.results.iter().map(|r| r.findings.len()).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Paste payload results for {}", self.date)?;
        writeln!(f)?;
        writeln!(
            f,
            "scanned {} pastes, {} candidates, {} payloads recovered",
            self.scanned,
            self.candidates,
            self.payloads_recovered()
        )?;
        if self.pool.has_anomalies() {
            writeln!(
                f,
                "ANOMALY: {} of {} workers died during the run",
                self.pool.panicked, self.pool.workers
            )?;
        }
        for result in &self.results {
            writeln!(f)?;
            writeln!(f, "{} (entropy {:.3})", result.key, result.entropy)?;
            for finding in &result.findings {
                writeln!(
                    f,
                    "  {} via {} sha256:{} detection:{} {}",
                    finding.attempt.detected_type,
                    finding.attempt.chain_summary(),
                    finding.digest,
                    finding.reputation.detection,
                    finding.reputation.permalink
                )?;
            }
        }
        Ok(())
    }
}

/// Outcome of archiving one leaf directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryReport {
    pub directory: String,
    /// Loose files appended to the archive this pass.
    pub appended: usize,
    /// Loose files deleted after durable-listing verification.
    pub reaped: usize,
    /// Files that failed to append or delete; retried next pass.
    pub skipped: usize,
    /// Entries newly added to the malware sub-archive.
    pub extracted: usize,
    /// Whether the malware sub-archive was submitted to the archiver.
    pub submitted: bool,
}

/// Aggregated output of one archive manager run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveRunReport {
    pub directories: Vec<DirectoryReport>,
}

impl ArchiveRunReport {
    pub fn total_extracted(&self) -> usize {
        self.directories.iter().map(|d| d.extracted).sum()
    }
}

impl fmt::Display for ArchiveRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "archived {} directories, {} payloads extracted",
            self.directories.len(),
            self.total_extracted()
        )?;
        for dir in &self.directories {
            writeln!(
                f,
                "  {}: appended {} reaped {} skipped {} extracted {}{}",
                dir.directory,
                dir.appended,
                dir.reaped,
                dir.skipped,
                dir.extracted,
                if dir.submitted { " (submitted)" } else { "" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attempt::{DecodeAttempt, Finding, Reputation};

    fn sample_summary() -> RunSummary {
        RunSummary {
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            scanned: 120,
            candidates: 2,
            results: vec![AnalysisResult {
                key: "Ab3dE9".to_string(),
                entropy: 6.02,
                findings: vec![Finding {
                    attempt: DecodeAttempt {
                        encoding_chain: vec!["base64".to_string()],
                        compression_chain: vec!["gzip".to_string()],
                        xor_key: None,
                        detected_type: "application/x-dosexec".to_string(),
                        payload: vec![],
                    },
                    digest: "deadbeef".to_string(),
                    reputation: Reputation::not_found(),
                }],
            }],
            pool: PoolStats {
                workers: 10,
                panicked: 0,
            },
        }
    }

    #[test]
    fn test_summary_render() {
        let text = sample_summary().to_string();
        assert!(text.contains("Paste payload results for 2024-03-07"));
        assert!(text.contains("120 pastes"));
        assert!(text.contains("1 payloads recovered"));
        assert!(text.contains("application/x-dosexec via base64 + gzip"));
        assert!(!text.contains("ANOMALY"));
    }

    #[test]
    fn test_summary_reports_dead_workers() {
        let mut summary = sample_summary();
        summary.pool.panicked = 2;
        let text = summary.to_string();
        assert!(text.contains("ANOMALY: 2 of 10 workers died"));
    }

    #[test]
    fn test_summary_serializes() {
        let json = serde_json::to_string(&sample_summary()).unwrap();
        assert!(json.contains("\"candidates\":2"));
    }
}
