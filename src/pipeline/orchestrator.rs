//! Run driver: candidate selection, pool coordination, aggregation.

use std::cmp::Ordering;
use std::fs;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::archive::ArtifactWriter;
use crate::config::SiftConfig;
use crate::core::paste::{partition_path, target_date, Candidate, PasteRecord};
use crate::core::report::RunSummary;
use crate::decode::LayeredDecoder;
use crate::error::Result;
use crate::filter::CandidateFilter;
use crate::pipeline::pool::{WorkerContext, WorkerPool};
use crate::reputation::ReputationClient;

struct CandidateScan {
    scanned: usize,
    candidates: Vec<Candidate>,
}

pub struct Orchestrator {
    cfg: SiftConfig,
}

impl Orchestrator {
    pub fn new(cfg: SiftConfig) -> Self {
        Self { cfg }
    }

    /// Analyze the partition `age_days` before today. Age 1, the default
    /// operational window, targets yesterday's closed partition.
    pub fn run_for_age(&self, age_days: i64) -> Result<RunSummary> {
        self.run(target_date(age_days))
    }

    /// Analyze one day's partition end to end and aggregate the report.
    pub fn run(&self, date: NaiveDate) -> Result<RunSummary> {
        let scan = self.find_candidates(date)?;
        info!(
            date = %date,
            scanned = scan.scanned,
            candidates = scan.candidates.len(),
            "candidate selection complete"
        );

        let candidates = scan.candidates.len();
        let ctx = WorkerContext {
            decoder: Arc::new(LayeredDecoder::new(&self.cfg.decoder)),
            reputation: Arc::new(ReputationClient::new(self.cfg.reputation.clone())),
            artifacts: Arc::new(ArtifactWriter::new(self.cfg.paths.artifact_dir.clone())),
        };
        let pool = WorkerPool::spawn(&self.cfg.pool, ctx)?;
        for candidate in scan.candidates {
            pool.submit(candidate);
        }
        pool.signal_shutdown();
        let (mut results, stats) = pool.drain();

        // Report ordering: ascending entropy, stable on ties.
        results.sort_by(|a, b| {
            a.entropy
                .partial_cmp(&b.entropy)
                .unwrap_or(Ordering::Equal)
        });

        let summary = RunSummary {
            date,
            scanned: scan.scanned,
            candidates,
            results,
            pool: stats,
        };
        info!(
            payloads = summary.payloads_recovered(),
            anomalies = summary.pool.panicked,
            "run complete"
        );
        Ok(summary)
    }

    /// Walk one day's partition and score every landed record. Unreadable
    /// or unparsable files are logged, counted as scanned, and skipped.
    fn find_candidates(&self, date: NaiveDate) -> Result<CandidateScan> {
        let dir = partition_path(&self.cfg.paths.paste_root, date);
        let filter = CandidateFilter::new(&self.cfg.filter);
        let mut scan = CandidateScan {
            scanned: 0,
            candidates: Vec::new(),
        };
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "partition directory missing");
            return Ok(scan);
        }
        for entry in WalkDir::new(&dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            scan.scanned += 1;
            let raw = match fs::read_to_string(entry.path()) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "unreadable paste file");
                    continue;
                }
            };
            let record = match PasteRecord::from_json(&raw) {
                Ok(record) => record,
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "skipping malformed record");
                    continue;
                }
            };
            let body = record.body.into_bytes();
            let score = filter.score(&body);
            if filter.is_candidate(&body, score) {
                scan.candidates.push(Candidate {
                    key: record.key,
                    entropy: score,
                    body,
                });
            }
        }
        Ok(scan)
    }
}
