//! Per-worker task processing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::core::attempt::{AnalysisResult, Finding};
use crate::core::paste::Candidate;
use crate::hashing::sha256_digest;
use crate::pipeline::pool::{Task, WorkerContext};

/// Worker main loop: block on the task queue with a timeout so the stop
/// flag is checked between polls, process until a sentinel arrives.
pub(crate) fn worker_loop(
    tasks: Receiver<Task>,
    results: Sender<AnalysisResult>,
    ctx: WorkerContext,
    stop: Arc<AtomicBool>,
    poll_timeout: Duration,
) {
    loop {
        if stop.load(Ordering::Relaxed) {
            debug!("stop flag raised, worker exiting");
            break;
        }
        match tasks.recv_timeout(poll_timeout) {
            Ok(Task::Shutdown) => {
                debug!("sentinel received, worker exiting");
                break;
            }
            Ok(Task::Analyze(candidate)) => {
                if let Some(result) = process_candidate(&candidate, &ctx) {
                    if results.send(result).is_err() {
                        break;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Analyze one candidate. Every per-attempt failure is contained here so
/// the worker loop survives to its next task.
fn process_candidate(candidate: &Candidate, ctx: &WorkerContext) -> Option<AnalysisResult> {
    debug!(key = %candidate.key, entropy = candidate.entropy, "analyzing candidate");
    let attempts = ctx.decoder.analyze(&candidate.body);
    if attempts.is_empty() {
        return None;
    }
    let mut findings = Vec::with_capacity(attempts.len());
    for attempt in attempts {
        let digest = sha256_digest(&attempt.payload);
        let reputation = ctx.reputation.lookup(&digest);
        if let Err(err) = ctx.artifacts.write(&candidate.key, &attempt) {
            warn!(key = %candidate.key, error = %err, "failed to persist recovered payload");
        }
        findings.push(Finding {
            attempt,
            digest,
            reputation,
        });
    }
    Some(AnalysisResult {
        key: candidate.key.clone(),
        entropy: candidate.entropy,
        findings,
    })
}
