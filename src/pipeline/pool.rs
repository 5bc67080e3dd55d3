//! Fixed-size worker pool over message-passing channels.
//!
//! Workers share nothing but the task and result channels plus a
//! cooperative stop flag. Shutdown is sentinel-based: exactly one
//! `Task::Shutdown` per worker, since any idle worker may consume any
//! given sentinel. Completion requires that every worker has exited AND
//! that the results channel is drained: a worker may still be finishing
//! its current item when its liveness is checked.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info};

use crate::archive::ArtifactWriter;
use crate::config::PoolConfig;
use crate::core::attempt::AnalysisResult;
use crate::core::paste::Candidate;
use crate::core::report::PoolStats;
use crate::decode::LayeredDecoder;
use crate::error::{Result, SiftError};
use crate::pipeline::worker::worker_loop;
use crate::reputation::ReputationClient;

/// One unit of work, or the per-worker termination sentinel.
pub enum Task {
    Analyze(Candidate),
    Shutdown,
}

/// Shared collaborators handed to every worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub decoder: Arc<LayeredDecoder>,
    pub reputation: Arc<ReputationClient>,
    pub artifacts: Arc<ArtifactWriter>,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    task_tx: Sender<Task>,
    result_rx: Receiver<AnalysisResult>,
    stop: Arc<AtomicBool>,
    poll_timeout: Duration,
}

impl WorkerPool {
    /// Spawn the pool. Failure to spawn any worker aborts the run; this is
    /// the one resource failure that is allowed to.
    pub fn spawn(cfg: &PoolConfig, ctx: WorkerContext) -> Result<Self> {
        let workers = cfg.workers.max(1);
        let poll_timeout = Duration::from_secs(cfg.poll_timeout_secs.max(1));
        let (task_tx, task_rx) = unbounded::<Task>();
        let (result_tx, result_rx) = unbounded::<AnalysisResult>();
        let stop = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let ctx = ctx.clone();
            let stop = Arc::clone(&stop);
            let handle = thread::Builder::new()
                .name(format!("sift-worker-{}", index))
                .spawn(move || worker_loop(task_rx, result_tx, ctx, stop, poll_timeout))
                .map_err(|err| SiftError::Pool(format!("spawning worker {}: {}", index, err)))?;
            handles.push(handle);
        }
        // Workers hold the only task receivers and result senders; the
        // results channel disconnects once every worker has exited.
        drop(task_rx);
        drop(result_tx);

        info!(workers, "worker pool started");
        Ok(Self {
            handles,
            task_tx,
            result_rx,
            stop,
            poll_timeout,
        })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    pub fn submit(&self, candidate: Candidate) {
        let _ = self.task_tx.send(Task::Analyze(candidate));
    }

    /// Enqueue exactly one sentinel per worker, after all real tasks.
    pub fn signal_shutdown(&self) {
        for _ in 0..self.handles.len() {
            let _ = self.task_tx.send(Task::Shutdown);
        }
    }

    /// Raise the cooperative stop flag; workers notice between polls.
    pub fn request_stop(&self) {
        self.stop.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    /// Collect results until every worker has exited and the results
    /// channel is empty, then join and account for casualties.
    pub fn drain(self) -> (Vec<AnalysisResult>, PoolStats) {
        let mut results = Vec::new();
        loop {
            match self.result_rx.recv_timeout(self.poll_timeout) {
                Ok(result) => {
                    debug!(key = %result.key, findings = result.findings.len(), "result received");
                    results.push(result);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            let all_exited = self.handles.iter().all(|h| h.is_finished());
            if all_exited && self.result_rx.is_empty() {
                break;
            }
        }
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }

        let workers = self.handles.len();
        let mut panicked = 0;
        for handle in self.handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            tracing::error!(panicked, workers, "workers died during the run");
        }
        (results, PoolStats { workers, panicked })
    }
}
