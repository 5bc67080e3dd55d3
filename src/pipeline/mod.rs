//! Bounded-parallelism analysis pipeline.

pub mod orchestrator;
pub mod pool;
pub mod worker;

pub use orchestrator::Orchestrator;
pub use pool::{Task, WorkerContext, WorkerPool};
