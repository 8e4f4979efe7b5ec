//! Task intake queue, per-task pipeline, and the fixed worker pool.

pub mod pool;
pub mod queue;
pub mod worker;

pub use pool::WorkerPool;
pub use queue::TaskQueue;
pub use worker::{Pipeline, PipelineOptions};
