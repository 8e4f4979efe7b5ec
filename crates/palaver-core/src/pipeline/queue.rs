//! Shared FIFO intake queue.
//!
//! One unbounded mpsc channel feeds the whole pool; the receiver sits
//! behind an async mutex so any free worker can pull the next task.
//! There is no backpressure signal to producers, so a slow backend can
//! grow the queue without limit; the current depth is tracked and logged
//! for visibility.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use palaver_types::task::Task;

/// FIFO queue between message intake and the worker pool.
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>,
    depth: AtomicUsize,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            depth: AtomicUsize::new(0),
        }
    }

    /// Enqueue a task. Returns `false` if the queue has shut down.
    pub fn submit(&self, task: Task) -> bool {
        match self.tx.send(task) {
            Ok(()) => {
                let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(depth, "task enqueued");
                if depth >= 100 {
                    warn!(depth, "intake queue is backing up");
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Pull the next task, waiting until one arrives.
    ///
    /// Returns `None` once the queue is closed and drained. Workers take
    /// turns holding the receiver lock; whichever holds it when a task
    /// arrives gets that task.
    pub async fn next(&self) -> Option<Task> {
        let task = self.rx.lock().await.recv().await;
        if task.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        task
    }

    /// Tasks currently waiting (approximate under concurrency).
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
