//! The fixed-size worker pool.
//!
//! Workers are spawned once at startup and live for the process lifetime;
//! the pool size is the single capacity-planning knob. Each worker pulls
//! from the shared queue and runs one task's entire pipeline before taking
//! the next -- no preemption mid-task, no cross-worker stage handoff.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::collab::{Messenger, Synthesizer, Transcriber};

use super::queue::TaskQueue;
use super::worker::Pipeline;

/// Handle to the running pool.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn `workers` workers (at least one) over the shared queue.
    pub fn start<M, T, S>(
        workers: usize,
        pipeline: Arc<Pipeline<M, T, S>>,
        queue: Arc<TaskQueue>,
    ) -> Self
    where
        M: Messenger + 'static,
        T: Transcriber + 'static,
        S: Synthesizer + 'static,
    {
        let workers = workers.max(1);
        let cancel = CancellationToken::new();

        let handles = (0..workers)
            .map(|i| {
                let name = format!("worker-{}", i + 1);
                let pipeline = Arc::clone(&pipeline);
                let queue = Arc::clone(&queue);
                let cancel = cancel.clone();
                tokio::spawn(worker_loop(name, pipeline, queue, cancel))
            })
            .collect();

        info!(workers, "worker pool started");
        Self { handles, cancel }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Stop accepting work and wait for the workers to exit.
    ///
    /// A worker mid-task finishes that task first; tasks still queued are
    /// dropped (nothing is persisted across restarts anyway).
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("worker pool stopped");
    }
}

async fn worker_loop<M, T, S>(
    name: String,
    pipeline: Arc<Pipeline<M, T, S>>,
    queue: Arc<TaskQueue>,
    cancel: CancellationToken,
) where
    M: Messenger,
    T: Transcriber,
    S: Synthesizer,
{
    info!(worker = %name, "started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            task = queue.next() => match task {
                Some(task) => pipeline.process(task).await,
                None => break,
            },
        }
    }
    info!(worker = %name, "stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use palaver_types::chat::ConversationId;
    use palaver_types::model::{ModelCatalog, ModelFamily};
    use palaver_types::task::Task;

    use crate::context::{ContextStore, StoreDefaults};
    use crate::llm::generate::BoxGenerator;
    use crate::llm::router::ModelRouter;
    use crate::pipeline::worker::PipelineOptions;
    use crate::pipeline::worker::mocks::*;

    fn pipeline_with(
        router: ModelRouter,
    ) -> (
        Arc<Pipeline<RecordingMessenger, StubTranscriber, StubSynthesizer>>,
        Arc<RecordingMessenger>,
        Arc<ContextStore>,
    ) {
        let model = ModelCatalog::builtin().default_model().clone();
        let store = Arc::new(ContextStore::new(StoreDefaults::new(100, 12_000, model)));
        let messenger = Arc::new(RecordingMessenger::default());
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&store),
            Arc::new(router),
            Arc::clone(&messenger),
            Arc::new(StubTranscriber::ok("")),
            Arc::new(StubSynthesizer::ok()),
            PipelineOptions::default(),
        ));
        (pipeline, messenger, store)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within the test deadline");
    }

    #[tokio::test]
    async fn worker_survives_a_failing_task() {
        let router = ModelRouter::new()
            .with_family(ModelFamily::Gemini, BoxGenerator::new(FlakyGenerator::new(1)));
        let (pipeline, messenger, store) = pipeline_with(router);

        let queue = Arc::new(TaskQueue::new());
        let pool = WorkerPool::start(1, pipeline, Arc::clone(&queue));
        assert_eq!(pool.worker_count(), 1);

        // First task hits the failing backend, second must still complete
        // on the same (only) worker.
        queue.submit(Task::text(ConversationId(1), "first"));
        queue.submit(Task::text(ConversationId(1), "second"));

        wait_until(|| !messenger.delivered_texts().is_empty()).await;
        assert_eq!(messenger.delivered_texts(), vec!["re: second"]);

        // Only the successful exchange reached the history.
        let window = store.read_window(ConversationId(1)).await;
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].text, "second");

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn pool_completes_all_tasks_across_workers() {
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        let (pipeline, messenger, _store) = pipeline_with(router);

        let queue = Arc::new(TaskQueue::new());
        let pool = WorkerPool::start(3, pipeline, Arc::clone(&queue));

        for i in 0..12i64 {
            queue.submit(Task::text(ConversationId(i % 4), format!("msg-{i}")));
        }

        wait_until(|| messenger.delivered.lock().unwrap().len() == 12).await;
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn zero_workers_is_clamped_to_one() {
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        let (pipeline, messenger, _store) = pipeline_with(router);

        let queue = Arc::new(TaskQueue::new());
        let pool = WorkerPool::start(0, pipeline, Arc::clone(&queue));
        assert_eq!(pool.worker_count(), 1);

        queue.submit(Task::text(ConversationId(1), "hi"));
        wait_until(|| !messenger.delivered_texts().is_empty()).await;
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_joins_all_workers() {
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        let (pipeline, _messenger, _store) = pipeline_with(router);

        let queue = Arc::new(TaskQueue::new());
        let pool = WorkerPool::start(4, pipeline, queue);
        pool.shutdown().await;
    }
}
