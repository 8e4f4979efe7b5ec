//! Engine assembly: store + catalog + router + collaborators + pool.
//!
//! The surrounding application builds an [`Engine`] once at startup and
//! feeds it tasks; everything else (worker count, context defaults, the
//! model catalog) is fixed here for the process lifetime.

use std::sync::Arc;

use tracing::info;

use palaver_types::chat::ConversationId;
use palaver_types::config::EngineConfig;
use palaver_types::model::{CatalogError, ModelCatalog, ModelRef};
use palaver_types::task::Task;

use crate::collab::{Messenger, Synthesizer, Transcriber};
use crate::context::{ContextStore, StoreDefaults};
use crate::llm::router::ModelRouter;
use crate::pipeline::{Pipeline, PipelineOptions, TaskQueue, WorkerPool};

/// The assembled relay engine.
///
/// Generic over the delivery, transcription, and synthesis collaborators;
/// generation backends are dispatched dynamically through the router.
pub struct Engine<M, T, S> {
    store: Arc<ContextStore>,
    catalog: ModelCatalog,
    queue: Arc<TaskQueue>,
    pool: WorkerPool,
    /// Keeps the pipeline (and the collaborators inside it) alive for as
    /// long as the engine; workers hold their own clones.
    _pipeline: Arc<Pipeline<M, T, S>>,
}

impl<M, T, S> Engine<M, T, S>
where
    M: Messenger + 'static,
    T: Transcriber + 'static,
    S: Synthesizer + 'static,
{
    /// Build the engine and start its worker pool.
    ///
    /// Fails only if `config.default_model` names a model the catalog does
    /// not know -- a configuration error better caught at startup than at
    /// first message.
    pub fn new(
        config: &EngineConfig,
        catalog: ModelCatalog,
        router: ModelRouter,
        messenger: M,
        transcriber: T,
        synthesizer: S,
        options: PipelineOptions,
    ) -> Result<Self, CatalogError> {
        let default_model = match &config.default_model {
            Some(id) => catalog
                .get(id)
                .cloned()
                .ok_or_else(|| CatalogError::UnknownDefault(id.clone()))?,
            None => catalog.default_model().clone(),
        };
        info!(
            workers = config.workers,
            default_model = %default_model.id,
            models = catalog.len(),
            "starting engine"
        );

        let store = Arc::new(ContextStore::new(StoreDefaults::new(
            config.max_history,
            config.context_ttl_secs,
            default_model,
        )));
        let queue = Arc::new(TaskQueue::new());
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&store),
            Arc::new(router),
            Arc::new(messenger),
            Arc::new(transcriber),
            Arc::new(synthesizer),
            options,
        ));
        let pool = WorkerPool::start(config.workers, Arc::clone(&pipeline), Arc::clone(&queue));

        Ok(Self {
            store,
            catalog,
            queue,
            pool,
            _pipeline: pipeline,
        })
    }

    /// Enqueue a task. Returns `false` if the engine is shutting down.
    pub fn submit(&self, task: Task) -> bool {
        self.queue.submit(task)
    }

    /// The shared context store (settings commands go straight here).
    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Number of tasks currently queued.
    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    /// Select a model for a conversation by catalog id.
    ///
    /// Unknown ids are surfaced to the caller; the conversation keeps its
    /// current model.
    pub async fn select_model(
        &self,
        conversation: ConversationId,
        model_id: &str,
    ) -> Result<ModelRef, CatalogError> {
        let model = self
            .catalog
            .get(model_id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownModel(model_id.to_string()))?;
        self.store.set_model(conversation, model.clone()).await;
        Ok(model)
    }

    /// Stop the pool and wait for in-flight tasks to finish.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}
