//! The per-task pipeline.
//!
//! A worker runs one task's entire pipeline before pulling the next:
//! transcribe (voice only), compose (window -> truncate -> route ->
//! generate -> commit the exchange), deliver, and optionally synthesize
//! speech. Stage transitions are reflected in the task's status message;
//! only the owning worker ever touches a task's tickets.
//!
//! Every failure is caught here, at the task boundary: the worker logs the
//! full error, shows the short user notice, and stays alive for the next
//! task.

use std::sync::Arc;

use tracing::{debug, error, warn};

use palaver_types::chat::ConversationId;
use palaver_types::error::TaskError;
use palaver_types::task::{Task, TaskPayload, TaskStage};

use crate::collab::{Messenger, Synthesizer, Transcriber};
use crate::context::ContextStore;
use crate::llm::budget;
use crate::llm::generate::GenerationRequest;
use crate::llm::router::ModelRouter;

/// Knobs the pipeline passes through to collaborators.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Model hint for the transcription collaborator.
    pub transcription_model: Option<String>,
    /// Voice hint for the synthesis collaborator.
    pub voice: Option<String>,
    /// Persona instructions forwarded with every generation request.
    pub system_instructions: Option<String>,
}

/// Everything a worker needs to run one task end-to-end.
pub struct Pipeline<M, T, S> {
    store: Arc<ContextStore>,
    router: Arc<ModelRouter>,
    messenger: Arc<M>,
    transcriber: Arc<T>,
    synthesizer: Arc<S>,
    options: PipelineOptions,
}

impl<M: Messenger, T: Transcriber, S: Synthesizer> Pipeline<M, T, S> {
    pub fn new(
        store: Arc<ContextStore>,
        router: Arc<ModelRouter>,
        messenger: Arc<M>,
        transcriber: Arc<T>,
        synthesizer: Arc<S>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            store,
            router,
            messenger,
            transcriber,
            synthesizer,
            options,
        }
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Run a task to its terminal state.
    ///
    /// Never propagates an error: a failed task is logged, its status
    /// message gets the user notice, and the worker moves on.
    pub async fn process(&self, task: Task) {
        debug!(
            task = %task.id,
            conversation = %task.conversation,
            kind = %task.kind(),
            "task started"
        );
        match self.run(&task).await {
            Ok(()) => {
                debug!(task = %task.id, stage = %TaskStage::Done, "task finished");
            }
            Err(err) => {
                error!(
                    task = %task.id,
                    conversation = %task.conversation,
                    stage = %TaskStage::Failed,
                    error = %err,
                    "task failed"
                );
                if let Some(ticket) = &task.status
                    && let Err(edit_err) = self
                        .messenger
                        .update_status(ticket, &err.user_notice())
                        .await
                {
                    debug!(error = %edit_err, "failure notice could not be shown");
                }
            }
        }
    }

    async fn run(&self, task: &Task) -> Result<(), TaskError> {
        let conversation = task.conversation;

        // Transcribe (voice only). A transcription failure short-circuits
        // the whole pipeline; nothing reaches the history.
        let (user_text, image, status_prefix) = match &task.payload {
            TaskPayload::Text { text } => (text.clone(), None, String::new()),
            TaskPayload::Photo { image, caption } => {
                (caption.clone(), Some(image.clone()), String::new())
            }
            TaskPayload::Voice { audio } => {
                debug!(task = %task.id, stage = %TaskStage::Transcribing, "stage");
                self.edit_status(task, "Transcribing the voice message...").await;
                let text = match self
                    .transcriber
                    .transcribe(audio, self.options.transcription_model.as_deref())
                    .await
                {
                    Ok(text) => text,
                    Err(err) => {
                        self.drop_icon(task).await;
                        return Err(err.into());
                    }
                };
                self.drop_icon(task).await;
                let prefix = format!("Recognized:\n{}\n", text.trim());
                self.edit_status(task, &format!("{prefix}Composing an answer")).await;
                (text, None, prefix)
            }
        };

        // Compose: window -> truncate -> route -> generate -> commit.
        debug!(task = %task.id, stage = %TaskStage::Composing, "stage");
        let answer = self.compose(conversation, &user_text, image).await?;

        // Deliver. A failure here is surfaced, but the exchange already
        // committed to the history stays.
        debug!(task = %task.id, stage = %TaskStage::Delivering, "stage");
        self.edit_status(task, &format!("{status_prefix}Answer ready")).await;
        self.messenger
            .deliver_text(conversation, &answer, task.reply_to)
            .await?;

        // Synthesize, only when the conversation has voice mode on.
        if self.store.voice_mode(conversation).await {
            debug!(task = %task.id, stage = %TaskStage::Synthesizing, "stage");
            self.synthesize_stage(task, &answer).await?;
        }

        Ok(())
    }

    /// The composing stage. On any error no turn is appended -- a failed
    /// exchange must not pollute the history.
    async fn compose(
        &self,
        conversation: ConversationId,
        user_text: &str,
        image: Option<Vec<u8>>,
    ) -> Result<String, TaskError> {
        let settings = self.store.settings(conversation).await;
        let model = settings.model;

        let window = self.store.read_window(conversation).await;
        let request_tokens =
            budget::estimate_request_tokens(user_text, usize::from(image.is_some()));
        let history = budget::fit_to_budget(window, request_tokens, model.context_tokens)?;

        let generator = self.router.route(model.family)?;
        let request = GenerationRequest {
            model_id: model.id.clone(),
            history,
            text: user_text.to_string(),
            image,
            system_instructions: self.options.system_instructions.clone(),
        };
        debug!(
            conversation = %conversation,
            model = %model.id,
            backend = generator.name(),
            history_turns = request.history.len(),
            "generating"
        );
        let answer = generator.generate(&request).await?;

        self.store
            .append_exchange(conversation, user_text, &answer)
            .await;
        Ok(answer)
    }

    /// Synthesize the answer and deliver it as audio. The text answer has
    /// already reached the user; a failure here never reverts that.
    async fn synthesize_stage(&self, task: &Task, answer: &str) -> Result<(), TaskError> {
        let progress = self
            .messenger
            .post_status(task.conversation, "Recording the spoken version...")
            .await
            .ok();

        let result = match self
            .synthesizer
            .synthesize(answer, self.options.voice.as_deref())
            .await
        {
            Ok(clip) => self
                .messenger
                .deliver_audio(task.conversation, &clip, task.reply_to)
                .await
                .map_err(TaskError::from),
            Err(err) => Err(TaskError::from(err)),
        };

        if let Some(ticket) = progress {
            let _ = self.messenger.remove_status(&ticket).await;
        }
        result
    }

    /// Best-effort status edit; transport hiccups are not task failures.
    async fn edit_status(&self, task: &Task, text: &str) {
        if let Some(ticket) = &task.status
            && let Err(err) = self.messenger.update_status(ticket, text).await
        {
            warn!(task = %task.id, error = %err, "status edit failed");
        }
    }

    /// Best-effort removal of the task's ephemeral icon message.
    async fn drop_icon(&self, task: &Task) {
        if let Some(ticket) = &task.icon {
            let _ = self.messenger.remove_status(ticket).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Test support and tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod mocks {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    use palaver_types::chat::ConversationId;
    use palaver_types::error::{
        DeliveryError, GenerateError, SpeechError, TranscribeError,
    };
    use palaver_types::task::StatusTicket;

    use crate::collab::{AudioClip, Messenger, Synthesizer, Transcriber};
    use crate::llm::generate::{GenerationRequest, Generator};

    /// Messenger that records everything it is asked to do.
    #[derive(Default)]
    pub struct RecordingMessenger {
        pub delivered: Mutex<Vec<(ConversationId, String)>>,
        pub audio: Mutex<Vec<(ConversationId, String)>>,
        pub statuses: Mutex<Vec<String>>,
        pub removed: Mutex<Vec<StatusTicket>>,
        next_message: AtomicI64,
        pub fail_text_delivery: bool,
    }

    impl RecordingMessenger {
        pub fn failing_delivery() -> Self {
            Self {
                fail_text_delivery: true,
                ..Self::default()
            }
        }

        pub fn delivered_texts(&self) -> Vec<String> {
            self.delivered.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
        }

        pub fn status_log(&self) -> Vec<String> {
            self.statuses.lock().unwrap().clone()
        }
    }

    impl Messenger for RecordingMessenger {
        async fn deliver_text(
            &self,
            conversation: ConversationId,
            text: &str,
            _reply_to: Option<i64>,
        ) -> Result<(), DeliveryError> {
            if self.fail_text_delivery {
                return Err(DeliveryError::Send("transport unavailable".to_string()));
            }
            self.delivered.lock().unwrap().push((conversation, text.to_string()));
            Ok(())
        }

        async fn deliver_audio(
            &self,
            conversation: ConversationId,
            clip: &AudioClip,
            _reply_to: Option<i64>,
        ) -> Result<(), DeliveryError> {
            self.audio.lock().unwrap().push((conversation, clip.mime.clone()));
            Ok(())
        }

        async fn post_status(
            &self,
            conversation: ConversationId,
            text: &str,
        ) -> Result<StatusTicket, DeliveryError> {
            self.statuses.lock().unwrap().push(text.to_string());
            Ok(StatusTicket {
                conversation,
                message: self.next_message.fetch_add(1, Ordering::Relaxed),
            })
        }

        async fn update_status(
            &self,
            _ticket: &StatusTicket,
            text: &str,
        ) -> Result<(), DeliveryError> {
            self.statuses.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn remove_status(&self, ticket: &StatusTicket) -> Result<(), DeliveryError> {
            self.removed.lock().unwrap().push(*ticket);
            Ok(())
        }
    }

    /// Transcriber returning a fixed result.
    pub struct StubTranscriber {
        pub result: Result<String, ()>,
    }

    impl StubTranscriber {
        pub fn ok(text: &str) -> Self {
            Self {
                result: Ok(text.to_string()),
            }
        }

        pub fn failing() -> Self {
            Self { result: Err(()) }
        }
    }

    impl Transcriber for StubTranscriber {
        async fn transcribe(
            &self,
            _audio: &[u8],
            _model_hint: Option<&str>,
        ) -> Result<String, TranscribeError> {
            match &self.result {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(TranscribeError::Request("audio service down".to_string())),
            }
        }
    }

    /// Synthesizer returning a fixed clip, or failing.
    pub struct StubSynthesizer {
        pub fail: bool,
    }

    impl StubSynthesizer {
        pub fn ok() -> Self {
            Self { fail: false }
        }

        pub fn failing() -> Self {
            Self { fail: true }
        }
    }

    impl Synthesizer for StubSynthesizer {
        async fn synthesize(
            &self,
            _text: &str,
            _voice_hint: Option<&str>,
        ) -> Result<AudioClip, SpeechError> {
            if self.fail {
                return Err(SpeechError::EmptyAudio);
            }
            Ok(AudioClip {
                data: vec![0u8; 16],
                mime: "audio/ogg".to_string(),
            })
        }
    }

    /// Generator echoing the request text.
    pub struct EchoGenerator;

    impl Generator for EchoGenerator {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
            Ok(format!("re: {}", request.text))
        }
    }

    /// Generator that fails its first `fail_first` calls, then echoes.
    pub struct FlakyGenerator {
        pub fail_first: usize,
        pub calls: AtomicUsize,
    }

    impl FlakyGenerator {
        pub fn new(fail_first: usize) -> Self {
            Self {
                fail_first,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Generator for FlakyGenerator {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(GenerateError::Provider {
                    message: "backend exploded".to_string(),
                })
            } else {
                Ok(format!("re: {}", request.text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::*;
    use super::*;

    use palaver_types::model::{ModelCatalog, ModelFamily, ModelRef};
    use palaver_types::task::StatusTicket;

    use crate::context::StoreDefaults;
    use crate::llm::generate::BoxGenerator;

    struct Harness {
        pipeline: Pipeline<RecordingMessenger, StubTranscriber, StubSynthesizer>,
        messenger: Arc<RecordingMessenger>,
        store: Arc<ContextStore>,
    }

    fn harness_with(
        model: ModelRef,
        router: ModelRouter,
        messenger: RecordingMessenger,
        transcriber: StubTranscriber,
        synthesizer: StubSynthesizer,
    ) -> Harness {
        let store = Arc::new(ContextStore::new(StoreDefaults::new(100, 12_000, model)));
        let messenger = Arc::new(messenger);
        let pipeline = Pipeline::new(
            Arc::clone(&store),
            Arc::new(router),
            Arc::clone(&messenger),
            Arc::new(transcriber),
            Arc::new(synthesizer),
            PipelineOptions::default(),
        );
        Harness {
            pipeline,
            messenger,
            store,
        }
    }

    fn default_harness() -> Harness {
        let model = ModelCatalog::builtin().default_model().clone();
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        harness_with(
            model,
            router,
            RecordingMessenger::default(),
            StubTranscriber::ok("spoken words"),
            StubSynthesizer::ok(),
        )
    }

    fn ticket(conversation: ConversationId) -> StatusTicket {
        StatusTicket {
            conversation,
            message: 1,
        }
    }

    #[tokio::test]
    async fn text_task_delivers_and_commits_exchange() {
        let h = default_harness();
        let conv = ConversationId(1);

        h.pipeline
            .process(Task::text(conv, "hello").with_status(ticket(conv)))
            .await;

        assert_eq!(h.messenger.delivered_texts(), vec!["re: hello"]);
        let window = h.store.read_window(conv).await;
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].text, "hello");
        assert_eq!(window[1].text, "re: hello");
        assert!(h.messenger.status_log().iter().any(|s| s == "Answer ready"));
    }

    #[tokio::test]
    async fn voice_task_transcribes_then_composes() {
        let h = default_harness();
        let conv = ConversationId(2);

        h.pipeline
            .process(Task::voice(conv, vec![1, 2, 3]).with_status(ticket(conv)))
            .await;

        assert_eq!(h.messenger.delivered_texts(), vec!["re: spoken words"]);
        let window = h.store.read_window(conv).await;
        assert_eq!(window[0].text, "spoken words");
        let log = h.messenger.status_log();
        assert!(log.iter().any(|s| s.contains("Recognized:\nspoken words")));
    }

    #[tokio::test]
    async fn transcription_failure_short_circuits() {
        let model = ModelCatalog::builtin().default_model().clone();
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        let h = harness_with(
            model,
            router,
            RecordingMessenger::default(),
            StubTranscriber::failing(),
            StubSynthesizer::ok(),
        );
        let conv = ConversationId(3);
        let icon = StatusTicket {
            conversation: conv,
            message: 2,
        };

        h.pipeline
            .process(
                Task::voice(conv, vec![1, 2, 3])
                    .with_status(ticket(conv))
                    .with_icon(icon),
            )
            .await;

        // Never reached composing: no delivery, no history.
        assert!(h.messenger.delivered_texts().is_empty());
        assert!(h.store.read_window(conv).await.is_empty());
        // Icon removed, notice shown.
        assert_eq!(h.messenger.removed.lock().unwrap().clone(), vec![icon]);
        let log = h.messenger.status_log();
        assert!(log.last().unwrap().contains("Could not transcribe"));
    }

    #[tokio::test]
    async fn generation_failure_appends_no_turns() {
        let model = ModelCatalog::builtin().default_model().clone();
        let router = ModelRouter::new()
            .with_family(ModelFamily::Gemini, BoxGenerator::new(FlakyGenerator::new(usize::MAX)));
        let h = harness_with(
            model,
            router,
            RecordingMessenger::default(),
            StubTranscriber::ok(""),
            StubSynthesizer::ok(),
        );
        let conv = ConversationId(4);

        h.pipeline
            .process(Task::text(conv, "boom").with_status(ticket(conv)))
            .await;

        assert!(h.messenger.delivered_texts().is_empty());
        assert!(h.store.read_window(conv).await.is_empty());
        let log = h.messenger.status_log();
        assert!(log.last().unwrap().contains("failed to produce an answer"));
    }

    #[tokio::test]
    async fn oversized_request_is_rejected_verbatim() {
        let tiny = ModelRef::new("tiny", "Tiny", ModelFamily::Gemini, 10);
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        let h = harness_with(
            tiny,
            router,
            RecordingMessenger::default(),
            StubTranscriber::ok(""),
            StubSynthesizer::ok(),
        );
        let conv = ConversationId(5);

        h.pipeline
            .process(Task::text(conv, "x".repeat(100)).with_status(ticket(conv)))
            .await;

        assert!(h.store.read_window(conv).await.is_empty());
        let log = h.messenger.status_log();
        assert!(log.last().unwrap().contains("exceeds the model's context window"));
    }

    #[tokio::test]
    async fn unsupported_family_is_surfaced() {
        let model = ModelCatalog::builtin().default_model().clone();
        // Router with no backend for Gemini.
        let h = harness_with(
            model,
            ModelRouter::new(),
            RecordingMessenger::default(),
            StubTranscriber::ok(""),
            StubSynthesizer::ok(),
        );
        let conv = ConversationId(6);

        h.pipeline
            .process(Task::text(conv, "hi").with_status(ticket(conv)))
            .await;

        assert!(h.store.read_window(conv).await.is_empty());
        let log = h.messenger.status_log();
        assert!(log.last().unwrap().contains("no configured backend"));
    }

    #[tokio::test]
    async fn voice_mode_synthesizes_after_delivery() {
        let h = default_harness();
        let conv = ConversationId(7);
        h.store.set_voice_mode(conv, true).await;

        h.pipeline
            .process(Task::text(conv, "sing").with_status(ticket(conv)))
            .await;

        assert_eq!(h.messenger.delivered_texts(), vec!["re: sing"]);
        assert_eq!(h.messenger.audio.lock().unwrap().len(), 1);
        // The synthesis progress message was posted and then removed.
        assert_eq!(h.messenger.removed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn synthesis_failure_keeps_delivered_text_and_history() {
        let model = ModelCatalog::builtin().default_model().clone();
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        let h = harness_with(
            model,
            router,
            RecordingMessenger::default(),
            StubTranscriber::ok(""),
            StubSynthesizer::failing(),
        );
        let conv = ConversationId(8);
        h.store.set_voice_mode(conv, true).await;

        h.pipeline
            .process(Task::text(conv, "sing").with_status(ticket(conv)))
            .await;

        // Text reached the user and the exchange stayed committed.
        assert_eq!(h.messenger.delivered_texts(), vec!["re: sing"]);
        assert_eq!(h.store.read_window(conv).await.len(), 2);
        let log = h.messenger.status_log();
        assert!(log.last().unwrap().contains("spoken version"));
    }

    #[tokio::test]
    async fn delivery_failure_keeps_committed_history() {
        let model = ModelCatalog::builtin().default_model().clone();
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        let h = harness_with(
            model,
            router,
            RecordingMessenger::failing_delivery(),
            StubTranscriber::ok(""),
            StubSynthesizer::ok(),
        );
        let conv = ConversationId(9);

        h.pipeline
            .process(Task::text(conv, "hello").with_status(ticket(conv)))
            .await;

        // The exchange committed before delivery failed; no rollback.
        assert_eq!(h.store.read_window(conv).await.len(), 2);
        let log = h.messenger.status_log();
        assert!(log.last().unwrap().contains("could not be delivered"));
    }

    #[tokio::test]
    async fn photo_task_carries_image_cost() {
        // Limit of 300: caption (0) + image (256) fits; with a second
        // image-sized history it would not, but a photo alone passes.
        let model = ModelRef::new("small", "Small", ModelFamily::Gemini, 300);
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        let h = harness_with(
            model,
            router,
            RecordingMessenger::default(),
            StubTranscriber::ok(""),
            StubSynthesizer::ok(),
        );
        let conv = ConversationId(10);

        h.pipeline
            .process(Task::photo(conv, vec![0u8; 64], "what is this?").with_status(ticket(conv)))
            .await;

        assert_eq!(h.messenger.delivered_texts(), vec!["re: what is this?"]);
        assert_eq!(h.store.read_window(conv).await.len(), 2);
    }

    #[tokio::test]
    async fn photo_over_budget_is_rejected() {
        // Image cost alone (256) exceeds a 100-token budget.
        let model = ModelRef::new("tiny", "Tiny", ModelFamily::Gemini, 100);
        let router =
            ModelRouter::new().with_family(ModelFamily::Gemini, BoxGenerator::new(EchoGenerator));
        let h = harness_with(
            model,
            router,
            RecordingMessenger::default(),
            StubTranscriber::ok(""),
            StubSynthesizer::ok(),
        );
        let conv = ConversationId(11);

        h.pipeline
            .process(Task::photo(conv, vec![0u8; 64], "look").with_status(ticket(conv)))
            .await;

        assert!(h.messenger.delivered_texts().is_empty());
        assert!(h.store.read_window(conv).await.is_empty());
    }
}
