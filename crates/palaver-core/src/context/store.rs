//! Concurrent per-conversation context store.
//!
//! The store is a `DashMap` keyed by conversation id, holding each
//! conversation behind its own async mutex: mutations for one conversation
//! are serialized, while unrelated conversations proceed fully in parallel.
//! Sessions are created lazily on first reference and never destroyed;
//! only their turns are pruned.
//!
//! Physical eviction is lazy. Turn timestamps are monotone within a
//! conversation, so expired turns always form a prefix of the history;
//! dropping that prefix (plus anything beyond `max_history` from the tail)
//! on any locked access leaves exactly the turns a window read can see.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use palaver_types::chat::{ConversationId, ConversationSettings, Speaker, Turn};
use palaver_types::model::ModelRef;

/// Defaults applied when a conversation is first referenced.
#[derive(Debug, Clone)]
pub struct StoreDefaults {
    pub max_history: usize,
    pub context_ttl_secs: i64,
    pub model: ModelRef,
}

impl StoreDefaults {
    pub fn new(max_history: usize, context_ttl_secs: i64, model: ModelRef) -> Self {
        Self {
            max_history,
            context_ttl_secs,
            model,
        }
    }
}

/// One conversation's mutable state. Only ever touched under its own lock.
struct Conversation {
    settings: ConversationSettings,
    history: Vec<Turn>,
}

impl Conversation {
    fn new(defaults: &StoreDefaults) -> Self {
        Self {
            settings: ConversationSettings {
                max_history: defaults.max_history,
                context_ttl_secs: defaults.context_ttl_secs,
                voice_mode: false,
                model: defaults.model.clone(),
            },
            history: Vec::new(),
        }
    }

    /// Drop turns that can never reappear in a window: anything pushed
    /// beyond `max_history` by newer turns, and the expired prefix.
    ///
    /// A `max_history` of 0 disables the depth limit (TTL still applies).
    fn prune(&mut self, now: DateTime<Utc>) {
        let max = self.settings.max_history;
        if max > 0 {
            let excess = self.history.len().saturating_sub(max);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }
        let ttl = self.settings.context_ttl();
        let expired = self
            .history
            .iter()
            .take_while(|turn| !turn.is_fresh(now, ttl))
            .count();
        if expired > 0 {
            self.history.drain(..expired);
        }
    }
}

/// Shared store of all conversation state.
///
/// All operations are infallible: unseen ids allocate a session with the
/// store's defaults, and pruning (never crashing) bounds memory use.
pub struct ContextStore {
    conversations: DashMap<ConversationId, Arc<Mutex<Conversation>>>,
    defaults: StoreDefaults,
}

impl ContextStore {
    pub fn new(defaults: StoreDefaults) -> Self {
        Self {
            conversations: DashMap::new(),
            defaults,
        }
    }

    /// Fetch the conversation's lock, creating the session on first use.
    fn handle(&self, id: ConversationId) -> Arc<Mutex<Conversation>> {
        self.conversations
            .entry(id)
            .or_insert_with(|| {
                debug!(conversation = %id, "creating conversation session");
                Arc::new(Mutex::new(Conversation::new(&self.defaults)))
            })
            .clone()
    }

    /// Append one turn stamped with the current time.
    pub async fn append_turn(&self, id: ConversationId, speaker: Speaker, text: &str) {
        self.append_raw(id, Turn::new(speaker, text)).await;
    }

    async fn append_raw(&self, id: ConversationId, turn: Turn) {
        let handle = self.handle(id);
        let mut conv = handle.lock().await;
        conv.history.push(turn);
        conv.prune(Utc::now());
    }

    /// Append a completed exchange (user turn + model turn) atomically.
    ///
    /// The pipeline calls this only after generation succeeds; a failed
    /// exchange never reaches the history.
    pub async fn append_exchange(&self, id: ConversationId, user_text: &str, model_text: &str) {
        let handle = self.handle(id);
        let mut conv = handle.lock().await;
        conv.history.push(Turn::new(Speaker::User, user_text));
        conv.history.push(Turn::new(Speaker::Model, model_text));
        conv.prune(Utc::now());
        debug!(
            conversation = %id,
            turns = conv.history.len(),
            "appended exchange"
        );
    }

    /// The turns currently visible to the model: within `context_ttl` of
    /// now AND among the most recent `max_history` turns.
    pub async fn read_window(&self, id: ConversationId) -> Vec<Turn> {
        let handle = self.handle(id);
        let mut conv = handle.lock().await;
        conv.prune(Utc::now());
        conv.history.clone()
    }

    /// Remove all turns, keeping the session and its settings.
    pub async fn clear_history(&self, id: ConversationId) {
        let handle = self.handle(id);
        let mut conv = handle.lock().await;
        conv.history.clear();
    }

    /// Snapshot of the conversation's settings.
    pub async fn settings(&self, id: ConversationId) -> ConversationSettings {
        let handle = self.handle(id);
        let conv = handle.lock().await;
        conv.settings.clone()
    }

    pub async fn set_max_history(&self, id: ConversationId, max_history: usize) {
        let handle = self.handle(id);
        let mut conv = handle.lock().await;
        conv.settings.max_history = max_history;
    }

    pub async fn set_context_ttl(&self, id: ConversationId, secs: i64) {
        let handle = self.handle(id);
        let mut conv = handle.lock().await;
        conv.settings.context_ttl_secs = secs;
    }

    pub async fn voice_mode(&self, id: ConversationId) -> bool {
        let handle = self.handle(id);
        let conv = handle.lock().await;
        conv.settings.voice_mode
    }

    pub async fn set_voice_mode(&self, id: ConversationId, on: bool) {
        let handle = self.handle(id);
        let mut conv = handle.lock().await;
        conv.settings.voice_mode = on;
    }

    /// Flip voice mode and return the new value.
    pub async fn toggle_voice_mode(&self, id: ConversationId) -> bool {
        let handle = self.handle(id);
        let mut conv = handle.lock().await;
        conv.settings.voice_mode = !conv.settings.voice_mode;
        conv.settings.voice_mode
    }

    /// The conversation's current model snapshot.
    pub async fn model(&self, id: ConversationId) -> ModelRef {
        let handle = self.handle(id);
        let conv = handle.lock().await;
        conv.settings.model.clone()
    }

    /// Replace the conversation's model snapshot.
    pub async fn set_model(&self, id: ConversationId, model: ModelRef) {
        let handle = self.handle(id);
        let mut conv = handle.lock().await;
        debug!(conversation = %id, model = %model.id, "model selected");
        conv.settings.model = model;
    }

    /// Number of sessions currently held.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }
}
