//! Task shapes for the worker pipeline.
//!
//! One [`Task`] corresponds to one inbound user message. Tasks are
//! transient: created on arrival, dropped when the pipeline finishes or
//! fails, never persisted or requeued.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

use crate::chat::ConversationId;

/// What kind of inbound message a task carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Text,
    Voice,
    Photo,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Text => write!(f, "text"),
            TaskKind::Voice => write!(f, "voice"),
            TaskKind::Photo => write!(f, "photo"),
        }
    }
}

/// The payload of an inbound message.
#[derive(Debug, Clone)]
pub enum TaskPayload {
    Text { text: String },
    Voice { audio: Vec<u8> },
    Photo { image: Vec<u8>, caption: String },
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::Text { .. } => TaskKind::Text,
            TaskPayload::Voice { .. } => TaskKind::Voice,
            TaskPayload::Photo { .. } => TaskKind::Photo,
        }
    }
}

/// Pipeline stage of a task, used in logs and progress text.
///
/// Per-task stage order is strict:
/// `Queued -> (Voice) Transcribing -> Composing -> Delivering ->
/// (voice_mode) Synthesizing -> Done`, with `Failed` reachable from any
/// non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStage {
    Queued,
    Transcribing,
    Composing,
    Delivering,
    Synthesizing,
    Done,
    Failed,
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStage::Queued => write!(f, "queued"),
            TaskStage::Transcribing => write!(f, "transcribing"),
            TaskStage::Composing => write!(f, "composing"),
            TaskStage::Delivering => write!(f, "delivering"),
            TaskStage::Synthesizing => write!(f, "synthesizing"),
            TaskStage::Done => write!(f, "done"),
            TaskStage::Failed => write!(f, "failed"),
        }
    }
}

/// Handle to a user-visible progress message.
///
/// Only the single worker owning a task ever edits or removes the tickets
/// attached to that task, so no cross-worker coordination is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTicket {
    pub conversation: ConversationId,
    pub message: i64,
}

/// One unit of work for the pool: a single inbound user message.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Uuid,
    pub conversation: ConversationId,
    pub payload: TaskPayload,
    /// Transport message id the final answer should reply to.
    pub reply_to: Option<i64>,
    /// Status line edited across stage transitions.
    pub status: Option<StatusTicket>,
    /// Ephemeral stage marker, removed once its stage completes.
    pub icon: Option<StatusTicket>,
}

impl Task {
    fn new(conversation: ConversationId, payload: TaskPayload) -> Self {
        Self {
            id: Uuid::now_v7(),
            conversation,
            payload,
            reply_to: None,
            status: None,
            icon: None,
        }
    }

    pub fn text(conversation: ConversationId, text: impl Into<String>) -> Self {
        Self::new(conversation, TaskPayload::Text { text: text.into() })
    }

    pub fn voice(conversation: ConversationId, audio: Vec<u8>) -> Self {
        Self::new(conversation, TaskPayload::Voice { audio })
    }

    pub fn photo(conversation: ConversationId, image: Vec<u8>, caption: impl Into<String>) -> Self {
        Self::new(
            conversation,
            TaskPayload::Photo {
                image,
                caption: caption.into(),
            },
        )
    }

    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }

    pub fn with_reply_to(mut self, message: i64) -> Self {
        self.reply_to = Some(message);
        self
    }

    pub fn with_status(mut self, ticket: StatusTicket) -> Self {
        self.status = Some(ticket);
        self
    }

    pub fn with_icon(mut self, ticket: StatusTicket) -> Self {
        self.icon = Some(ticket);
        self
    }
}
