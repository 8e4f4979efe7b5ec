//! Conversation and turn types for Palaver.
//!
//! A conversation is one user-facing chat context, identified by a stable
//! transport id. Its history is an ordered sequence of immutable turns;
//! what a model actually sees is a windowed view of that history governed
//! by `max_history` and `context_ttl`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::model::ModelRef;

/// Default number of turns kept visible in the context window.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Default lifetime of a turn inside the context window, in seconds.
pub const DEFAULT_CONTEXT_TTL_SECS: i64 = 12_000;

/// Stable identifier of one user-facing conversation.
///
/// Transports hand these out (e.g. a chat id); the relay treats them as
/// opaque keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        ConversationId(id)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Model,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Model => write!(f, "model"),
        }
    }
}

impl FromStr for Speaker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Speaker::User),
            "model" => Ok(Speaker::Model),
            other => Err(format!("invalid speaker: '{other}'")),
        }
    }
}

/// One message stored in a conversation's history.
///
/// Immutable once created; only ever removed by eviction, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a turn stamped with the current time.
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether this turn is still inside the TTL window at `now`.
    ///
    /// The boundary is exclusive: a turn whose age equals `ttl` exactly is
    /// already out of the window.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at < ttl
    }
}

/// Per-conversation settings.
///
/// `model` is a snapshot copied in at selection time, so later catalog
/// changes never retroactively alter an in-flight conversation's budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSettings {
    pub max_history: usize,
    pub context_ttl_secs: i64,
    pub voice_mode: bool,
    pub model: ModelRef,
}

impl ConversationSettings {
    /// Default settings around the given model snapshot.
    pub fn new(model: ModelRef) -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            context_ttl_secs: DEFAULT_CONTEXT_TTL_SECS,
            voice_mode: false,
            model,
        }
    }

    /// The context TTL as a duration.
    pub fn context_ttl(&self) -> Duration {
        Duration::seconds(self.context_ttl_secs)
    }
}
