//! Error taxonomy for the relay core.
//!
//! Collaborator failures each get their own enum; [`TaskError`] is the
//! pipeline-level wrapper caught at the task boundary. All failures are
//! local to their task -- nothing here is retried automatically.

use thiserror::Error;

use crate::model::ModelFamily;

/// The new message alone exceeds the model's context budget.
///
/// Never retried or auto-corrected; the message text is shown to the user
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("your request (~{estimated} tokens) exceeds the model's context window of {limit} tokens")]
pub struct OversizedRequest {
    pub estimated: u32,
    pub limit: u32,
}

/// Failures from the speech-to-text collaborator.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("malformed transcription response: {0}")]
    MalformedResponse(String),

    #[error("transcription request failed: {0}")]
    Request(String),
}

/// Failures from a generation backend.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("generation request failed: {0}")]
    Request(String),
}

/// Failures from the text-to-speech collaborator.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("synthesis endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("malformed synthesis response: {0}")]
    MalformedResponse(String),

    #[error("synthesis request failed: {0}")]
    Request(String),

    #[error("synthesis produced no audio")]
    EmptyAudio,
}

/// Failures from the delivery collaborator.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery failed: {0}")]
    Send(String),
}

/// Pipeline-level failure, caught at the task boundary.
///
/// A worker logs the full error, makes a best-effort status edit with
/// [`TaskError::user_notice`], and moves on to the next task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Oversized(#[from] OversizedRequest),

    #[error("no backend configured for model family '{0}'")]
    UnsupportedModel(ModelFamily),

    #[error("transcription failed: {0}")]
    Transcription(#[from] TranscribeError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerateError),

    #[error("speech synthesis failed: {0}")]
    Synthesis(#[from] SpeechError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl TaskError {
    /// The short user-facing notice for this failure.
    ///
    /// Oversized requests are surfaced verbatim; collaborator failures get
    /// a generic one-liner (the detail goes to the logs, not the chat).
    pub fn user_notice(&self) -> String {
        match self {
            TaskError::Oversized(err) => err.to_string(),
            TaskError::UnsupportedModel(family) => {
                format!("The selected model family '{family}' has no configured backend.")
            }
            TaskError::Transcription(_) => "Could not transcribe your voice message.".to_string(),
            TaskError::Generation(_) => "The model failed to produce an answer.".to_string(),
            TaskError::Synthesis(_) => "The spoken version could not be generated.".to_string(),
            TaskError::Delivery(_) => "Your answer could not be delivered.".to_string(),
        }
    }
}
