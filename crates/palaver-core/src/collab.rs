//! Collaborator traits: the external services the pipeline drives.
//!
//! Transcription, synthesis, and delivery are black boxes to the core --
//! slow remote calls with a latency and a failure mode. Each is consumed
//! through one narrow trait; the engine is generic over all three, so the
//! gateway can plug in HTTP-backed implementations and tests can plug in
//! recording stubs.

use std::future::Future;
use std::sync::Arc;

use palaver_types::chat::ConversationId;
use palaver_types::error::{DeliveryError, SpeechError, TranscribeError};
use palaver_types::task::StatusTicket;

/// A blob of synthesized audio, ready for delivery.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub mime: String,
}

/// Speech-to-text collaborator. May take seconds; no streaming.
pub trait Transcriber: Send + Sync {
    fn transcribe(
        &self,
        audio: &[u8],
        model_hint: Option<&str>,
    ) -> impl Future<Output = Result<String, TranscribeError>> + Send;
}

/// Text-to-speech collaborator.
pub trait Synthesizer: Send + Sync {
    fn synthesize(
        &self,
        text: &str,
        voice_hint: Option<&str>,
    ) -> impl Future<Output = Result<AudioClip, SpeechError>> + Send;
}

impl<T: Transcriber> Transcriber for Arc<T> {
    fn transcribe(
        &self,
        audio: &[u8],
        model_hint: Option<&str>,
    ) -> impl Future<Output = Result<String, TranscribeError>> + Send {
        T::transcribe(self, audio, model_hint)
    }
}

impl<S: Synthesizer> Synthesizer for Arc<S> {
    fn synthesize(
        &self,
        text: &str,
        voice_hint: Option<&str>,
    ) -> impl Future<Output = Result<AudioClip, SpeechError>> + Send {
        S::synthesize(self, text, voice_hint)
    }
}

/// Delivery collaborator: the user-facing channel.
///
/// Besides final answers it owns the progress indicators: a status message
/// is posted once, then edited across stage transitions by the single
/// worker that owns the task.
pub trait Messenger: Send + Sync {
    /// Deliver the final text answer, optionally as a reply.
    fn deliver_text(
        &self,
        conversation: ConversationId,
        text: &str,
        reply_to: Option<i64>,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    /// Deliver a synthesized audio answer, optionally as a reply.
    fn deliver_audio(
        &self,
        conversation: ConversationId,
        clip: &AudioClip,
        reply_to: Option<i64>,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    /// Post a new progress message and return its handle.
    fn post_status(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> impl Future<Output = Result<StatusTicket, DeliveryError>> + Send;

    /// Edit an existing progress message.
    fn update_status(
        &self,
        ticket: &StatusTicket,
        text: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    /// Remove a progress message. Implementations should tolerate the
    /// message already being gone.
    fn remove_status(
        &self,
        ticket: &StatusTicket,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

impl<M: Messenger> Messenger for Arc<M> {
    fn deliver_text(
        &self,
        conversation: ConversationId,
        text: &str,
        reply_to: Option<i64>,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        M::deliver_text(self, conversation, text, reply_to)
    }

    fn deliver_audio(
        &self,
        conversation: ConversationId,
        clip: &AudioClip,
        reply_to: Option<i64>,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        M::deliver_audio(self, conversation, clip, reply_to)
    }

    fn post_status(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> impl Future<Output = Result<StatusTicket, DeliveryError>> + Send {
        M::post_status(self, conversation, text)
    }

    fn update_status(
        &self,
        ticket: &StatusTicket,
        text: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        M::update_status(self, ticket, text)
    }

    fn remove_status(
        &self,
        ticket: &StatusTicket,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        M::remove_status(self, ticket)
    }
}
