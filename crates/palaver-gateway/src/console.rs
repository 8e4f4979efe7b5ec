//! Console implementation of the delivery collaborator.
//!
//! Stands in for the real chat transport: answers go to stdout, progress
//! indicators become dim status lines on stderr. Status tickets are plain
//! counters; "removing" one is a no-op beyond logging, since a terminal
//! has no editable messages.

use std::sync::atomic::{AtomicI64, Ordering};

use tracing::debug;

use palaver_core::collab::{AudioClip, Messenger};
use palaver_types::chat::ConversationId;
use palaver_types::error::DeliveryError;
use palaver_types::task::StatusTicket;

#[derive(Default)]
pub struct ConsoleMessenger {
    next_message: AtomicI64,
}

impl Messenger for ConsoleMessenger {
    async fn deliver_text(
        &self,
        _conversation: ConversationId,
        text: &str,
        _reply_to: Option<i64>,
    ) -> Result<(), DeliveryError> {
        println!("{text}");
        Ok(())
    }

    async fn deliver_audio(
        &self,
        _conversation: ConversationId,
        clip: &AudioClip,
        _reply_to: Option<i64>,
    ) -> Result<(), DeliveryError> {
        println!("[audio answer: {} bytes, {}]", clip.data.len(), clip.mime);
        Ok(())
    }

    async fn post_status(
        &self,
        conversation: ConversationId,
        text: &str,
    ) -> Result<StatusTicket, DeliveryError> {
        eprintln!("  .. {text}");
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
        eprintln!("  .. {text}");
        Ok(())
    }

    async fn remove_status(&self, ticket: &StatusTicket) -> Result<(), DeliveryError> {
        debug!(message = ticket.message, "status message retired");
        Ok(())
    }
}
