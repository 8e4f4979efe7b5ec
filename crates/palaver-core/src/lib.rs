//! The Palaver engine: session concurrency and context-window management.
//!
//! This crate holds the parts with real invariants: the per-conversation
//! [`context::ContextStore`], the token-budget truncator in [`llm::budget`],
//! the family-dispatching [`llm::router::ModelRouter`], and the fixed-size
//! [`pipeline`] worker pool that runs each inbound task end-to-end.
//!
//! External collaborators (transcription, generation, synthesis, delivery)
//! are consumed through the traits in [`collab`] and [`llm::generate`];
//! their implementations live in `palaver-infra` and the gateway.

pub mod collab;
pub mod context;
pub mod engine;
pub mod llm;
pub mod pipeline;
