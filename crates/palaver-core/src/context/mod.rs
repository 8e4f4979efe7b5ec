//! Per-conversation state: history, settings, and windowed reads.

pub mod store;

pub use store::{ContextStore, StoreDefaults};
