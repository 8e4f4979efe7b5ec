//! Shared domain types for Palaver.
//!
//! This crate contains the core domain types used across the Palaver relay:
//! conversations and turns, the model catalog, task shapes, the error
//! taxonomy, and configuration types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod model;
pub mod task;
