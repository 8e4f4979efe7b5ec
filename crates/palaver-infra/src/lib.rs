//! Infrastructure layer for Palaver.
//!
//! Concrete implementations of the collaborator traits defined in
//! `palaver-core`: OpenAI-compatible chat generators for the Google,
//! OpenRouter, and Groq endpoints, Google speech transcription and
//! synthesis over reqwest, plus the TOML configuration loader.

pub mod config;
pub mod llm;
pub mod speech;
