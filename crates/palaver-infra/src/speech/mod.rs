//! Speech collaborators: Google transcription and synthesis.

pub mod synthesize;
pub mod transcribe;
mod types;

pub use synthesize::GoogleSynthesizer;
pub use transcribe::GoogleTranscriber;
