//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! These follow the OTel GenAI Semantic Conventions specification for
//! consistent instrumentation of model calls across the relay. All
//! constants are string slices usable in `tracing::span!` and
//! `tracing::info_span!` field names.
//!
//! Span naming convention: `"{operation} {model}"` (e.g.,
//! `"chat gemini-2.5-flash-lite"`)

// --- Required attributes ---

/// The name of the operation being performed (e.g., "chat", "transcribe").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "google").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The model ID requested (e.g., "gemini-2.5-flash-lite").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The estimated number of input tokens sent (length heuristic, not the
/// provider's own count).
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The estimated number of output tokens received.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The conversation this call belongs to.
pub const GEN_AI_CONVERSATION_ID: &str = "gen_ai.conversation.id";

// --- Operation name values ---

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

/// Speech-to-text transcription of an inbound voice message.
pub const OP_TRANSCRIBE: &str = "transcribe";

/// Text-to-speech synthesis of an outbound answer.
pub const OP_SYNTHESIZE_SPEECH: &str = "synthesize_speech";

// --- Provider name values ---

/// Google endpoint (serves the Gemini and Gemma families, plus speech).
pub const PROVIDER_GOOGLE: &str = "google";

/// OpenRouter endpoint.
pub const PROVIDER_OPENROUTER: &str = "openrouter";

/// Groq endpoint.
pub const PROVIDER_GROQ: &str = "groq";
