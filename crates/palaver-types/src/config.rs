//! Configuration types for Palaver.
//!
//! [`GatewayConfig`] models the top-level `config.toml` consumed by the
//! surrounding application: pool size, context defaults, provider
//! endpoints, speech models, and an optional persona. Every field has a
//! default so an absent or partial file still yields a working setup.

use serde::{Deserialize, Serialize};

use crate::chat::{DEFAULT_CONTEXT_TTL_SECS, DEFAULT_MAX_HISTORY};
use crate::model::ModelRef;

/// Engine knobs: the worker pool and context-window defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed worker count, set at startup for the process lifetime.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Default context depth for new conversations.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Default context TTL (seconds) for new conversations.
    #[serde(default = "default_context_ttl_secs")]
    pub context_ttl_secs: i64,

    /// Catalog id of the model new conversations start with.
    /// `None` uses the catalog's own default.
    #[serde(default)]
    pub default_model: Option<String>,
}

fn default_workers() -> usize {
    2
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_context_ttl_secs() -> i64 {
    DEFAULT_CONTEXT_TTL_SECS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_history: default_max_history(),
            context_ttl_secs: default_context_ttl_secs(),
            default_model: None,
        }
    }
}

/// One provider endpoint: where the key comes from and whether it is on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Override the endpoint base URL (testing, proxies).
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProviderSettings {
    fn with_env(api_key_env: &str) -> Self {
        Self {
            api_key_env: api_key_env.to_string(),
            base_url: None,
            enabled: true,
        }
    }
}

/// Provider endpoints, one per backend the router can reach.
///
/// The Google endpoint serves both the Gemini and Gemma families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_google")]
    pub google: ProviderSettings,

    #[serde(default = "default_openrouter")]
    pub openrouter: ProviderSettings,

    #[serde(default = "default_groq")]
    pub groq: ProviderSettings,
}

fn default_google() -> ProviderSettings {
    ProviderSettings::with_env("GOOGLE_API_KEY")
}

fn default_openrouter() -> ProviderSettings {
    ProviderSettings::with_env("OPENROUTER_API_KEY")
}

fn default_groq() -> ProviderSettings {
    ProviderSettings::with_env("GROQ_API_KEY")
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            google: default_google(),
            openrouter: default_openrouter(),
            groq: default_groq(),
        }
    }
}

/// Speech collaborator settings: which models transcribe and synthesize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    #[serde(default = "default_transcription_prompt")]
    pub transcription_prompt: String,

    #[serde(default = "default_synthesis_model")]
    pub synthesis_model: String,

    /// Voice hint passed to the synthesizer.
    #[serde(default)]
    pub voice: Option<String>,
}

fn default_transcription_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_transcription_prompt() -> String {
    "Transcribe the speech, output the text only".to_string()
}

fn default_synthesis_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            transcription_model: default_transcription_model(),
            transcription_prompt: default_transcription_prompt(),
            synthesis_model: default_synthesis_model(),
            voice: None,
        }
    }
}

/// Optional persona prepended to every generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub instructions: Option<String>,
}

/// Top-level configuration for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub role: RoleConfig,

    /// Extra catalog entries merged over the built-in model table.
    #[serde(default)]
    pub models: Vec<ModelRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.workers, 2);
        assert_eq!(config.max_history, 100);
        assert_eq!(config.context_ttl_secs, 12_000);
        assert!(config.default_model.is_none());
    }

    #[test]
    fn test_gateway_config_from_empty_toml() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.providers.google.api_key_env, "GOOGLE_API_KEY");
        assert!(config.providers.google.enabled);
        assert_eq!(config.speech.synthesis_model, "gemini-2.5-flash-preview-tts");
        assert!(config.role.instructions.is_none());
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_gateway_config_partial_toml() {
        let toml_str = r#"
[engine]
workers = 4
default_model = "gemma-3-27b-it"

[providers.groq]
api_key_env = "MY_GROQ_KEY"
enabled = false

[role]
name = "Marvin"
instructions = "Answer gloomily."

[[models]]
id = "local-llm"
name = "Local LLM"
family = "groq"
context_tokens = 8192
"#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.workers, 4);
        assert_eq!(config.engine.default_model.as_deref(), Some("gemma-3-27b-it"));
        // Untouched sections keep their defaults
        assert_eq!(config.engine.max_history, 100);
        assert_eq!(config.providers.google.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.providers.groq.api_key_env, "MY_GROQ_KEY");
        assert!(!config.providers.groq.enabled);
        assert_eq!(config.role.name.as_deref(), Some("Marvin"));
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].id, "local-llm");
    }

    #[test]
    fn test_gateway_config_serde_roundtrip() {
        let config = GatewayConfig {
            engine: EngineConfig {
                workers: 8,
                ..EngineConfig::default()
            },
            ..GatewayConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.engine.workers, 8);
        assert_eq!(parsed.engine.max_history, 100);
    }
}
