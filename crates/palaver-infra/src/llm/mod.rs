//! Generation backends.
//!
//! One [`openai_compat::OpenAiChatGenerator`] type serves every backend
//! the relay routes to -- the Google OpenAI-compatible endpoint (Gemini
//! and Gemma families), OpenRouter, and Groq -- via configurable base
//! URLs. [`build_router`] wires whichever endpoints have keys available.

pub mod openai_compat;

use secrecy::SecretString;
use tracing::{debug, warn};

use palaver_core::llm::generate::BoxGenerator;
use palaver_core::llm::router::ModelRouter;
use palaver_types::config::{ProviderSettings, ProvidersConfig};
use palaver_types::model::ModelFamily;

use self::openai_compat::OpenAiChatGenerator;

/// Build the model router from provider settings.
///
/// A family whose endpoint is disabled or has no API key in the
/// environment simply gets no backend; routing to it later surfaces
/// `UnsupportedModel` instead of failing at startup.
pub fn build_router(providers: &ProvidersConfig) -> ModelRouter {
    let mut router = ModelRouter::new();

    if let Some(key) = resolve_key(&providers.google) {
        let google = OpenAiChatGenerator::google(&key, providers.google.base_url.as_deref());
        // The Google endpoint serves both the Gemini and Gemma families.
        router.register(ModelFamily::Gemini, BoxGenerator::new(google.clone()));
        router.register(ModelFamily::Gemma, BoxGenerator::new(google));
    }

    if let Some(key) = resolve_key(&providers.openrouter) {
        let openrouter =
            OpenAiChatGenerator::openrouter(&key, providers.openrouter.base_url.as_deref());
        router.register(ModelFamily::OpenRouter, BoxGenerator::new(openrouter));
    }

    if let Some(key) = resolve_key(&providers.groq) {
        let groq = OpenAiChatGenerator::groq(&key, providers.groq.base_url.as_deref());
        router.register(ModelFamily::Groq, BoxGenerator::new(groq));
    }

    router
}

/// Resolve an endpoint's API key from the environment.
fn resolve_key(settings: &ProviderSettings) -> Option<SecretString> {
    if !settings.enabled {
        debug!(env = %settings.api_key_env, "endpoint disabled in config");
        return None;
    }
    match std::env::var(&settings.api_key_env) {
        Ok(key) if !key.is_empty() => Some(SecretString::from(key)),
        _ => {
            warn!(
                env = %settings.api_key_env,
                "api key not set; endpoint will be unavailable"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(env: &str, enabled: bool) -> ProviderSettings {
        ProviderSettings {
            api_key_env: env.to_string(),
            base_url: None,
            enabled,
        }
    }

    #[test]
    fn resolve_key_reads_environment() {
        unsafe { std::env::set_var("PALAVER_TEST_KEY_SET", "sk-test") };
        assert!(resolve_key(&settings("PALAVER_TEST_KEY_SET", true)).is_some());
        assert!(resolve_key(&settings("PALAVER_TEST_KEY_UNSET", true)).is_none());
    }

    #[test]
    fn resolve_key_respects_disabled_flag() {
        unsafe { std::env::set_var("PALAVER_TEST_KEY_DISABLED", "sk-test") };
        assert!(resolve_key(&settings("PALAVER_TEST_KEY_DISABLED", false)).is_none());
    }

    #[test]
    fn build_router_registers_google_for_both_families() {
        unsafe { std::env::set_var("PALAVER_TEST_GOOGLE_KEY", "sk-test") };
        let providers = ProvidersConfig {
            google: settings("PALAVER_TEST_GOOGLE_KEY", true),
            openrouter: settings("PALAVER_TEST_NO_SUCH_KEY", true),
            groq: settings("PALAVER_TEST_NO_SUCH_KEY", true),
        };

        let router = build_router(&providers);
        assert_eq!(
            router.supported(),
            vec![ModelFamily::Gemini, ModelFamily::Gemma]
        );
    }
}
