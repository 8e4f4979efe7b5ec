//! Family-based dispatch to generation backends.
//!
//! The router is pure dispatch: one optional [`BoxGenerator`] slot per
//! [`ModelFamily`]. The family enum is closed, so adding a family is a
//! compile-time change; a family whose slot is empty yields
//! `UnsupportedModel` at route time -- never a silent fallback.

use tracing::debug;

use palaver_types::error::TaskError;
use palaver_types::model::ModelFamily;

use super::generate::BoxGenerator;

/// Dispatch table from model family to its generation backend.
#[derive(Default)]
pub struct ModelRouter {
    gemini: Option<BoxGenerator>,
    gemma: Option<BoxGenerator>,
    open_router: Option<BoxGenerator>,
    groq: Option<BoxGenerator>,
}

impl ModelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend for a family (builder style).
    pub fn with_family(mut self, family: ModelFamily, generator: BoxGenerator) -> Self {
        self.register(family, generator);
        self
    }

    /// Register a backend for a family, replacing any existing one.
    pub fn register(&mut self, family: ModelFamily, generator: BoxGenerator) {
        debug!(family = %family, backend = generator.name(), "registered generation backend");
        *self.slot_mut(family) = Some(generator);
    }

    fn slot(&self, family: ModelFamily) -> &Option<BoxGenerator> {
        match family {
            ModelFamily::Gemini => &self.gemini,
            ModelFamily::Gemma => &self.gemma,
            ModelFamily::OpenRouter => &self.open_router,
            ModelFamily::Groq => &self.groq,
        }
    }

    fn slot_mut(&mut self, family: ModelFamily) -> &mut Option<BoxGenerator> {
        match family {
            ModelFamily::Gemini => &mut self.gemini,
            ModelFamily::Gemma => &mut self.gemma,
            ModelFamily::OpenRouter => &mut self.open_router,
            ModelFamily::Groq => &mut self.groq,
        }
    }

    /// The backend serving `family`.
    ///
    /// A family with no configured backend is a configuration error
    /// surfaced to the caller; the conversation's model is not reset.
    pub fn route(&self, family: ModelFamily) -> Result<&BoxGenerator, TaskError> {
        self.slot(family)
            .as_ref()
            .ok_or(TaskError::UnsupportedModel(family))
    }

    /// Families that currently have a backend.
    pub fn supported(&self) -> Vec<ModelFamily> {
        ModelFamily::ALL
            .into_iter()
            .filter(|family| self.slot(*family).is_some())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::generate::{GenerationRequest, Generator};
    use palaver_types::error::GenerateError;

    struct NamedGenerator(&'static str);

    impl Generator for NamedGenerator {
        fn name(&self) -> &str {
            self.0
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerateError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn route_unregistered_family_errors() {
        let router = ModelRouter::new();
        let err = router.route(ModelFamily::Groq).unwrap_err();
        assert!(matches!(err, TaskError::UnsupportedModel(ModelFamily::Groq)));
    }

    #[test]
    fn route_returns_registered_backend() {
        let router = ModelRouter::new()
            .with_family(ModelFamily::Gemini, BoxGenerator::new(NamedGenerator("google")))
            .with_family(ModelFamily::Groq, BoxGenerator::new(NamedGenerator("groq")));

        assert_eq!(router.route(ModelFamily::Gemini).unwrap().name(), "google");
        assert_eq!(router.route(ModelFamily::Groq).unwrap().name(), "groq");
        assert!(router.route(ModelFamily::Gemma).is_err());
    }

    #[test]
    fn supported_lists_registered_families() {
        let router = ModelRouter::new()
            .with_family(ModelFamily::Gemma, BoxGenerator::new(NamedGenerator("google")));
        assert_eq!(router.supported(), vec![ModelFamily::Gemma]);
    }

    #[test]
    fn register_replaces_existing_backend() {
        let mut router = ModelRouter::new();
        router.register(ModelFamily::Gemini, BoxGenerator::new(NamedGenerator("old")));
        router.register(ModelFamily::Gemini, BoxGenerator::new(NamedGenerator("new")));
        assert_eq!(router.route(ModelFamily::Gemini).unwrap().name(), "new");
    }
}
