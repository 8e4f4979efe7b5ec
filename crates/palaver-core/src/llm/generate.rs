//! Generator trait definition and its object-safe wrapper.
//!
//! `Generator` uses RPITIT (Rust 2024 edition) and therefore cannot be a
//! trait object directly. [`BoxGenerator`] follows the usual three-step
//! pattern: an object-safe `GeneratorDyn` trait with boxed futures, a
//! blanket impl for all `Generator`s, and a wrapper that delegates.
//!
//! Implementations live in `palaver-infra` (one per backend endpoint).

use std::future::Future;
use std::pin::Pin;

use palaver_types::chat::Turn;
use palaver_types::error::GenerateError;

/// One generation call: the already-truncated window plus the new message.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Provider-facing model id (from the conversation's model snapshot).
    pub model_id: String,
    /// Truncated history, oldest first.
    pub history: Vec<Turn>,
    /// The new user message.
    pub text: String,
    /// Attached image bytes, if the message carried a photo.
    pub image: Option<Vec<u8>>,
    /// Persona instructions prepended as the system message.
    pub system_instructions: Option<String>,
}

/// Trait for generation backends.
///
/// A generator accepts the truncated window and the new message and
/// returns the raw textual answer. It never sees the context store; the
/// pipeline owns all history bookkeeping.
pub trait Generator: Send + Sync {
    /// Backend name for logs (e.g. "google", "openrouter").
    fn name(&self) -> &str;

    /// Produce an answer for the request.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, GenerateError>> + Send;
}

/// Object-safe version of [`Generator`] with boxed futures.
///
/// Exists solely to enable dynamic dispatch; a blanket implementation
/// covers every `Generator`.
pub trait GeneratorDyn: Send + Sync {
    fn name(&self) -> &str;

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerateError>> + Send + 'a>>;
}

impl<T: Generator> GeneratorDyn for T {
    fn name(&self) -> &str {
        Generator::name(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerateError>> + Send + 'a>> {
        Box::pin(self.generate(request))
    }
}

/// Type-erased generator, selected at runtime by the router.
pub struct BoxGenerator {
    inner: Box<dyn GeneratorDyn + Send + Sync>,
}

impl std::fmt::Debug for BoxGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxGenerator")
            .field("name", &self.inner.name())
            .finish()
    }
}

impl BoxGenerator {
    /// Wrap a concrete generator in a type-erased box.
    pub fn new<T: Generator + 'static>(generator: T) -> Self {
        Self {
            inner: Box::new(generator),
        }
    }

    /// Backend name for logs.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Produce an answer for the request.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        self.inner.generate_boxed(request).await
    }
}
