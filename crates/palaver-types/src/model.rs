//! Model catalog types for Palaver.
//!
//! Each backend model belongs to exactly one [`ModelFamily`]; the family is
//! a closed enum so routing is checked at compile time rather than through
//! string matching. A [`ModelRef`] is a self-contained snapshot (id, family,
//! context budget) that conversations copy at selection time.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Backend family a model is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Gemini,
    Gemma,
    OpenRouter,
    Groq,
}

impl ModelFamily {
    /// All known families, in routing order.
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::Gemini,
        ModelFamily::Gemma,
        ModelFamily::OpenRouter,
        ModelFamily::Groq,
    ];
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Gemini => write!(f, "gemini"),
            ModelFamily::Gemma => write!(f, "gemma"),
            ModelFamily::OpenRouter => write!(f, "open_router"),
            ModelFamily::Groq => write!(f, "groq"),
        }
    }
}

impl FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(ModelFamily::Gemini),
            "gemma" => Ok(ModelFamily::Gemma),
            "open_router" | "openrouter" => Ok(ModelFamily::OpenRouter),
            "groq" => Ok(ModelFamily::Groq),
            other => Err(format!("invalid model family: '{other}'")),
        }
    }
}

/// A self-contained model snapshot.
///
/// Conversations store a copy of this, not an index into the catalog, so a
/// catalog reload never changes the budget of an in-flight conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Provider-facing model identifier (e.g. "gemini-2.5-flash-lite").
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Backend family serving this model.
    pub family: ModelFamily,
    /// Maximum estimated tokens the model accepts for history + request.
    pub context_tokens: u32,
}

impl ModelRef {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        family: ModelFamily,
        context_tokens: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            family,
            context_tokens,
        }
    }
}

/// Errors raised when assembling or querying a model catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog has no model with id '{0}' to use as default")]
    UnknownDefault(String),

    #[error("unknown model id '{0}'")]
    UnknownModel(String),

    #[error("catalog is empty")]
    Empty,
}

/// Id-indexed collection of known models plus a default selection.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelRef>,
    default_id: String,
}

impl ModelCatalog {
    /// Build a catalog from a model list and a default id.
    pub fn new(models: Vec<ModelRef>, default_id: &str) -> Result<Self, CatalogError> {
        if models.is_empty() {
            return Err(CatalogError::Empty);
        }
        if !models.iter().any(|m| m.id == default_id) {
            return Err(CatalogError::UnknownDefault(default_id.to_string()));
        }
        Ok(Self {
            models,
            default_id: default_id.to_string(),
        })
    }

    /// The built-in catalog of supported models.
    pub fn builtin() -> Self {
        let models = vec![
            ModelRef::new("gemini-2.5-pro", "Gemini 2.5 Pro", ModelFamily::Gemini, 1_048_576),
            ModelRef::new("gemini-2.5-flash", "Gemini 2.5 Flash", ModelFamily::Gemini, 1_048_576),
            ModelRef::new(
                "gemini-2.5-flash-lite",
                "Gemini 2.5 Flash-Lite",
                ModelFamily::Gemini,
                1_048_576,
            ),
            ModelRef::new("gemini-2.0-flash", "Gemini 2.0 Flash", ModelFamily::Gemini, 1_048_576),
            ModelRef::new("gemma-3-27b-it", "Gemma 3 27B IT", ModelFamily::Gemma, 131_072),
            ModelRef::new("gemma-3-12b-it", "Gemma 3 12B IT", ModelFamily::Gemma, 32_768),
            ModelRef::new("gemma-3-4b-it", "Gemma 3 4B IT", ModelFamily::Gemma, 32_768),
            ModelRef::new(
                "qwen/qwen3-235b-a22b:free",
                "Qwen3 235B A22B (Free)",
                ModelFamily::OpenRouter,
                131_072,
            ),
            ModelRef::new(
                "deepseek/deepseek-chat-v3-0324:free",
                "DeepSeek V3 0324 (Free)",
                ModelFamily::OpenRouter,
                163_840,
            ),
            ModelRef::new(
                "mistralai/mistral-small-3.2-24b-instruct:free",
                "Mistral Small 3.2 24B Instruct (Free)",
                ModelFamily::OpenRouter,
                131_072,
            ),
            ModelRef::new("openai/gpt-oss-120b", "OpenAI GPT-OSS 120B", ModelFamily::Groq, 131_072),
            ModelRef::new("openai/gpt-oss-20b", "OpenAI GPT-OSS 20B", ModelFamily::Groq, 131_072),
            ModelRef::new(
                "deepseek-r1-distill-llama-70b",
                "DeepSeek R1 Distill Llama 70B",
                ModelFamily::Groq,
                131_072,
            ),
        ];
        Self {
            models,
            default_id: "gemini-2.5-flash-lite".to_string(),
        }
    }

    /// Look up a model by id. Unknown ids yield `None`; the caller surfaces
    /// the failure rather than substituting a default.
    pub fn get(&self, id: &str) -> Option<&ModelRef> {
        self.models.iter().find(|m| m.id == id)
    }

    /// The catalog's default model.
    pub fn default_model(&self) -> &ModelRef {
        self.models
            .iter()
            .find(|m| m.id == self.default_id)
            .unwrap_or(&self.models[0])
    }

    /// Iterate over all models in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelRef> {
        self.models.iter()
    }

    /// Number of models in the catalog.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Extend the catalog with additional models (config-supplied entries).
    ///
    /// An entry whose id collides with an existing model replaces it.
    pub fn extend(&mut self, extra: impl IntoIterator<Item = ModelRef>) {
        for model in extra {
            if let Some(existing) = self.models.iter_mut().find(|m| m.id == model.id) {
                *existing = model;
            } else {
                self.models.push(model);
            }
        }
    }
}
