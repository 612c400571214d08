//! Model Registry
//!
//! Fixed mapping from the short model keys a user picks to the provider
//! model metadata sent with each generation request.

use serde::Serialize;

use crate::error::BuilderError;

/// Metadata for one selectable model
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Short key used for selection (e.g. `"gpt-3.5-turbo"`)
    pub key: &'static str,
    /// Provider model identifier sent to the endpoint
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Context window size label
    pub context: &'static str,
    /// Whether the model is free to use
    pub is_free: bool,
    /// Maximum completion tokens
    pub max_tokens: u32,
}

const MODELS: &[ModelInfo] = &[
    ModelInfo {
        key: "gpt-3.5-turbo",
        id: "openai/gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
        description: "Fast and inexpensive, good for simple pages",
        context: "16K",
        is_free: true,
        max_tokens: 4096,
    },
    ModelInfo {
        key: "gpt-4o-mini",
        id: "openai/gpt-4o-mini",
        name: "GPT-4o mini",
        description: "Small multimodal model with strong HTML output",
        context: "128K",
        is_free: true,
        max_tokens: 16_384,
    },
    ModelInfo {
        key: "gpt-4o",
        id: "openai/gpt-4o",
        name: "GPT-4o",
        description: "High quality layouts and copy",
        context: "128K",
        is_free: false,
        max_tokens: 16_384,
    },
    ModelInfo {
        key: "claude-3-haiku",
        id: "anthropic/claude-3-haiku",
        name: "Claude 3 Haiku",
        description: "Quick responses with clean markup",
        context: "200K",
        is_free: false,
        max_tokens: 4096,
    },
    ModelInfo {
        key: "claude-3.5-sonnet",
        id: "anthropic/claude-3.5-sonnet",
        name: "Claude 3.5 Sonnet",
        description: "Detailed, polished multi-section sites",
        context: "200K",
        is_free: false,
        max_tokens: 8192,
    },
    ModelInfo {
        key: "llama-3.1-8b",
        id: "meta-llama/llama-3.1-8b-instruct",
        name: "Llama 3.1 8B",
        description: "Open model, free tier",
        context: "128K",
        is_free: true,
        max_tokens: 4096,
    },
];

/// Key selected when nothing else is configured
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// All selectable models
#[must_use]
pub fn all_models() -> &'static [ModelInfo] {
    MODELS
}

/// Look up a model by short key
#[must_use]
pub fn find_model(key: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.key == key)
}

/// Look up a model by short key, failing with [`BuilderError::ModelUnavailable`]
pub fn resolve_model(key: &str) -> Result<&'static ModelInfo, BuilderError> {
    find_model(key).ok_or_else(|| BuilderError::ModelUnavailable(key.to_string()))
}
