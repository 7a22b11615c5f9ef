//! Model registry for managing available LLM providers

#![allow(dead_code)] // with_service() used in tests

use super::{GeminiService, GroqService, LlmService, LoggingService};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Preferred provider: "gemini" or "groq"
    pub provider: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub groq_api_key: Option<String>,
    pub groq_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            provider: std::env::var("CONCIERGE_LLM_PROVIDER").ok(),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            gemini_model: std::env::var("GEMINI_MODEL").ok(),
            groq_api_key: std::env::var("GROQ_API_KEY").ok(),
            groq_model: std::env::var("GROQ_MODEL").ok(),
        }
    }
}

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();
        let mut gemini_id = None;
        let mut groq_id = None;

        if let Some(key) = config
            .gemini_api_key
            .as_ref()
            .filter(|k| !k.is_empty())
        {
            let model = config
                .gemini_model
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
            let service = Arc::new(GeminiService::new(key.clone(), model.clone()));
            services.insert(model.clone(), Arc::new(LoggingService::new(service)));
            gemini_id = Some(model);
        }

        if let Some(key) = config.groq_api_key.as_ref().filter(|k| !k.is_empty()) {
            let model = config
                .groq_model
                .clone()
                .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string());
            let service = Arc::new(GroqService::new(key.clone(), model.clone()));
            services.insert(model.clone(), Arc::new(LoggingService::new(service)));
            groq_id = Some(model);
        }

        // Honor the configured provider preference, then fall back to
        // whichever provider has a key
        let default_model = match config.provider.as_deref() {
            Some("gemini") => gemini_id.clone().or_else(|| groq_id.clone()),
            Some("groq") | None => groq_id.clone().or_else(|| gemini_id.clone()),
            Some(other) => {
                tracing::warn!(provider = %other, "Unknown LLM provider, falling back");
                groq_id.clone().or_else(|| gemini_id.clone())
            }
        }
        .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Create a registry around one preconstructed service (for tests)
    pub fn with_service(model_id: impl Into<String>, service: Arc<dyn LlmService>) -> Self {
        let model_id = model_id.into();
        let mut services = HashMap::new();
        services.insert(model_id.clone(), service);
        Self {
            services,
            default_model: model_id,
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    /// Get the default model ID
    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Check if any models are available
    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}
