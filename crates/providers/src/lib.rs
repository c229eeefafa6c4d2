//! Language model provider implementations for helpdesk.
//!
//! Currently one backend: [`OpenAiProvider`], which speaks the
//! OpenAI-compatible chat completions API (OpenAI, OpenRouter, Ollama,
//! vLLM, and friends). The rest of the system only sees the
//! `LanguageModel` trait from `helpdesk-core`.

pub mod openai;

pub use openai::OpenAiProvider;

use helpdesk_core::LanguageModel;
use std::sync::Arc;

/// Build the configured provider.
pub fn build_from_config(config: &helpdesk_config::AppConfig) -> Arc<dyn LanguageModel> {
    let api_key = config.provider.api_key.clone().unwrap_or_default();
    Arc::new(
        OpenAiProvider::new(&config.provider.api_url, api_key)
            .with_models(&config.provider.model, &config.provider.router_model)
            .with_temperature(config.provider.temperature)
            .with_max_tokens(config.provider.max_tokens),
    )
}
