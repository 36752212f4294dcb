//! Provider registry: builds adapters from configuration.

use std::sync::Arc;

use tracing::warn;

use ai_client::{Anthropic, OpenAi, ProviderAdapter};
use brandpulse_common::Config;

/// Model for best-effort fallback lookups when the primary structured call
/// fails.
const FALLBACK_MODEL: &str = "gpt-4o-mini";

/// Adapters used to answer tracked prompts, in configured order.
pub fn answer_providers(config: &Config) -> Vec<Arc<dyn ProviderAdapter>> {
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    for key in &config.providers {
        match key.as_str() {
            "anthropic" => {
                adapters.push(Arc::new(Anthropic::new(
                    &config.anthropic_api_key,
                    &config.anthropic_model,
                )));
            }
            "openai" => {
                if config.openai_api_key.is_empty() {
                    warn!("OPENAI_API_KEY not set, skipping openai provider");
                } else {
                    adapters.push(Arc::new(OpenAi::new(
                        &config.openai_api_key,
                        &config.openai_model,
                    )));
                }
            }
            other => warn!(provider = other, "Unknown provider key, skipping"),
        }
    }

    adapters
}

/// Adapter for structured calls (mention extraction, sentiment, resolver).
/// Web search is off: these calls analyze text we already have.
pub fn extraction_adapter(config: &Config) -> Arc<dyn ProviderAdapter> {
    Arc::new(
        Anthropic::new(&config.anthropic_api_key, &config.anthropic_model).with_web_search(false),
    )
}

/// Secondary adapter for the resolver's best-effort fallback path.
pub fn fallback_adapter(config: &Config) -> Option<Arc<dyn ProviderAdapter>> {
    if config.openai_api_key.is_empty() {
        return None;
    }
    Some(Arc::new(
        OpenAi::new(&config.openai_api_key, FALLBACK_MODEL).with_web_search(false),
    ))
}
