mod client;
pub(crate) mod types;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{ProviderError, Result};
use crate::traits::{Answer, ProviderAdapter};

use client::AnthropicClient;
use types::{MessagesRequest, WireMessage};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Adapter for the Anthropic messages API.
///
/// Grounded answers enable the server-side web search tool so citation URLs
/// come back alongside the text. Structured extraction forces a single
/// tool call whose input schema is the response shape.
#[derive(Clone)]
pub struct Anthropic {
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    web_search: bool,
    base_url: Option<String>,
}

impl Anthropic {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
            max_tokens: 4096,
            web_search: true,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> AnthropicClient {
        let client = AnthropicClient::new(&self.api_key, DEFAULT_TIMEOUT);
        match &self.base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        }
    }
}

#[async_trait]
impl ProviderAdapter for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn answer(&self, prompt: &str) -> Result<Answer> {
        let mut request = MessagesRequest::new(&self.model)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .message(WireMessage::user(prompt));

        if self.web_search {
            request = request.tool(json!({
                "type": "web_search_20250305",
                "name": "web_search",
                "max_uses": 3,
            }));
        }

        let response = self.client().messages(&request).await?;
        let text = response.text();
        if text.is_empty() {
            return Err(ProviderError::Malformed(
                "no text content in response".to_string(),
            ));
        }

        Ok(Answer {
            sources: response.cited_urls(),
            text,
        })
    }

    async fn extract_value(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value> {
        let request = MessagesRequest::new(&self.model)
            .max_tokens(self.max_tokens)
            .system(system)
            .message(WireMessage::user(user))
            .tool(json!({
                "name": schema_name,
                "description": "Return the structured result.",
                "input_schema": schema,
            }))
            .tool_choice(json!({ "type": "tool", "name": schema_name }));

        let response = self.client().messages(&request).await?;
        response.tool_input(schema_name).ok_or_else(|| {
            ProviderError::Malformed("no structured output in response".to_string())
        })
    }
}
