mod client;
pub(crate) mod types;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{ProviderError, Result};
use crate::traits::{Answer, ProviderAdapter};

use client::OpenAiClient;
use types::{ChatMessage, ChatRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Adapter for the OpenAI chat completions API.
///
/// Grounded answers use a search-capable model with `web_search_options`;
/// citation URLs arrive as url_citation annotations. Structured extraction
/// uses `response_format: json_schema` in strict mode.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    web_search: bool,
    base_url: Option<String>,
}

impl OpenAi {
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

    fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key, DEFAULT_TIMEOUT);
        match &self.base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAi {
    fn name(&self) -> &str {
        "openai"
    }

    async fn answer(&self, prompt: &str) -> Result<Answer> {
        let mut request = ChatRequest::new(&self.model)
            .max_tokens(self.max_tokens)
            .message(ChatMessage::user(prompt));

        if self.web_search {
            // Search models reject sampling params; leave temperature unset.
            request = request.web_search(json!({}));
        } else {
            request = request.temperature(self.temperature);
        }

        let response = self.client().chat(&request).await?;
        let message = response
            .into_message()
            .ok_or_else(|| ProviderError::Malformed("no choices in response".to_string()))?;

        let sources = message.cited_urls();
        let text = message
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::Malformed("no message content".to_string()))?;

        Ok(Answer { text, sources })
    }

    async fn extract_value(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value> {
        let request = ChatRequest::new(&self.model)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .message(ChatMessage::system(system))
            .message(ChatMessage::user(user))
            .response_format(json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "strict": true,
                    "schema": schema,
                },
            }));

        let response = self.client().chat(&request).await?;
        let content = response
            .into_message()
            .and_then(|m| m.content)
            .ok_or_else(|| ProviderError::Malformed("no message content".to_string()))?;

        serde_json::from_str(&content).map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_carries_model_and_key() {
        let ai = OpenAi::new("sk-test", "gpt-4o-search-preview");
        assert_eq!(ai.model(), "gpt-4o-search-preview");
        assert_eq!(ai.name(), "openai");
    }

    #[test]
    fn cited_urls_dedup_preserves_order() {
        use super::types::{Annotation, ResponseMessage, UrlCitation};

        let message = ResponseMessage {
            content: Some("answer".to_string()),
            annotations: Some(vec![
                Annotation {
                    kind: "url_citation".to_string(),
                    url_citation: Some(UrlCitation {
                        url: "https://b.example/page".to_string(),
                    }),
                },
                Annotation {
                    kind: "url_citation".to_string(),
                    url_citation: Some(UrlCitation {
                        url: "https://a.example/".to_string(),
                    }),
                },
                Annotation {
                    kind: "url_citation".to_string(),
                    url_citation: Some(UrlCitation {
                        url: "https://b.example/page".to_string(),
                    }),
                },
            ]),
        };

        assert_eq!(
            message.cited_urls(),
            vec!["https://b.example/page", "https://a.example/"]
        );
    }
}
