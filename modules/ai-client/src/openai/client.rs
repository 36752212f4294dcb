use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::types::{ChatRequest, ChatResponse};
use crate::error::{ProviderError, Result};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub(crate) struct OpenAiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: OPENAI_API_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| ProviderError::Network(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, "OpenAI chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(ProviderError::Quota(message));
            }
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}
