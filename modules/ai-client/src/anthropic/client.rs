use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::debug;

use super::types::{MessagesRequest, MessagesResponse};
use crate::error::{ProviderError, Result};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub(crate) struct AnthropicClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: ANTHROPIC_API_URL.to_string(),
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
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| ProviderError::Network(e.to_string()))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn messages(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);

        debug!(model = %request.model, "Anthropic messages request");

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
