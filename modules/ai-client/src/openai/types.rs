use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    /// Present (even empty) to enable retrieval on search-capable models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_options: Option<Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            response_format: None,
            web_search_options: None,
        }
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn response_format(mut self, format: Value) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn web_search(mut self, options: Value) -> Self {
        self.web_search_options = Some(options);
        self
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UrlCitation {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Annotation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url_citation: Option<UrlCitation>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub annotations: Option<Vec<Annotation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
}

impl ChatResponse {
    pub fn into_message(self) -> Option<ResponseMessage> {
        self.choices.into_iter().next().map(|c| c.message)
    }
}

impl ResponseMessage {
    /// Citation URLs from url_citation annotations, first-seen order, deduplicated.
    pub fn cited_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        for annotation in self.annotations.iter().flatten() {
            if annotation.kind != "url_citation" {
                continue;
            }
            if let Some(citation) = &annotation.url_citation {
                if !urls.contains(&citation.url) {
                    urls.push(citation.url.clone());
                }
            }
        }
        urls
    }
}
