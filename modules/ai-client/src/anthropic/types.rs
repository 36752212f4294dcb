use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    User,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Tool entries are raw JSON: the messages API mixes caller-defined tools
    /// (`input_schema`) with server tools (`type: "web_search_20250305"`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
}

impl MessagesRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 4096,
            messages: Vec::new(),
            system: None,
            temperature: None,
            tools: Vec::new(),
            tool_choice: None,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn message(mut self, message: WireMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn tool(mut self, tool: Value) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tool_choice(mut self, choice: Value) -> Self {
        self.tool_choice = Some(choice);
        self
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Citation {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ResponseBlock {
    #[serde(rename = "text")]
    Text {
        text: String,
        #[serde(default)]
        citations: Option<Vec<Citation>>,
    },
    #[serde(rename = "tool_use")]
    ToolUse { name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessagesResponse {
    pub content: Vec<ResponseBlock>,
}

impl MessagesResponse {
    /// Concatenated text of all text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Citation URLs in first-seen order, deduplicated.
    pub fn cited_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        for block in &self.content {
            let ResponseBlock::Text {
                citations: Some(citations),
                ..
            } = block
            else {
                continue;
            };
            for citation in citations {
                if let Some(url) = &citation.url {
                    if !urls.contains(url) {
                        urls.push(url.clone());
                    }
                }
            }
        }
        urls
    }

    /// Input of the named tool_use block, if the model called it.
    pub fn tool_input(&self, tool_name: &str) -> Option<Value> {
        self.content.iter().find_map(|block| match block {
            ResponseBlock::ToolUse { name, input } if name == tool_name => Some(input.clone()),
            _ => None,
        })
    }
}
