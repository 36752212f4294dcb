//! Test mocks for the ingestion pipeline.
//!
//! `MockProvider` is script-driven: grounded answers keyed by prompt text,
//! structured payloads keyed by schema name. Unregistered inputs fail with a
//! provider error, which doubles as the failure injection mechanism.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use ai_client::{Answer, ProviderAdapter, ProviderError};

pub struct MockProvider {
    name: String,
    answers: HashMap<String, Answer>,
    extractions: HashMap<String, Value>,
    extract_calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            answers: HashMap::new(),
            extractions: HashMap::new(),
            extract_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_answer(mut self, prompt: &str, text: &str, sources: &[&str]) -> Self {
        self.answers.insert(
            prompt.to_string(),
            Answer {
                text: text.to_string(),
                sources: sources.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn on_extract(mut self, schema_name: &str, value: Value) -> Self {
        self.extractions.insert(schema_name.to_string(), value);
        self
    }

    /// Schema names of all structured calls made, in order.
    pub fn extract_calls(&self) -> Vec<String> {
        self.extract_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn answer(&self, prompt: &str) -> ai_client::Result<Answer> {
        self.answers.get(prompt).cloned().ok_or_else(|| ProviderError::Api {
            status: 500,
            message: format!("MockProvider: no answer registered for {prompt}"),
        })
    }

    async fn extract_value(
        &self,
        _system: &str,
        _user: &str,
        schema_name: &str,
        _schema: Value,
    ) -> ai_client::Result<Value> {
        self.extract_calls
            .lock()
            .unwrap()
            .push(schema_name.to_string());
        self.extractions
            .get(schema_name)
            .cloned()
            .ok_or_else(|| ProviderError::Api {
                status: 500,
                message: format!("MockProvider: no extraction registered for {schema_name}"),
            })
    }
}
