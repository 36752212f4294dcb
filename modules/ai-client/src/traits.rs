use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::schema::StructuredOutput;

/// A grounded answer from a generative backend: the answer text plus the
/// citation URLs the backend surfaced, when it supports retrieval.
#[derive(Debug, Clone, Default)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
}

/// Uniform call contract over heterogeneous generative-AI backends.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider key ("anthropic", "openai"). Persisted with each run.
    fn name(&self) -> &str;

    /// Produce a grounded answer for a free-form prompt.
    async fn answer(&self, prompt: &str) -> Result<Answer>;

    /// Schema-constrained structured generation. Returns the raw JSON value;
    /// use [`extract`] for typed access.
    async fn extract_value(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value>;
}

/// Typed structured extraction over any adapter. A payload that does not
/// deserialize into `T` is a [`ProviderError::Malformed`].
pub async fn extract<T: StructuredOutput>(
    adapter: &dyn ProviderAdapter,
    system: &str,
    user: &str,
) -> Result<T> {
    let value = adapter
        .extract_value(system, user, &<T as StructuredOutput>::schema_id(), T::response_schema())
        .await?;
    serde_json::from_value(value).map_err(|e| ProviderError::Malformed(e.to_string()))
}
