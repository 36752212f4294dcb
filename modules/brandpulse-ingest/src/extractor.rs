//! Mention extraction: which companies does an answer discuss?

use std::collections::HashSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ai_client::{ProviderAdapter, ProviderError};
use brandpulse_common::{canonical_domain, BrandPulseError};

/// Answers longer than this are truncated before extraction to stay inside
/// token limits.
const MAX_ANSWER_CHARS: usize = 30_000;

const MENTION_SYSTEM_PROMPT: &str = r#"You identify companies discussed in an AI-generated answer.

If the answer is not in English, translate it to English first, then analyze the translation.

Return one entry per distinct company that the answer actually discusses — a company that is compared, recommended, reviewed, or described. Do not include companies that only appear inside a URL, a legal disclaimer, or boilerplate.

For each company:
- name: the company's common name as written in the answer
- domain: the company's primary website domain (bare domain like "acme.com" — no scheme, no "www.", no path). Use null if you do not know the domain.

Return every distinct company exactly once."#;

/// What the model returns for each discussed company.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireMention {
    pub name: String,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MentionResponse {
    #[serde(default)]
    pub mentions: Vec<WireMention>,
}

/// A company discussed in an answer, with its domain canonicalized.
/// `domain` is `None` when the model could not name one; the resolver fills
/// the gap later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMention {
    pub name: String,
    pub domain: Option<String>,
}

pub struct MentionExtractor {
    adapter: Arc<dyn ProviderAdapter>,
}

impl MentionExtractor {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self { adapter }
    }

    /// Extract the distinct companies discussed in `answer_text`.
    ///
    /// A non-JSON-shaped result from the structured call is fatal for this
    /// iteration (`ExtractionParse`); provider failures surface as
    /// `Provider`.
    pub async fn extract(
        &self,
        prompt_text: &str,
        answer_text: &str,
    ) -> Result<Vec<ExtractedMention>, BrandPulseError> {
        let answer = truncate_at_boundary(answer_text, MAX_ANSWER_CHARS);
        let user = format!(
            "Question that was asked:\n{prompt_text}\n\n---\n\nAnswer to analyze:\n{answer}"
        );

        let response: MentionResponse =
            ai_client::extract(self.adapter.as_ref(), MENTION_SYSTEM_PROMPT, &user)
                .await
                .map_err(fatal_on_malformed)?;

        let mentions = dedup_mentions(response.mentions);
        debug!(count = mentions.len(), "Mentions extracted");
        Ok(mentions)
    }
}

/// Malformed structured output is an extraction parse error; everything else
/// stays a provider error.
pub(crate) fn fatal_on_malformed(err: ProviderError) -> BrandPulseError {
    match err {
        ProviderError::Malformed(message) => BrandPulseError::ExtractionParse(message),
        other => BrandPulseError::Provider(other.to_string()),
    }
}

/// Canonicalize domains and drop entries sharing an identical
/// (name, domain) pair, preserving first-seen order.
pub fn dedup_mentions(raw: Vec<WireMention>) -> Vec<ExtractedMention> {
    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
    let mut out = Vec::new();

    for mention in raw {
        let name = mention.name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        let domain = mention
            .domain
            .as_deref()
            .map(canonical_domain)
            .filter(|d| !d.is_empty());

        if seen.insert((name.to_lowercase(), domain.clone())) {
            out.push(ExtractedMention { name, domain });
        }
    }

    out
}

fn truncate_at_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
