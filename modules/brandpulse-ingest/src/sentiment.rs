//! Sentiment scoring: how does the answer speak about each company?

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ai_client::ProviderAdapter;
use brandpulse_common::BrandPulseError;

use crate::extractor::{fatal_on_malformed, ExtractedMention};

const SENTIMENT_SYSTEM_PROMPT: &str = r#"You score the sentiment an answer expresses toward specific companies.

For each company in the provided list, judge how the answer portrays it:
- 1.0: strongly recommended or praised
- 0.5: favorable
- 0.0: neutral, factual, or merely listed
- -0.5: criticized or flagged with caveats
- -1.0: strongly discouraged

Use the full [-1, 1] range. Score only companies from the list; skip any the answer does not actually discuss."#;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScoredMention {
    pub name: String,
    pub domain: Option<String>,
    /// Sentiment in [-1, 1].
    pub sentiment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SentimentResponse {
    #[serde(default)]
    pub scores: Vec<ScoredMention>,
}

pub struct SentimentScorer {
    adapter: Arc<dyn ProviderAdapter>,
}

impl SentimentScorer {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self { adapter }
    }

    /// Score sentiment toward each extracted company in one structured call.
    /// Same fatal-on-malformed policy as mention extraction.
    pub async fn score(
        &self,
        answer_text: &str,
        companies: &[ExtractedMention],
    ) -> Result<Vec<ScoredMention>, BrandPulseError> {
        if companies.is_empty() {
            return Ok(Vec::new());
        }

        let list = companies
            .iter()
            .map(|c| match &c.domain {
                Some(domain) => format!("- {} ({domain})", c.name),
                None => format!("- {}", c.name),
            })
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!("Companies:\n{list}\n\n---\n\nAnswer:\n{answer_text}");

        let response: SentimentResponse =
            ai_client::extract(self.adapter.as_ref(), SENTIMENT_SYSTEM_PROMPT, &user)
                .await
                .map_err(fatal_on_malformed)?;

        debug!(scored = response.scores.len(), "Sentiments scored");
        Ok(response.scores)
    }
}

/// Join extracted mentions with their scores. A company without a returned
/// entry defaults to 0; out-of-range values are clamped to [-1, 1].
pub fn join_sentiments(
    mentions: &[ExtractedMention],
    scores: &[ScoredMention],
) -> Vec<(ExtractedMention, f64)> {
    mentions
        .iter()
        .map(|mention| {
            let score = scores
                .iter()
                .find(|s| match (&mention.domain, &s.domain) {
                    (Some(md), Some(sd)) => md.eq_ignore_ascii_case(sd),
                    _ => mention.name.eq_ignore_ascii_case(&s.name),
                })
                .map(|s| s.sentiment.clamp(-1.0, 1.0))
                .unwrap_or(0.0);
            (mention.clone(), score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(name: &str, domain: Option<&str>) -> ExtractedMention {
        ExtractedMention {
            name: name.to_string(),
            domain: domain.map(str::to_string),
        }
    }

    fn score(name: &str, domain: Option<&str>, sentiment: f64) -> ScoredMention {
        ScoredMention {
            name: name.to_string(),
            domain: domain.map(str::to_string),
            sentiment,
        }
    }

    #[test]
    fn missing_scores_default_to_zero() {
        let mentions = vec![mention("Acme", Some("acme.com")), mention("Rival", Some("rival.com"))];
        let scores = vec![score("Acme", Some("acme.com"), 0.8)];

        let joined = join_sentiments(&mentions, &scores);
        assert_eq!(joined[0].1, 0.8);
        assert_eq!(joined[1].1, 0.0);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let mentions = vec![mention("Acme", Some("acme.com"))];
        let scores = vec![score("Acme", Some("acme.com"), 3.5)];

        let joined = join_sentiments(&mentions, &scores);
        assert_eq!(joined[0].1, 1.0);
    }

    #[test]
    fn join_matches_by_domain_then_name() {
        let mentions = vec![
            mention("Acme Corp", Some("acme.com")),
            mention("Nameless", None),
        ];
        let scores = vec![
            score("Acme", Some("ACME.com"), 0.4),
            score("nameless", None, -0.6),
        ];

        let joined = join_sentiments(&mentions, &scores);
        assert_eq!(joined[0].1, 0.4);
        assert_eq!(joined[1].1, -0.6);
    }
}
