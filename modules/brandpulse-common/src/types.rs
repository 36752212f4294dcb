use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A company tracked by the system or discovered in an answer.
/// `domain` is canonical: lowercase, no scheme, no `www.`, no trailing slash.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
}

/// A tracked question asked to AI providers on behalf of its owner company.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prompt {
    pub id: Uuid,
    pub text: String,
    pub owner_company_id: Uuid,
    pub is_active: bool,
    pub tags: Vec<String>,
}

impl Prompt {
    /// The prompt's topic: its first tag, or "general" when untagged.
    pub fn topic(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or("general")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AiProvider {
    pub id: Uuid,
    pub name: String,
}

/// One execution of one prompt against one provider. Immutable once created;
/// `run_at`'s UTC calendar date is the aggregation bucket key.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromptRun {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub provider_id: Uuid,
    pub raw_answer: String,
    pub run_at: DateTime<Utc>,
}

/// A detected reference to a company within one answer.
/// At most one row per (prompt_run_id, company_id).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompanyMention {
    pub id: Uuid,
    pub prompt_run_id: Uuid,
    pub company_id: Uuid,
    pub sentiment: f64,
}

/// A citation site, keyed by canonical domain.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Source {
    pub id: Uuid,
    pub domain: String,
    pub name: Option<String>,
}

/// An exact citation URL, referencing one Source.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceUrl {
    pub id: Uuid,
    pub source_id: Uuid,
    pub url: String,
}

/// Links a company mention to a citation URL surfaced by the same run.
/// One row per (run, company, url) triple; `count` is per-URL occurrences.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MentionDetail {
    pub prompt_run_id: Uuid,
    pub company_id: Uuid,
    pub source_url_id: Uuid,
    pub count: i32,
}
