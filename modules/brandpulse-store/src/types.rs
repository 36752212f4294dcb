use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything one extraction cycle persists, written in one transaction so a
/// mid-iteration crash cannot leave a PromptRun without its mentions.
#[derive(Debug, Clone)]
pub struct RunWrite {
    pub prompt_id: Uuid,
    pub provider_id: Uuid,
    pub raw_answer: String,
    pub run_at: DateTime<Utc>,
    pub mentions: Vec<MentionWrite>,
    pub citations: Vec<CitationWrite>,
}

#[derive(Debug, Clone)]
pub struct MentionWrite {
    pub company_id: Uuid,
    pub sentiment: f64,
}

/// One citation URL surfaced by the run, with the companies it backs.
/// Source/SourceUrl rows are upserted for every citation; links only exist
/// where a mentioned company's domain matches the citation's.
#[derive(Debug, Clone)]
pub struct CitationWrite {
    pub url: String,
    pub domain: String,
    pub site_name: Option<String>,
    pub links: Vec<CitationLink>,
}

#[derive(Debug, Clone)]
pub struct CitationLink {
    pub company_id: Uuid,
    pub count: u32,
}

/// Aggregator read shape: one run with its joined mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWithMentions {
    pub run_id: Uuid,
    pub prompt_id: Uuid,
    pub provider_id: Uuid,
    pub run_at: DateTime<Utc>,
    pub mentions: Vec<MentionRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionRow {
    pub company_id: Uuid,
    pub sentiment: f64,
}
