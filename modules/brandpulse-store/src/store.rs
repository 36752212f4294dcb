use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use brandpulse_common::{AiProvider, Company, Prompt};

use crate::types::{RunWithMentions, RunWrite};

/// The consumed persistence contract: upsert-by-natural-key for identity
/// rows, insert-only for run history, plus the reads the aggregator needs.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Identity upserts ---

    /// Upsert a company by canonical domain. Keeps the existing name when
    /// the domain is already known.
    async fn upsert_company(&self, name: &str, domain: &str) -> Result<Company>;

    async fn upsert_provider(&self, name: &str) -> Result<AiProvider>;

    // --- Orchestrator reads ---

    async fn get_company(&self, id: Uuid) -> Result<Option<Company>>;

    async fn companies_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Company>>;

    /// Companies with at least one active prompt, ordered by id.
    async fn companies_with_active_prompts(&self, limit: usize) -> Result<Vec<Company>>;

    async fn active_prompts(&self, company_id: Uuid) -> Result<Vec<Prompt>>;

    /// Whether a run already exists for (prompt, provider, UTC date).
    async fn run_exists(
        &self,
        prompt_id: Uuid,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool>;

    // --- Run history ---

    /// Persist one extraction cycle in a single transaction. Returns the new
    /// PromptRun id.
    async fn persist_run(&self, write: &RunWrite) -> Result<Uuid>;

    /// All runs of the company's prompts in [from, to), with joined mentions.
    async fn runs_with_mentions(
        &self,
        owner_company_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RunWithMentions>>;
}
