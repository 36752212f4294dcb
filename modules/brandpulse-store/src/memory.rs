//! In-memory [`Store`] for deterministic tests and local experiments.
//! No network, no database; `cargo test` in seconds.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use brandpulse_common::{
    AiProvider, Company, CompanyMention, MentionDetail, Prompt, PromptRun, Source, SourceUrl,
};

use crate::store::Store;
use crate::types::{MentionRow, RunWithMentions, RunWrite};

#[derive(Default)]
struct Inner {
    companies: Vec<Company>,
    prompts: Vec<Prompt>,
    providers: Vec<AiProvider>,
    runs: Vec<PromptRun>,
    mentions: Vec<CompanyMention>,
    sources: Vec<Source>,
    source_urls: Vec<SourceUrl>,
    details: Vec<MentionDetail>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Seed helpers (not part of the Store contract) ---

    pub fn add_company(&self, name: &str, domain: &str) -> Company {
        let company = Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain: domain.to_string(),
        };
        self.inner.lock().unwrap().companies.push(company.clone());
        company
    }

    pub fn add_prompt(&self, owner_company_id: Uuid, text: &str, tags: &[&str]) -> Prompt {
        let prompt = Prompt {
            id: Uuid::new_v4(),
            text: text.to_string(),
            owner_company_id,
            is_active: true,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        };
        self.inner.lock().unwrap().prompts.push(prompt.clone());
        prompt
    }

    pub fn deactivate_prompt(&self, prompt_id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(prompt) = inner.prompts.iter_mut().find(|p| p.id == prompt_id) {
            prompt.is_active = false;
        }
    }

    // --- Inspection helpers for tests ---

    pub fn run_count(&self) -> usize {
        self.inner.lock().unwrap().runs.len()
    }

    pub fn mention_count(&self) -> usize {
        self.inner.lock().unwrap().mentions.len()
    }

    pub fn companies(&self) -> Vec<Company> {
        self.inner.lock().unwrap().companies.clone()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.inner.lock().unwrap().sources.clone()
    }

    pub fn source_urls(&self) -> Vec<SourceUrl> {
        self.inner.lock().unwrap().source_urls.clone()
    }

    pub fn details(&self) -> Vec<MentionDetail> {
        self.inner.lock().unwrap().details.clone()
    }

    pub fn mentions_for_run(&self, run_id: Uuid) -> Vec<CompanyMention> {
        self.inner
            .lock()
            .unwrap()
            .mentions
            .iter()
            .filter(|m| m.prompt_run_id == run_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_company(&self, name: &str, domain: &str) -> Result<Company> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.companies.iter().find(|c| c.domain == domain) {
            return Ok(existing.clone());
        }
        let company = Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain: domain.to_string(),
        };
        inner.companies.push(company.clone());
        Ok(company)
    }

    async fn upsert_provider(&self, name: &str) -> Result<AiProvider> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.providers.iter().find(|p| p.name == name) {
            return Ok(existing.clone());
        }
        let provider = AiProvider {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        inner.providers.push(provider.clone());
        Ok(provider)
    }

    async fn get_company(&self, id: Uuid) -> Result<Option<Company>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.companies.iter().find(|c| c.id == id).cloned())
    }

    async fn companies_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Company>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .companies
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn companies_with_active_prompts(&self, limit: usize) -> Result<Vec<Company>> {
        let inner = self.inner.lock().unwrap();
        let mut companies: Vec<Company> = inner
            .companies
            .iter()
            .filter(|c| {
                inner
                    .prompts
                    .iter()
                    .any(|p| p.owner_company_id == c.id && p.is_active)
            })
            .cloned()
            .collect();
        companies.sort_by_key(|c| c.id);
        companies.truncate(limit);
        Ok(companies)
    }

    async fn active_prompts(&self, company_id: Uuid) -> Result<Vec<Prompt>> {
        let inner = self.inner.lock().unwrap();
        let mut prompts: Vec<Prompt> = inner
            .prompts
            .iter()
            .filter(|p| p.owner_company_id == company_id && p.is_active)
            .cloned()
            .collect();
        prompts.sort_by_key(|p| p.id);
        Ok(prompts)
    }

    async fn run_exists(
        &self,
        prompt_id: Uuid,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.runs.iter().any(|r| {
            r.prompt_id == prompt_id
                && r.provider_id == provider_id
                && r.run_at.date_naive() == date
        }))
    }

    async fn persist_run(&self, write: &RunWrite) -> Result<Uuid> {
        let mut inner = self.inner.lock().unwrap();

        let run_id = Uuid::new_v4();
        inner.runs.push(PromptRun {
            id: run_id,
            prompt_id: write.prompt_id,
            provider_id: write.provider_id,
            raw_answer: write.raw_answer.clone(),
            run_at: write.run_at,
        });

        for mention in &write.mentions {
            inner.mentions.push(CompanyMention {
                id: Uuid::new_v4(),
                prompt_run_id: run_id,
                company_id: mention.company_id,
                sentiment: mention.sentiment,
            });
        }

        for citation in &write.citations {
            let source_id = match inner.sources.iter().find(|s| s.domain == citation.domain) {
                Some(source) => source.id,
                None => {
                    let source = Source {
                        id: Uuid::new_v4(),
                        domain: citation.domain.clone(),
                        name: citation.site_name.clone(),
                    };
                    let id = source.id;
                    inner.sources.push(source);
                    id
                }
            };

            let source_url_id = match inner.source_urls.iter().find(|u| u.url == citation.url) {
                Some(source_url) => source_url.id,
                None => {
                    let source_url = SourceUrl {
                        id: Uuid::new_v4(),
                        source_id,
                        url: citation.url.clone(),
                    };
                    let id = source_url.id;
                    inner.source_urls.push(source_url);
                    id
                }
            };

            for link in &citation.links {
                inner.details.push(MentionDetail {
                    prompt_run_id: run_id,
                    company_id: link.company_id,
                    source_url_id,
                    count: link.count as i32,
                });
            }
        }

        Ok(run_id)
    }

    async fn runs_with_mentions(
        &self,
        owner_company_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RunWithMentions>> {
        let inner = self.inner.lock().unwrap();

        let mut result: Vec<RunWithMentions> = inner
            .runs
            .iter()
            .filter(|r| {
                r.run_at >= from
                    && r.run_at < to
                    && inner
                        .prompts
                        .iter()
                        .any(|p| p.id == r.prompt_id && p.owner_company_id == owner_company_id)
            })
            .map(|r| RunWithMentions {
                run_id: r.id,
                prompt_id: r.prompt_id,
                provider_id: r.provider_id,
                run_at: r.run_at,
                mentions: inner
                    .mentions
                    .iter()
                    .filter(|m| m.prompt_run_id == r.id)
                    .map(|m| MentionRow {
                        company_id: m.company_id,
                        sentiment: m.sentiment,
                    })
                    .collect(),
            })
            .collect();

        result.sort_by_key(|r| r.run_at);
        Ok(result)
    }
}
