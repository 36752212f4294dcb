//! The ingestion orchestrator.
//!
//! A work-item generator produces (company, topic, prompt, provider) tuples;
//! a single consumer executes them strictly sequentially so the aggregate
//! request rate against external providers stays predictable. Companies are
//! paced through the batch processor; within a company nothing runs in
//! parallel.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ai_client::ProviderAdapter;
use brandpulse_common::{domain_of_url, BrandPulseError, Company, Config, Prompt};
use brandpulse_store::{CitationLink, CitationWrite, MentionWrite, RunWrite, Store};

use crate::batch;
use crate::cache::CacheConfig;
use crate::extractor::MentionExtractor;
use crate::providers;
use crate::resolver::SourceResolver;
use crate::sentiment::{join_sentiments, SentimentScorer};

/// One unit of ingestion work: one prompt against one provider.
pub struct WorkItem {
    pub topic: String,
    pub prompt: Prompt,
    pub provider: Arc<dyn ProviderAdapter>,
}

enum ItemOutcome {
    Created { mentions: usize, details: usize },
    Skipped,
}

/// Stats accumulated over an ingestion run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub companies_processed: u32,
    pub companies_failed: u32,
    pub items_total: u32,
    pub items_skipped: u32,
    pub items_failed: u32,
    pub runs_created: u32,
    pub mentions_stored: u32,
    pub details_stored: u32,
    pub cache_hit_rate: f64,
}

impl RunStats {
    fn merge(&mut self, other: RunStats) {
        self.companies_processed += other.companies_processed;
        self.companies_failed += other.companies_failed;
        self.items_total += other.items_total;
        self.items_skipped += other.items_skipped;
        self.items_failed += other.items_failed;
        self.runs_created += other.runs_created;
        self.mentions_stored += other.mentions_stored;
        self.details_stored += other.details_stored;
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Ingestion Run Complete ===")?;
        writeln!(
            f,
            "Companies processed: {} (failed: {})",
            self.companies_processed, self.companies_failed
        )?;
        writeln!(
            f,
            "Work items:          {} (skipped: {}, failed: {})",
            self.items_total, self.items_skipped, self.items_failed
        )?;
        writeln!(f, "Prompt runs created: {}", self.runs_created)?;
        writeln!(f, "Mentions stored:     {}", self.mentions_stored)?;
        writeln!(f, "Mention details:     {}", self.details_stored)?;
        writeln!(f, "Cache hit rate:      {:.2}", self.cache_hit_rate)?;
        Ok(())
    }
}

/// Generate work items for one company: topics in deterministic order, then
/// prompts, then providers.
pub fn work_items(prompts: &[Prompt], providers: &[Arc<dyn ProviderAdapter>]) -> Vec<WorkItem> {
    let mut by_topic: BTreeMap<String, Vec<&Prompt>> = BTreeMap::new();
    for prompt in prompts {
        by_topic
            .entry(prompt.topic().to_string())
            .or_default()
            .push(prompt);
    }

    let mut items = Vec::new();
    for (topic, topic_prompts) in by_topic {
        for prompt in topic_prompts {
            for provider in providers {
                items.push(WorkItem {
                    topic: topic.clone(),
                    prompt: (*prompt).clone(),
                    provider: Arc::clone(provider),
                });
            }
        }
    }
    items
}

pub struct Orchestrator {
    store: Arc<dyn Store>,
    providers: Vec<Arc<dyn ProviderAdapter>>,
    extractor: MentionExtractor,
    scorer: SentimentScorer,
    resolver: SourceResolver,
    batch_size: usize,
    batch_delay: Duration,
    max_companies: usize,
    stop_on_error: bool,
    skip_existing: bool,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        providers: Vec<Arc<dyn ProviderAdapter>>,
        extraction: Arc<dyn ProviderAdapter>,
        fallback: Option<Arc<dyn ProviderAdapter>>,
        config: &Config,
    ) -> Self {
        let cache_config = CacheConfig {
            max_size: config.cache_max_size,
            ttl: chrono::Duration::hours(config.cache_ttl_hours),
            requests_per_minute: config.resolver_rpm,
        };

        Self {
            extractor: MentionExtractor::new(Arc::clone(&extraction)),
            scorer: SentimentScorer::new(Arc::clone(&extraction)),
            resolver: SourceResolver::new(cache_config, extraction, fallback),
            store,
            providers,
            batch_size: config.batch_size,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            max_companies: config.max_companies_per_run,
            stop_on_error: config.stop_on_error,
            skip_existing: config.skip_existing,
        }
    }

    pub fn from_config(store: Arc<dyn Store>, config: &Config) -> Self {
        Self::new(
            store,
            providers::answer_providers(config),
            providers::extraction_adapter(config),
            providers::fallback_adapter(config),
            config,
        )
    }

    /// Run ingestion across all companies with active prompts, or a single
    /// company when `scope` is given (operator recovery/testing surface).
    ///
    /// Not idempotent: re-invoking on the same calendar day creates
    /// duplicate runs unless `skip_existing` is enabled.
    pub async fn run(&self, scope: Option<Uuid>) -> Result<RunStats> {
        let companies = match scope {
            Some(id) => {
                let company = self
                    .store
                    .get_company(id)
                    .await?
                    .with_context(|| format!("Company {id} not found"))?;
                vec![company]
            }
            None => {
                self.store
                    .companies_with_active_prompts(self.max_companies)
                    .await?
            }
        };

        info!(companies = companies.len(), "Starting ingestion run");
        let total = companies.len();
        let mut stats = RunStats::default();

        if self.stop_on_error {
            for company in companies {
                stats.merge(self.run_company(company).await?);
            }
        } else {
            let results = batch::run_batched(
                companies,
                self.batch_size,
                self.batch_delay,
                |company| self.run_company(company),
            )
            .await;
            let succeeded = results.len();
            for company_stats in results {
                stats.merge(company_stats);
            }
            stats.companies_failed += (total - succeeded) as u32;
        }

        stats.cache_hit_rate = self.resolver.cache().stats().hit_rate();
        Ok(stats)
    }

    async fn run_company(&self, company: Company) -> Result<RunStats> {
        let prompts = self.store.active_prompts(company.id).await?;
        let items = work_items(&prompts, &self.providers);
        info!(
            company = %company.name,
            prompts = prompts.len(),
            items = items.len(),
            "Processing company"
        );

        let mut stats = RunStats {
            companies_processed: 1,
            items_total: items.len() as u32,
            ..RunStats::default()
        };

        for item in items {
            debug!(
                company = %company.name,
                topic = %item.topic,
                prompt_id = %item.prompt.id,
                provider = item.provider.name(),
                "Processing work item"
            );
            match self.process_item(&item).await {
                Ok(ItemOutcome::Created { mentions, details }) => {
                    stats.runs_created += 1;
                    stats.mentions_stored += mentions as u32;
                    stats.details_stored += details as u32;
                }
                Ok(ItemOutcome::Skipped) => stats.items_skipped += 1,
                Err(e) => {
                    stats.items_failed += 1;
                    if self.stop_on_error {
                        return Err(e).with_context(|| {
                            format!(
                                "Aborting run at prompt {} / provider {}",
                                item.prompt.id,
                                item.provider.name()
                            )
                        });
                    }
                    warn!(
                        prompt_id = %item.prompt.id,
                        provider = item.provider.name(),
                        error = %e,
                        "Work item failed, continuing"
                    );
                }
            }
        }

        Ok(stats)
    }

    /// One extraction cycle: answer → mentions → sentiment → resolution →
    /// one transactional write.
    async fn process_item(&self, item: &WorkItem) -> Result<ItemOutcome, BrandPulseError> {
        let provider_row = self
            .store
            .upsert_provider(item.provider.name())
            .await
            .map_err(persistence)?;

        if self.skip_existing {
            let today = Utc::now().date_naive();
            if self
                .store
                .run_exists(item.prompt.id, provider_row.id, today)
                .await
                .map_err(persistence)?
            {
                info!(
                    prompt_id = %item.prompt.id,
                    provider = item.provider.name(),
                    "Run already exists today, skipping"
                );
                return Ok(ItemOutcome::Skipped);
            }
        }

        let answer = item
            .provider
            .answer(&item.prompt.text)
            .await
            .map_err(|e| BrandPulseError::Provider(e.to_string()))?;

        let mentions = self.extractor.extract(&item.prompt.text, &answer.text).await?;
        let scores = self.scorer.score(&answer.text, &mentions).await?;
        let joined = join_sentiments(&mentions, &scores);

        // Opportunistic company upserts. A mention whose domain cannot be
        // resolved has no natural key and is dropped.
        let mut mention_writes = Vec::new();
        let mut company_by_domain: HashMap<String, Uuid> = HashMap::new();
        for (mention, sentiment) in joined {
            let domain = match &mention.domain {
                Some(domain) => domain.clone(),
                None => match self.resolver.domain_for_company(&mention.name).await {
                    Some(domain) => domain,
                    None => {
                        warn!(name = %mention.name, "No domain resolved for mention, dropping");
                        continue;
                    }
                },
            };

            let company = self
                .store
                .upsert_company(&mention.name, &domain)
                .await
                .map_err(persistence)?;
            if company_by_domain.insert(domain, company.id).is_none() {
                mention_writes.push(MentionWrite {
                    company_id: company.id,
                    sentiment,
                });
            }
        }

        let citations = self.build_citations(&answer.sources, &company_by_domain).await;
        let details: usize = citations.iter().map(|c| c.links.len()).sum();

        let write = RunWrite {
            prompt_id: item.prompt.id,
            provider_id: provider_row.id,
            raw_answer: answer.text,
            run_at: Utc::now(),
            mentions: mention_writes,
            citations,
        };
        let run_id = self.store.persist_run(&write).await.map_err(persistence)?;

        info!(
            run_id = %run_id,
            provider = item.provider.name(),
            mentions = write.mentions.len(),
            citations = write.citations.len(),
            "Prompt run persisted"
        );

        Ok(ItemOutcome::Created {
            mentions: write.mentions.len(),
            details,
        })
    }

    /// Turn the answer's citation URLs into Source/SourceUrl writes. Counts
    /// are per-URL occurrences; a URL is linked to a mentioned company when
    /// their canonical domains match.
    async fn build_citations(
        &self,
        sources: &[String],
        company_by_domain: &HashMap<String, Uuid>,
    ) -> Vec<CitationWrite> {
        let mut counts: Vec<(String, u32)> = Vec::new();
        for url in sources {
            match counts.iter_mut().find(|(u, _)| u == url) {
                Some(entry) => entry.1 += 1,
                None => counts.push((url.clone(), 1)),
            }
        }

        let mut citations = Vec::new();
        for (url, count) in counts {
            let Some(domain) = domain_of_url(&url) else {
                warn!(url, "Unparseable citation URL, skipping");
                continue;
            };

            let site_name = self.resolver.site_name(&domain).await;
            let links = company_by_domain
                .get(&domain)
                .map(|company_id| {
                    vec![CitationLink {
                        company_id: *company_id,
                        count,
                    }]
                })
                .unwrap_or_default();

            citations.push(CitationWrite {
                url,
                domain,
                site_name,
                links,
            });
        }
        citations
    }
}

fn persistence(e: anyhow::Error) -> BrandPulseError {
    BrandPulseError::Persistence(e.to_string())
}
