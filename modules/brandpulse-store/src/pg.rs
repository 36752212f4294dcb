//! Postgres implementation of the [`Store`] contract.
//!
//! The schema is consumed, not designed here. Expected tables:
//! `companies(id, name, domain)`, `prompts(id, text, owner_company_id,
//! is_active, tags)`, `ai_providers(id, name)`, `prompt_runs(id, prompt_id,
//! provider_id, raw_answer, run_at)`, `company_mentions(id, prompt_run_id,
//! company_id, sentiment)`, `sources(id, domain, name)`,
//! `source_urls(id, source_id, url)`,
//! `mention_details(prompt_run_id, company_id, source_url_id, count)`.
//! Natural keys: companies.domain, ai_providers.name, sources.domain,
//! source_urls.url.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use brandpulse_common::{AiProvider, Company, Prompt};

use crate::store::Store;
use crate::types::{MentionRow, RunWithMentions, RunWrite};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_company(&self, name: &str, domain: &str) -> Result<Company> {
        let company = sqlx::query_as::<_, Company>(
            "INSERT INTO companies (id, name, domain)
             VALUES ($1, $2, $3)
             ON CONFLICT (domain) DO UPDATE SET name = companies.name
             RETURNING id, name, domain",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(domain)
        .fetch_one(&self.pool)
        .await?;

        Ok(company)
    }

    async fn upsert_provider(&self, name: &str) -> Result<AiProvider> {
        let provider = sqlx::query_as::<_, AiProvider>(
            "INSERT INTO ai_providers (id, name)
             VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(provider)
    }

    async fn get_company(&self, id: Uuid) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, domain FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(company)
    }

    async fn companies_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT id, name, domain FROM companies WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(companies)
    }

    async fn companies_with_active_prompts(&self, limit: usize) -> Result<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT c.id, c.name, c.domain
             FROM companies c
             WHERE EXISTS (
                 SELECT 1 FROM prompts p
                 WHERE p.owner_company_id = c.id AND p.is_active
             )
             ORDER BY c.id
             LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(companies)
    }

    async fn active_prompts(&self, company_id: Uuid) -> Result<Vec<Prompt>> {
        let prompts = sqlx::query_as::<_, Prompt>(
            "SELECT id, text, owner_company_id, is_active, tags
             FROM prompts
             WHERE owner_company_id = $1 AND is_active
             ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(prompts)
    }

    async fn run_exists(
        &self,
        prompt_id: Uuid,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                 SELECT 1 FROM prompt_runs
                 WHERE prompt_id = $1
                   AND provider_id = $2
                   AND (run_at AT TIME ZONE 'UTC')::date = $3
             )",
        )
        .bind(prompt_id)
        .bind(provider_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn persist_run(&self, write: &RunWrite) -> Result<Uuid> {
        let mut tx = self.pool.begin().await?;

        let run_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO prompt_runs (id, prompt_id, provider_id, raw_answer, run_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(run_id)
        .bind(write.prompt_id)
        .bind(write.provider_id)
        .bind(&write.raw_answer)
        .bind(write.run_at)
        .execute(&mut *tx)
        .await?;

        for mention in &write.mentions {
            sqlx::query(
                "INSERT INTO company_mentions (id, prompt_run_id, company_id, sentiment)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(run_id)
            .bind(mention.company_id)
            .bind(mention.sentiment)
            .execute(&mut *tx)
            .await?;
        }

        for citation in &write.citations {
            let source_id = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO sources (id, domain, name)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (domain) DO UPDATE
                     SET name = COALESCE(sources.name, EXCLUDED.name)
                 RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(&citation.domain)
            .bind(&citation.site_name)
            .fetch_one(&mut *tx)
            .await?;

            let source_url_id = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO source_urls (id, source_id, url)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (url) DO UPDATE SET source_id = EXCLUDED.source_id
                 RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(source_id)
            .bind(&citation.url)
            .fetch_one(&mut *tx)
            .await?;

            for link in &citation.links {
                sqlx::query(
                    "INSERT INTO mention_details (prompt_run_id, company_id, source_url_id, count)
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(run_id)
                .bind(link.company_id)
                .bind(source_url_id)
                .bind(link.count as i32)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(run_id)
    }

    async fn runs_with_mentions(
        &self,
        owner_company_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RunWithMentions>> {
        let runs = sqlx::query_as::<_, (Uuid, Uuid, Uuid, DateTime<Utc>)>(
            "SELECT r.id, r.prompt_id, r.provider_id, r.run_at
             FROM prompt_runs r
             JOIN prompts p ON p.id = r.prompt_id
             WHERE p.owner_company_id = $1
               AND r.run_at >= $2
               AND r.run_at < $3
             ORDER BY r.run_at",
        )
        .bind(owner_company_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let run_ids: Vec<Uuid> = runs.iter().map(|r| r.0).collect();
        let mention_rows = sqlx::query_as::<_, (Uuid, Uuid, f64)>(
            "SELECT prompt_run_id, company_id, sentiment
             FROM company_mentions
             WHERE prompt_run_id = ANY($1)",
        )
        .bind(&run_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut result: Vec<RunWithMentions> = runs
            .into_iter()
            .map(|(run_id, prompt_id, provider_id, run_at)| RunWithMentions {
                run_id,
                prompt_id,
                provider_id,
                run_at,
                mentions: Vec::new(),
            })
            .collect();

        for (prompt_run_id, company_id, sentiment) in mention_rows {
            if let Some(run) = result.iter_mut().find(|r| r.run_id == prompt_run_id) {
                run.mentions.push(MentionRow {
                    company_id,
                    sentiment,
                });
            }
        }

        Ok(result)
    }
}
