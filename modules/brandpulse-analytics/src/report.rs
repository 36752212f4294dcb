//! Store-backed report assembly: fetch the window's rows once, then hand
//! them to the pure aggregation functions.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use brandpulse_store::{RunWithMentions, Store};

use crate::competitors::{position_window, rank_competitors, CompetitorEntry, RankedCompetitor};
use crate::series::{sentiment_series, visibility_series, SentimentSeries, VisibilitySeries};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorReport {
    pub leaderboard: Vec<CompetitorEntry>,
    /// The tracked company's rank neighborhood (up to three entries).
    pub window: Vec<RankedCompetitor>,
}

pub struct Analytics {
    store: Arc<dyn Store>,
}

impl Analytics {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn visibility(&self, company_id: Uuid, days: u32) -> Result<VisibilitySeries> {
        self.visibility_as_of(company_id, days, Utc::now().date_naive())
            .await
    }

    pub async fn sentiment(&self, company_id: Uuid, days: u32) -> Result<SentimentSeries> {
        self.sentiment_as_of(company_id, days, Utc::now().date_naive())
            .await
    }

    pub async fn competitors(&self, company_id: Uuid, days: u32) -> Result<CompetitorReport> {
        self.competitors_as_of(company_id, days, Utc::now().date_naive())
            .await
    }

    // `as_of` variants take the window's last day explicitly so tests drive
    // time without real clocks.

    pub async fn visibility_as_of(
        &self,
        company_id: Uuid,
        days: u32,
        today: NaiveDate,
    ) -> Result<VisibilitySeries> {
        let (from, runs) = self.window_runs(company_id, days, today).await?;
        Ok(visibility_series(&runs, company_id, from, today))
    }

    pub async fn sentiment_as_of(
        &self,
        company_id: Uuid,
        days: u32,
        today: NaiveDate,
    ) -> Result<SentimentSeries> {
        let (from, runs) = self.window_runs(company_id, days, today).await?;
        Ok(sentiment_series(&runs, company_id, from, today))
    }

    pub async fn competitors_as_of(
        &self,
        company_id: Uuid,
        days: u32,
        today: NaiveDate,
    ) -> Result<CompetitorReport> {
        let (_, runs) = self.window_runs(company_id, days, today).await?;

        let mut ids: Vec<Uuid> = runs
            .iter()
            .flat_map(|r| r.mentions.iter().map(|m| m.company_id))
            .collect();
        ids.push(company_id);
        ids.sort();
        ids.dedup();

        let names: HashMap<Uuid, String> = self
            .store
            .companies_by_ids(&ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let leaderboard = rank_competitors(&runs, company_id, &names);
        let window = position_window(&leaderboard, company_id);

        Ok(CompetitorReport {
            leaderboard,
            window,
        })
    }

    async fn window_runs(
        &self,
        company_id: Uuid,
        days: u32,
        today: NaiveDate,
    ) -> Result<(NaiveDate, Vec<RunWithMentions>)> {
        let days = days.max(1);
        let from = today - Duration::days(days as i64 - 1);

        let start = Utc.from_utc_datetime(&from.and_time(NaiveTime::MIN));
        let end = Utc.from_utc_datetime(&(today + Duration::days(1)).and_time(NaiveTime::MIN));

        let runs = self
            .store
            .runs_with_mentions(company_id, start, end)
            .await?;
        debug!(
            company_id = %company_id,
            days,
            runs = runs.len(),
            "Loaded window for aggregation"
        );

        Ok((from, runs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandpulse_store::{MemoryStore, MentionWrite, RunWrite};
    use chrono::TimeZone;

    #[tokio::test]
    async fn reports_compose_over_the_memory_store() {
        let store = Arc::new(MemoryStore::new());
        let acme = store.add_company("Acme", "acme.com");
        let rival = store.add_company("Rival", "rival.com");
        let prompt = store.add_prompt(acme.id, "best crm?", &["crm"]);
        let provider = store.upsert_provider("anthropic").await.unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        let runs = [
            (2025, 3, 10, vec![(acme.id, 0.4), (rival.id, 0.1)]),
            (2025, 3, 10, vec![(rival.id, -0.2)]),
            (2025, 3, 11, vec![(acme.id, 0.6), (rival.id, 0.3)]),
            (2025, 3, 11, vec![(acme.id, 0.2)]),
        ];
        for (y, m, d, mentions) in runs {
            store
                .persist_run(&RunWrite {
                    prompt_id: prompt.id,
                    provider_id: provider.id,
                    raw_answer: "answer".to_string(),
                    run_at: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
                    mentions: mentions
                        .into_iter()
                        .map(|(company_id, sentiment)| MentionWrite {
                            company_id,
                            sentiment,
                        })
                        .collect(),
                    citations: vec![],
                })
                .await
                .unwrap();
        }

        let analytics = Analytics::new(store);

        let visibility = analytics
            .visibility_as_of(acme.id, 2, today)
            .await
            .unwrap();
        // Day 1: 1/2 runs. Day 2: 2/2 runs. Current: 3/4.
        assert_eq!(visibility.points[0].visibility, 50.00);
        assert_eq!(visibility.points[1].visibility, 100.00);
        assert_eq!(visibility.current_visibility, 75.00);

        let sentiment = analytics.sentiment_as_of(acme.id, 2, today).await.unwrap();
        assert_eq!(sentiment.points[0].sentiment, 0.40);
        assert_eq!(sentiment.points[1].sentiment, 0.40);

        let competitors = analytics
            .competitors_as_of(acme.id, 2, today)
            .await
            .unwrap();
        assert_eq!(competitors.leaderboard.len(), 2);
        let me = competitors
            .leaderboard
            .iter()
            .find(|e| e.company_id == acme.id)
            .unwrap();
        assert_eq!(me.name, "Acme");
        assert_eq!(me.mentions, 3);
        assert_eq!(me.visibility, 75.00);
        let rival_entry = competitors
            .leaderboard
            .iter()
            .find(|e| e.company_id == rival.id)
            .unwrap();
        assert_eq!(rival_entry.mentions, 3);
        assert_eq!(competitors.window.len(), 2);
    }
}
