//! End-to-end orchestrator tests over the in-memory store and mock
//! providers: no network, no database.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use brandpulse_common::Config;
use brandpulse_ingest::testing::MockProvider;
use brandpulse_ingest::Orchestrator;
use brandpulse_store::{MemoryStore, Store};

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        anthropic_api_key: "test-key".to_string(),
        openai_api_key: String::new(),
        providers: vec!["anthropic".to_string()],
        anthropic_model: "claude-sonnet-4-20250514".to_string(),
        openai_model: "gpt-4o-search-preview".to_string(),
        // High RPM keeps the resolver queue ticking every millisecond.
        resolver_rpm: 60_000,
        cache_max_size: 1_000,
        cache_ttl_hours: 24,
        batch_size: 3,
        batch_delay_ms: 0,
        max_companies_per_run: 50,
        stop_on_error: false,
        skip_existing: false,
    }
}

const PROMPT: &str = "What is the best CRM?";

fn answering_provider() -> Arc<MockProvider> {
    Arc::new(MockProvider::new("anthropic").on_answer(
        PROMPT,
        "Acme is the best CRM. Rival is a solid alternative.",
        &[
            "https://www.reviews.example/top-crm",
            "https://acme.com/blog",
            "https://www.reviews.example/top-crm",
        ],
    ))
}

fn extraction_provider() -> MockProvider {
    MockProvider::new("anthropic")
        .on_extract(
            "MentionResponse",
            json!({"mentions": [
                {"name": "Acme", "domain": "https://www.Acme.com/"},
                {"name": "Rival", "domain": "rival.com"},
                {"name": "acme", "domain": "acme.com"},
            ]}),
        )
        .on_extract(
            "SentimentResponse",
            json!({"scores": [
                {"name": "Acme", "domain": "acme.com", "sentiment": 0.8},
            ]}),
        )
        .on_extract("SiteNameLookup", json!({"name": "Reviews"}))
}

#[tokio::test]
async fn full_cycle_persists_run_mentions_and_details() {
    let store = Arc::new(MemoryStore::new());
    let acme = store.add_company("Acme", "acme.com");
    store.add_prompt(acme.id, PROMPT, &["crm"]);

    let orchestrator = Orchestrator::new(
        Arc::clone(&store) as Arc<dyn Store>,
        vec![answering_provider()],
        Arc::new(extraction_provider()),
        None,
        &test_config(),
    );

    let stats = orchestrator.run(None).await.unwrap();

    assert_eq!(stats.companies_processed, 1);
    assert_eq!(stats.items_total, 1);
    assert_eq!(stats.items_failed, 0);
    assert_eq!(stats.runs_created, 1);
    // The duplicate Acme wire mention deduplicates; two companies remain.
    assert_eq!(stats.mentions_stored, 2);
    // Only acme.com/blog shares a domain with a mentioned company.
    assert_eq!(stats.details_stored, 1);

    assert_eq!(store.run_count(), 1);
    assert_eq!(store.mention_count(), 2);

    // Rival was created opportunistically from the answer.
    assert!(store.companies().iter().any(|c| c.domain == "rival.com"));

    // Both citation URLs were upserted; the review site got its resolved name.
    let sources = store.sources();
    assert_eq!(sources.len(), 2);
    let review = sources.iter().find(|s| s.domain == "reviews.example").unwrap();
    assert_eq!(review.name.as_deref(), Some("Reviews"));
    assert_eq!(store.source_urls().len(), 2);

    let details = store.details();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].count, 1);

    // Sentiment joined: Acme scored, Rival defaulted to 0.
    let runs = store
        .runs_with_mentions(acme.id, Utc::now() - Duration::days(1), Utc::now() + Duration::days(1))
        .await
        .unwrap();
    let mentions = &runs[0].mentions;
    let acme_sentiment = mentions
        .iter()
        .find(|m| m.company_id == acme.id)
        .unwrap()
        .sentiment;
    assert_eq!(acme_sentiment, 0.8);
    assert!(mentions.iter().any(|m| m.company_id != acme.id && m.sentiment == 0.0));
}

#[tokio::test]
async fn skip_existing_prevents_same_day_duplicates() {
    let store = Arc::new(MemoryStore::new());
    let acme = store.add_company("Acme", "acme.com");
    store.add_prompt(acme.id, PROMPT, &["crm"]);

    let mut config = test_config();
    config.skip_existing = true;

    let orchestrator = Orchestrator::new(
        Arc::clone(&store) as Arc<dyn Store>,
        vec![answering_provider()],
        Arc::new(extraction_provider()),
        None,
        &config,
    );

    let first = orchestrator.run(None).await.unwrap();
    assert_eq!(first.runs_created, 1);

    let second = orchestrator.run(None).await.unwrap();
    assert_eq!(second.runs_created, 0);
    assert_eq!(second.items_skipped, 1);
    assert_eq!(store.run_count(), 1);
}

#[tokio::test]
async fn failed_item_is_isolated_by_default() {
    let store = Arc::new(MemoryStore::new());
    let acme = store.add_company("Acme", "acme.com");
    // Only the second prompt has a registered answer; the first fails.
    store.add_prompt(acme.id, "Unanswerable question", &["crm"]);
    store.add_prompt(acme.id, PROMPT, &["crm"]);

    let orchestrator = Orchestrator::new(
        Arc::clone(&store) as Arc<dyn Store>,
        vec![answering_provider()],
        Arc::new(extraction_provider()),
        None,
        &test_config(),
    );

    let stats = orchestrator.run(None).await.unwrap();
    assert_eq!(stats.items_total, 2);
    assert_eq!(stats.items_failed, 1);
    assert_eq!(stats.runs_created, 1);
    assert_eq!(store.run_count(), 1);
}

#[tokio::test]
async fn stop_on_error_aborts_remaining_work() {
    let store = Arc::new(MemoryStore::new());
    let acme = store.add_company("Acme", "acme.com");
    // Topics iterate lexicographically, so the failing item runs first.
    store.add_prompt(acme.id, "Unanswerable question", &["aaa"]);
    store.add_prompt(acme.id, PROMPT, &["crm"]);

    let mut config = test_config();
    config.stop_on_error = true;

    let orchestrator = Orchestrator::new(
        Arc::clone(&store) as Arc<dyn Store>,
        vec![answering_provider()],
        Arc::new(extraction_provider()),
        None,
        &config,
    );

    let result = orchestrator.run(None).await;
    assert!(result.is_err());
    assert_eq!(store.run_count(), 0);
}

#[tokio::test]
async fn malformed_extraction_fails_the_iteration() {
    let store = Arc::new(MemoryStore::new());
    let acme = store.add_company("Acme", "acme.com");
    store.add_prompt(acme.id, PROMPT, &["crm"]);

    let extraction = MockProvider::new("anthropic")
        .on_extract("MentionResponse", json!({"mentions": "not a list"}));

    let orchestrator = Orchestrator::new(
        Arc::clone(&store) as Arc<dyn Store>,
        vec![answering_provider()],
        Arc::new(extraction),
        None,
        &test_config(),
    );

    let stats = orchestrator.run(None).await.unwrap();
    assert_eq!(stats.items_failed, 1);
    assert_eq!(store.run_count(), 0);
}

#[tokio::test]
async fn missing_domains_go_through_the_resolver() {
    let store = Arc::new(MemoryStore::new());
    let acme = store.add_company("Acme", "acme.com");
    store.add_prompt(acme.id, PROMPT, &["crm"]);

    let answering = Arc::new(MockProvider::new("anthropic").on_answer(
        PROMPT,
        "Nameless Co leads the market.",
        &[],
    ));
    let extraction = MockProvider::new("anthropic")
        .on_extract(
            "MentionResponse",
            json!({"mentions": [{"name": "Nameless Co", "domain": null}]}),
        )
        .on_extract("SentimentResponse", json!({"scores": []}))
        .on_extract("DomainLookup", json!({"domain": "nameless.io"}));

    let orchestrator = Orchestrator::new(
        Arc::clone(&store) as Arc<dyn Store>,
        vec![answering],
        Arc::new(extraction),
        None,
        &test_config(),
    );

    let stats = orchestrator.run(None).await.unwrap();
    assert_eq!(stats.runs_created, 1);
    assert_eq!(stats.mentions_stored, 1);
    assert!(store.companies().iter().any(|c| c.domain == "nameless.io"));
}

#[tokio::test]
async fn scoped_run_processes_one_company_only() {
    let store = Arc::new(MemoryStore::new());
    let acme = store.add_company("Acme", "acme.com");
    let other = store.add_company("Other", "other.com");
    store.add_prompt(acme.id, PROMPT, &["crm"]);
    store.add_prompt(other.id, "Unrelated prompt", &["erp"]);

    let orchestrator = Orchestrator::new(
        Arc::clone(&store) as Arc<dyn Store>,
        vec![answering_provider()],
        Arc::new(extraction_provider()),
        None,
        &test_config(),
    );

    let stats = orchestrator.run(Some(acme.id)).await.unwrap();
    assert_eq!(stats.companies_processed, 1);
    assert_eq!(stats.runs_created, 1);
    assert_eq!(store.run_count(), 1);
}
