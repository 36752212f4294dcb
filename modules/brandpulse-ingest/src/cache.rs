//! Rate-limited resolver cache.
//!
//! A bounded, TTL-based key→value store whose misses are funneled through a
//! single FIFO dispatch queue releasing one lookup per minimum-interval tick,
//! keeping the aggregate request rate under the provider ceiling. Map and
//! stats share one mutex; the queue has a single-owner dispatch loop, so no
//! eviction can interleave with a lookup.
//!
//! Failed lookups are cached as explicit `None` so the same key cannot
//! trigger repeated failing calls inside the TTL window.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use brandpulse_common::normalize_key;

/// Fraction of entries evicted when the cache is full.
const EVICTION_RATIO: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_size: usize,
    pub ttl: chrono::Duration,
    pub requests_per_minute: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            ttl: chrono::Duration::hours(24),
            requests_per_minute: 45,
        }
    }
}

impl CacheConfig {
    /// Minimum interval between dispatched lookups: ceil(60000 / rpm) ms.
    pub fn min_interval(&self) -> Duration {
        let rpm = u64::from(self.requests_per_minute.max(1));
        Duration::from_millis(60_000_u64.div_ceil(rpm))
    }
}

/// Operational counters, exposed as a snapshot rather than ambient state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entry {
    value: Option<String>,
    inserted_at: DateTime<Utc>,
}

struct Inner {
    map: HashMap<String, Entry>,
    hits: u64,
    misses: u64,
    max_size: usize,
    ttl: chrono::Duration,
}

impl Inner {
    /// Hit (`Some(resolved)`, where `resolved` may be a cached negative) or
    /// miss (`None`). An expired entry is deleted and reported as a miss.
    fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<Option<String>> {
        match self.map.get(key) {
            Some(entry) if now - entry.inserted_at < self.ttl => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.map.remove(key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Like `get_at`, without touching counters or expiring entries. Used by
    /// the dispatch loop to avoid spending a rate slot on a key that warmed
    /// while queued.
    fn peek(&self, key: &str, now: DateTime<Utc>) -> Option<Option<String>> {
        self.map
            .get(key)
            .filter(|entry| now - entry.inserted_at < self.ttl)
            .map(|entry| entry.value.clone())
    }

    fn insert_at(&mut self, key: String, value: Option<String>, now: DateTime<Utc>) {
        if !self.map.contains_key(&key) && self.map.len() >= self.max_size {
            self.evict_oldest();
        }
        self.map.insert(key, Entry { value, inserted_at: now });
    }

    /// Remove the oldest ⌈20%⌉ of entries by last-write timestamp.
    fn evict_oldest(&mut self) {
        let evict_count = ((self.map.len() as f64) * EVICTION_RATIO).ceil() as usize;
        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .map
            .iter()
            .map(|(key, entry)| (key.clone(), entry.inserted_at))
            .collect();
        by_age.sort_by_key(|(_, inserted_at)| *inserted_at);

        for (key, _) in by_age.into_iter().take(evict_count) {
            self.map.remove(&key);
        }
        debug!(evicted = evict_count, size = self.map.len(), "Cache eviction");
    }
}

type LookupFuture = Pin<Box<dyn Future<Output = Option<String>> + Send>>;

/// A deferred lookup, executed by the dispatch loop when its slot comes up.
pub type Lookup = Box<dyn FnOnce() -> LookupFuture + Send>;

struct Job {
    key: String,
    lookup: Lookup,
    reply: oneshot::Sender<Option<String>>,
}

pub struct ResolverCache {
    inner: Arc<Mutex<Inner>>,
    tx: mpsc::UnboundedSender<Job>,
}

impl ResolverCache {
    pub fn new(config: CacheConfig) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            map: HashMap::new(),
            hits: 0,
            misses: 0,
            max_size: config.max_size.max(1),
            ttl: config.ttl,
        }));

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch_loop(rx, Arc::clone(&inner), config.min_interval()));

        Self { inner, tx }
    }

    /// Cached value for `raw_key`, or the result of `lookup` queued behind
    /// the rate limiter. The lookup's outcome (including `None`) is cached.
    pub async fn resolve(&self, raw_key: &str, lookup: Lookup) -> Option<String> {
        let key = normalize_key(raw_key);

        if let Some(value) = self.inner.lock().unwrap().get_at(&key, Utc::now()) {
            return value;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            key,
            lookup,
            reply: reply_tx,
        };
        if self.tx.send(job).is_err() {
            warn!("Resolver dispatch queue is gone, treating lookup as a miss");
            return None;
        }

        reply_rx.await.unwrap_or(None)
    }

    /// Deterministic entry point for tests: lookup at an explicit instant.
    pub fn get_at(&self, raw_key: &str, now: DateTime<Utc>) -> Option<Option<String>> {
        self.inner
            .lock()
            .unwrap()
            .get_at(&normalize_key(raw_key), now)
    }

    /// Deterministic entry point for tests: insert at an explicit instant.
    pub fn set_at(&self, raw_key: &str, value: Option<String>, now: DateTime<Utc>) {
        self.inner
            .lock()
            .unwrap()
            .insert_at(normalize_key(raw_key), value, now);
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.map.len(),
            capacity: inner.max_size,
        }
    }
}

async fn dispatch_loop(
    mut rx: mpsc::UnboundedReceiver<Job>,
    inner: Arc<Mutex<Inner>>,
    min_interval: Duration,
) {
    let mut ticker = tokio::time::interval(min_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    while let Some(job) = rx.recv().await {
        let cached = inner.lock().unwrap().peek(&job.key, Utc::now());
        if let Some(value) = cached {
            let _ = job.reply.send(value);
            continue;
        }

        ticker.tick().await;
        let value = (job.lookup)().await;
        inner
            .lock()
            .unwrap()
            .insert_at(job.key.clone(), value.clone(), Utc::now());
        let _ = job.reply.send(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config(max_size: usize) -> CacheConfig {
        CacheConfig {
            max_size,
            ttl: chrono::Duration::hours(24),
            // High RPM keeps dispatch ticks ~1ms so tests stay fast.
            requests_per_minute: 60_000,
        }
    }

    #[test]
    fn min_interval_rounds_up() {
        let config = CacheConfig {
            requests_per_minute: 45,
            ..CacheConfig::default()
        };
        // ceil(60000 / 45) = 1334
        assert_eq!(config.min_interval(), Duration::from_millis(1334));
    }

    #[tokio::test]
    async fn get_after_set_hits_until_ttl_expires() {
        let cache = ResolverCache::new(test_config(100));
        let t0 = Utc::now();

        cache.set_at("Acme, Inc.", Some("acme.com".to_string()), t0);

        let almost = t0 + chrono::Duration::hours(23);
        assert_eq!(
            cache.get_at("acme inc", almost),
            Some(Some("acme.com".to_string()))
        );

        let expired = t0 + chrono::Duration::hours(24);
        assert_eq!(cache.get_at("acme inc", expired), None);
        // Entry was deleted on expiry, not just skipped.
        assert_eq!(cache.get_at("acme inc", t0), None);
    }

    #[tokio::test]
    async fn negative_results_are_cached() {
        let cache = ResolverCache::new(test_config(100));
        let t0 = Utc::now();

        cache.set_at("ghost co", None, t0);
        assert_eq!(cache.get_at("ghost co", t0), Some(None));
    }

    #[tokio::test]
    async fn overflow_evicts_oldest_fifth() {
        let cache = ResolverCache::new(test_config(10));
        let t0 = Utc::now();

        for i in 0..10 {
            cache.set_at(
                &format!("key {i}"),
                Some(format!("value-{i}")),
                t0 + chrono::Duration::seconds(i),
            );
        }
        assert_eq!(cache.stats().size, 10);

        cache.set_at("key 10", Some("value-10".to_string()), t0 + chrono::Duration::seconds(10));

        // ceil(0.2 × 10) = 2 oldest evicted, then the new entry inserted.
        let stats = cache.stats();
        assert_eq!(stats.size, 9);
        let now = t0 + chrono::Duration::seconds(11);
        assert_eq!(cache.get_at("key 0", now), None);
        assert_eq!(cache.get_at("key 1", now), None);
        assert_eq!(
            cache.get_at("key 2", now),
            Some(Some("value-2".to_string()))
        );
        assert_eq!(
            cache.get_at("key 10", now),
            Some(Some("value-10".to_string()))
        );
    }

    #[tokio::test]
    async fn resolve_runs_lookup_once_and_caches_failures() {
        let cache = ResolverCache::new(test_config(100));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let result = cache
                .resolve(
                    "Unknown Co",
                    Box::new(move || {
                        Box::pin(async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            None
                        })
                    }),
                )
                .await;
            assert_eq!(result, None);
        }

        // First call misses and dispatches; the two others hit the cached
        // negative result.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test]
    async fn stats_report_hit_rate() {
        let cache = ResolverCache::new(test_config(100));
        let t0 = Utc::now();

        cache.set_at("a", Some("1".to_string()), t0);
        assert_eq!(cache.get_at("a", t0), Some(Some("1".to_string())));
        assert_eq!(cache.get_at("b", t0), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.capacity, 100);
    }
}
