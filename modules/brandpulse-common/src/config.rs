use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // AI providers
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    /// Provider keys to run prompts against, in order.
    pub providers: Vec<String>,
    pub anthropic_model: String,
    pub openai_model: String,

    // Resolver cache
    pub resolver_rpm: u32,
    pub cache_max_size: usize,
    pub cache_ttl_hours: i64,

    // Batch processor
    pub batch_size: usize,
    pub batch_delay_ms: u64,

    // Orchestrator
    pub max_companies_per_run: usize,
    pub stop_on_error: bool,
    pub skip_existing: bool,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            providers: env::var("PROVIDERS")
                .unwrap_or_else(|_| "anthropic,openai".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-search-preview".to_string()),
            resolver_rpm: parsed_env("RESOLVER_RPM", 45),
            cache_max_size: parsed_env("CACHE_MAX_SIZE", 10_000),
            cache_ttl_hours: parsed_env("CACHE_TTL_HOURS", 24),
            batch_size: parsed_env("BATCH_SIZE", 5),
            batch_delay_ms: parsed_env("BATCH_DELAY_MS", 2_000),
            max_companies_per_run: parsed_env("MAX_COMPANIES_PER_RUN", 50),
            stop_on_error: parsed_env("STOP_ON_ERROR", false),
            skip_existing: parsed_env("SKIP_EXISTING", false),
        }
    }

    /// Log the non-secret knobs at startup.
    pub fn log_redacted(&self) {
        info!(
            providers = ?self.providers,
            anthropic_model = %self.anthropic_model,
            openai_model = %self.openai_model,
            resolver_rpm = self.resolver_rpm,
            cache_max_size = self.cache_max_size,
            cache_ttl_hours = self.cache_ttl_hours,
            batch_size = self.batch_size,
            batch_delay_ms = self.batch_delay_ms,
            max_companies_per_run = self.max_companies_per_run,
            stop_on_error = self.stop_on_error,
            skip_existing = self.skip_existing,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
