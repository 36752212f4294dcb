//! Domain and site-name resolution through the rate-limited cache.
//!
//! Primary path is a structured lookup against the main adapter; on failure
//! a secondary adapter is tried once, best effort. A lookup that yields
//! nothing is a valid `None` — a ResolutionMiss, cached like any other
//! result — never an error.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::warn;

use ai_client::ProviderAdapter;
use brandpulse_common::canonical_domain;

use crate::cache::{CacheConfig, Lookup, ResolverCache};

const DOMAIN_SYSTEM_PROMPT: &str = "You resolve a company name to the company's primary website domain. \
Return the bare domain (like \"acme.com\" — no scheme, no \"www.\", no path). \
Return null when you do not confidently know the domain.";

const SITE_NAME_SYSTEM_PROMPT: &str = "You resolve a website domain to the site's human-readable name \
(like \"The Verge\" for theverge.com). Return null when you do not confidently know the name.";

#[derive(Debug, Deserialize, JsonSchema)]
struct DomainLookup {
    domain: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SiteNameLookup {
    name: Option<String>,
}

pub struct SourceResolver {
    cache: ResolverCache,
    primary: Arc<dyn ProviderAdapter>,
    fallback: Option<Arc<dyn ProviderAdapter>>,
}

impl SourceResolver {
    pub fn new(
        config: CacheConfig,
        primary: Arc<dyn ProviderAdapter>,
        fallback: Option<Arc<dyn ProviderAdapter>>,
    ) -> Self {
        Self {
            cache: ResolverCache::new(config),
            primary,
            fallback,
        }
    }

    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    /// Canonical domain for a company name, or `None` when unresolvable.
    pub async fn domain_for_company(&self, company_name: &str) -> Option<String> {
        let primary = Arc::clone(&self.primary);
        let fallback = self.fallback.clone();
        let name = company_name.to_string();

        // Keys are namespaced by operation: "domain acme" and "site acme"
        // must not collide after normalization.
        let key = format!("domain {company_name}");
        let lookup: Lookup = Box::new(move || {
            Box::pin(async move {
                with_fallback(primary, fallback, name, |adapter, name| async move {
                    let result: DomainLookup = ai_client::extract(
                        adapter.as_ref(),
                        DOMAIN_SYSTEM_PROMPT,
                        &format!("Company: {name}"),
                    )
                    .await?;
                    Ok(result
                        .domain
                        .map(|d| canonical_domain(&d))
                        .filter(|d| !d.is_empty()))
                })
                .await
            })
        });

        self.cache.resolve(&key, lookup).await
    }

    /// Human-readable site name for a canonical domain.
    pub async fn site_name(&self, domain: &str) -> Option<String> {
        let primary = Arc::clone(&self.primary);
        let fallback = self.fallback.clone();
        let domain = domain.to_string();

        let key = format!("site {domain}");
        let lookup: Lookup = Box::new(move || {
            Box::pin(async move {
                with_fallback(primary, fallback, domain, |adapter, domain| async move {
                    let result: SiteNameLookup = ai_client::extract(
                        adapter.as_ref(),
                        SITE_NAME_SYSTEM_PROMPT,
                        &format!("Domain: {domain}"),
                    )
                    .await?;
                    Ok(result
                        .name
                        .map(|n| n.trim().to_string())
                        .filter(|n| !n.is_empty()))
                })
                .await
            })
        });

        self.cache.resolve(&key, lookup).await
    }
}

/// Try the primary adapter; on error, try the fallback once. A failing
/// fallback yields `None` rather than raising.
async fn with_fallback<F, Fut>(
    primary: Arc<dyn ProviderAdapter>,
    fallback: Option<Arc<dyn ProviderAdapter>>,
    input: String,
    call: F,
) -> Option<String>
where
    F: Fn(Arc<dyn ProviderAdapter>, String) -> Fut,
    Fut: std::future::Future<Output = ai_client::Result<Option<String>>>,
{
    match call(primary, input.clone()).await {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(input = %input, error = %e, "Primary resolver lookup failed");
            let fallback = fallback?;
            match call(fallback, input.clone()).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(input = %input, error = %e, "Fallback resolver lookup failed");
                    None
                }
            }
        }
    }
}
