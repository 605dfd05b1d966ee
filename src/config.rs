//! Resolver configuration.
//!
//! Every component takes a [`ResolverConfig`] in its constructor instead of
//! reading process-wide settings.

use crate::error::{ResolveError, Result};
use std::time::Duration;

pub const CROSSREF_BASE_URL: &str = "https://api.crossref.org";
pub const SEMANTIC_SCHOLAR_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
pub const DBLP_BASE_URL: &str = "https://dblp.org";

/// Thresholds, rates, concurrency caps, and provider endpoints.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub crossref_base_url: String,
    pub semantic_scholar_base_url: String,
    pub dblp_base_url: String,
    /// Contact address for the CrossRef polite pool.
    pub crossref_mailto: Option<String>,
    pub user_agent: String,

    /// Requests per second, per provider.
    pub crossref_rps: f64,
    pub semantic_scholar_rps: f64,
    pub dblp_rps: f64,

    /// Global cap on references resolved at once during the first pass.
    pub max_concurrent_lookups: usize,
    /// Concurrency cap for the second (retry) pass.
    pub retry_concurrency: usize,
    /// Warm-up delay before each second-pass retry.
    pub retry_delay: Duration,

    /// Minimum title similarity for a candidate to be accepted.
    pub fuzzy_match_threshold: f64,
    /// Confidence at or above which a match counts as exact.
    pub exact_match_threshold: f64,

    /// Timeout for direct DOI / record fetches.
    pub doi_timeout: Duration,
    /// Timeout for search queries.
    pub search_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            crossref_base_url: CROSSREF_BASE_URL.to_string(),
            semantic_scholar_base_url: SEMANTIC_SCHOLAR_BASE_URL.to_string(),
            dblp_base_url: DBLP_BASE_URL.to_string(),
            crossref_mailto: Some("refbib-app@proton.me".to_string()),
            user_agent: format!("refbib-resolver/{}", env!("CARGO_PKG_VERSION")),
            crossref_rps: 10.0,
            semantic_scholar_rps: 1.0,
            dblp_rps: 3.0,
            max_concurrent_lookups: 10,
            retry_concurrency: 3,
            retry_delay: Duration::from_millis(500),
            fuzzy_match_threshold: 0.7,
            exact_match_threshold: 0.9,
            doi_timeout: Duration::from_secs(5),
            search_timeout: Duration::from_secs(10),
        }
    }
}

impl ResolverConfig {
    /// Defaults overridden by `REFBIB_*` environment variables.
    ///
    /// Recognized: `REFBIB_CROSSREF_MAILTO`, `REFBIB_CROSSREF_RPS`,
    /// `REFBIB_SEMANTIC_SCHOLAR_RPS`, `REFBIB_DBLP_RPS`,
    /// `REFBIB_MAX_CONCURRENT_LOOKUPS`, `REFBIB_FUZZY_MATCH_THRESHOLD`,
    /// `REFBIB_EXACT_MATCH_THRESHOLD`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(mailto) = std::env::var("REFBIB_CROSSREF_MAILTO") {
            config.crossref_mailto = if mailto.is_empty() { None } else { Some(mailto) };
        }
        if let Some(v) = env_parse("REFBIB_CROSSREF_RPS")? {
            config.crossref_rps = v;
        }
        if let Some(v) = env_parse("REFBIB_SEMANTIC_SCHOLAR_RPS")? {
            config.semantic_scholar_rps = v;
        }
        if let Some(v) = env_parse("REFBIB_DBLP_RPS")? {
            config.dblp_rps = v;
        }
        if let Some(v) = env_parse("REFBIB_MAX_CONCURRENT_LOOKUPS")? {
            config.max_concurrent_lookups = v;
        }
        if let Some(v) = env_parse("REFBIB_FUZZY_MATCH_THRESHOLD")? {
            config.fuzzy_match_threshold = v;
        }
        if let Some(v) = env_parse("REFBIB_EXACT_MATCH_THRESHOLD")? {
            config.exact_match_threshold = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants between fields.
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.fuzzy_match_threshold) || !in_unit(self.exact_match_threshold) {
            return Err(ResolveError::Config(
                "match thresholds must lie in [0, 1]".to_string(),
            ));
        }
        if self.fuzzy_match_threshold > self.exact_match_threshold {
            return Err(ResolveError::Config(format!(
                "fuzzy threshold {} exceeds exact threshold {}",
                self.fuzzy_match_threshold, self.exact_match_threshold
            )));
        }
        if self.max_concurrent_lookups == 0 || self.retry_concurrency == 0 {
            return Err(ResolveError::Config(
                "concurrency limits must be at least 1".to_string(),
            ));
        }
        for (name, rps) in [
            ("crossref", self.crossref_rps),
            ("semantic_scholar", self.semantic_scholar_rps),
            ("dblp", self.dblp_rps),
        ] {
            if !rps.is_finite() || rps <= 0.0 {
                return Err(ResolveError::Config(format!(
                    "{name} rate must be greater than 0 (got {rps})"
                )));
            }
        }
        Ok(())
    }

    /// Point every provider at the same base URL (useful for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.crossref_base_url = url.clone();
        self.semantic_scholar_base_url = url.clone();
        self.dblp_base_url = url;
        self
    }

    /// Override the match thresholds.
    pub fn with_thresholds(mut self, fuzzy: f64, exact: f64) -> Self {
        self.fuzzy_match_threshold = fuzzy;
        self.exact_match_threshold = exact;
        self
    }

    /// Override the first-pass concurrency cap.
    pub fn with_max_concurrent_lookups(mut self, limit: usize) -> Self {
        self.max_concurrent_lookups = limit;
        self
    }

    /// Override the second-pass warm-up delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ResolveError::Config(format!("{name} has invalid value '{raw}'"))),
        Err(_) => Ok(None),
    }
}
