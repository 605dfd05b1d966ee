//! CrossRef adapter: BibTeX by DOI, with title search as fallback.
//!
//! API docs: https://api.crossref.org/swagger-ui/index.html

use crate::bibtex::{accept_entry, build_entry_from_crossref};
use crate::client::ProviderClient;
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::parse::{parse_crossref_search, parse_crossref_work, CrossrefWork};
use crate::rate_limit::RateLimiter;
use crate::similarity::title_similarity;
use crate::source::{
    doi_url, log_provider_error, log_title, CitationSource, DoiSource, SEARCH_CANDIDATES,
};
use crate::types::{MatchSource, ProviderMatch, ReferenceStub};
use async_trait::async_trait;

/// Confidence for an entry built from `works/{doi}` metadata.
const DOI_METADATA_CONFIDENCE: f64 = 0.95;
/// Upper bound for an entry built from a search item.
const SEARCH_METADATA_CONFIDENCE_CAP: f64 = 0.85;

/// Fetches BibTeX from CrossRef by DOI, or by bibliographic title search.
pub struct CrossrefSource {
    client: ProviderClient,
    config: ResolverConfig,
}

impl CrossrefSource {
    pub fn new(client: ProviderClient, config: ResolverConfig) -> Self {
        Self { client, config }
    }

    /// Build the adapter with its own rate limiter from `config`.
    pub fn from_config(http: reqwest::Client, config: &ResolverConfig) -> Result<Self> {
        let limiter = RateLimiter::new(config.crossref_rps)?;
        let client = ProviderClient::new(http, &config.crossref_base_url, limiter);
        Ok(Self::new(client, config.clone()))
    }

    /// Resolve a DOI directly.
    ///
    /// Tries the BibTeX transform first (confidence 1.0), then builds an entry
    /// from the work's JSON metadata (confidence 0.95).
    pub async fn lookup_by_doi(&self, doi: &str) -> Option<ProviderMatch> {
        let url = Some(doi_url(doi));

        if let Some(entry) = self.fetch_bibtex(doi).await {
            tracing::info!(doi, "CrossRef DOI lookup succeeded");
            return Some(ProviderMatch::new(entry, 1.0, url));
        }

        match self.fetch_work(doi).await {
            Ok(work) => {
                if let Some(entry) = build_entry_from_crossref(&work) {
                    tracing::info!(doi, "built BibTeX from CrossRef metadata");
                    return Some(ProviderMatch::new(entry, DOI_METADATA_CONFIDENCE, url));
                }
            }
            Err(e) => log_provider_error(MatchSource::Crossref, "work metadata", &e),
        }

        None
    }

    /// Raw `works/{doi}` metadata.
    pub async fn fetch_work(&self, doi: &str) -> Result<CrossrefWork> {
        let url = self.client.url(&["works", doi])?;
        let body = self
            .client
            .get(url, &[], None, self.config.doi_timeout)
            .await?;
        parse_crossref_work(&body)
    }

    /// Top search candidates for a bibliographic query.
    pub async fn search_works(&self, title: &str) -> Result<Vec<CrossrefWork>> {
        let rows = SEARCH_CANDIDATES.to_string();
        let mut params = vec![("query.bibliographic", title), ("rows", rows.as_str())];
        if let Some(mailto) = self.config.crossref_mailto.as_deref() {
            params.push(("mailto", mailto));
        }

        let url = self.client.url(&["works"])?;
        let body = self
            .client
            .get(url, &params, None, self.config.search_timeout)
            .await?;
        parse_crossref_search(&body)
    }

    async fn fetch_bibtex(&self, doi: &str) -> Option<String> {
        let result = async {
            let url = self
                .client
                .url(&["works", doi, "transform", "application", "x-bibtex"])?;
            self.client
                .get(
                    url,
                    &[],
                    Some("application/x-bibtex"),
                    self.config.doi_timeout,
                )
                .await
        }
        .await;

        match result {
            Ok(body) => {
                let entry = accept_entry(&body);
                if entry.is_none() {
                    tracing::warn!(doi, "CrossRef transform response was not BibTeX");
                }
                entry
            }
            Err(e) => {
                log_provider_error(MatchSource::Crossref, "bibtex transform", &e);
                None
            }
        }
    }

    async fn search_by_title(&self, title: &str) -> Option<ProviderMatch> {
        let items = match self.search_works(title).await {
            Ok(items) => items,
            Err(e) => {
                log_provider_error(MatchSource::Crossref, "title search", &e);
                return None;
            }
        };

        let best = items
            .iter()
            .filter_map(|item| Some((title_similarity(title, item.first_title()?), item)))
            .fold(None::<(f64, &CrossrefWork)>, |best, (score, item)| match best {
                Some((best_score, _)) if best_score >= score => best,
                _ => Some((score, item)),
            });

        let (score, item) = best?;
        let doi = match item.doi() {
            Some(doi) if score >= self.config.fuzzy_match_threshold => doi,
            _ => {
                tracing::debug!(
                    score,
                    threshold = self.config.fuzzy_match_threshold,
                    "CrossRef best title match rejected"
                );
                return None;
            }
        };

        let url = item.url.clone().unwrap_or_else(|| doi_url(doi));

        if let Some(entry) = self.fetch_bibtex(doi).await {
            return Some(ProviderMatch::new(entry, score, Some(url)));
        }

        let entry = build_entry_from_crossref(item)?;
        tracing::info!(doi, "built BibTeX from CrossRef search item");
        Some(ProviderMatch::new(
            entry,
            score.min(SEARCH_METADATA_CONFIDENCE_CAP),
            Some(url),
        ))
    }
}

#[async_trait]
impl CitationSource for CrossrefSource {
    fn source(&self) -> MatchSource {
        MatchSource::Crossref
    }

    async fn lookup(&self, stub: &ReferenceStub) -> Result<Option<ProviderMatch>> {
        if let Some(doi) = stub.doi() {
            if let Some(found) = self.lookup_by_doi(doi).await {
                return Ok(Some(found));
            }
            tracing::warn!(
                index = stub.index,
                doi,
                "CrossRef DOI lookup failed, falling back to title search"
            );
        }

        if let Some(title) = stub.title() {
            if let Some(found) = self.search_by_title(title).await {
                tracing::info!(
                    index = stub.index,
                    confidence = found.confidence,
                    title = log_title(title),
                    "CrossRef title search matched"
                );
                return Ok(Some(found));
            }
        }

        tracing::debug!(index = stub.index, "no CrossRef match");
        Ok(None)
    }
}

#[async_trait]
impl DoiSource for CrossrefSource {
    async fn resolve_doi(&self, doi: &str) -> Result<Option<ProviderMatch>> {
        Ok(self.lookup_by_doi(doi).await)
    }
}
