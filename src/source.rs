//! Capabilities shared by the metadata providers.

use crate::error::{ResolveError, Result};
use crate::types::{MatchSource, ProviderMatch, ReferenceStub};
use async_trait::async_trait;

/// Number of search candidates requested from each provider.
pub const SEARCH_CANDIDATES: u32 = 3;

/// A provider that can try to resolve one stub.
///
/// Implementations swallow transient provider failures and return `Ok(None)`;
/// callers still treat an `Err` as "no match" and move on.
#[async_trait]
pub trait CitationSource: Send + Sync {
    /// Attribution used for matches from this provider.
    fn source(&self) -> MatchSource;

    async fn lookup(&self, stub: &ReferenceStub) -> Result<Option<ProviderMatch>>;
}

/// A provider that can resolve a bare DOI without searching by title.
#[async_trait]
pub trait DoiSource: CitationSource {
    async fn resolve_doi(&self, doi: &str) -> Result<Option<ProviderMatch>>;
}

/// Outcome of a lookup that can also surface a DOI without a citation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoiLookup {
    pub citation: Option<ProviderMatch>,
    /// DOI of the best-scoring candidate, even when it had no citation.
    pub doi: Option<String>,
}

/// A provider whose search results can hand a DOI to another provider.
#[async_trait]
pub trait DoiDiscovery: CitationSource {
    async fn lookup_with_doi(&self, stub: &ReferenceStub) -> Result<DoiLookup>;
}

/// Canonical resolver link for a DOI.
pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi.trim())
}

/// Shorten a title for log lines.
pub(crate) fn log_title(title: &str) -> &str {
    match title.char_indices().nth(80) {
        Some((idx, _)) => &title[..idx],
        None => title,
    }
}

/// Log a swallowed provider failure at a level matching its kind.
pub(crate) fn log_provider_error(source: MatchSource, what: &str, err: &ResolveError) {
    match err {
        ResolveError::Http(e) if e.is_timeout() => {
            tracing::warn!(%source, what, "provider request timed out")
        }
        ResolveError::NotFound(_) | ResolveError::Api { .. } | ResolveError::RateLimited { .. } => {
            tracing::warn!(%source, what, error = %err, "provider returned an error status")
        }
        _ => tracing::error!(%source, what, error = %err, "provider request failed"),
    }
}
