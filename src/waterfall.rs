//! Per-reference resolution: CrossRef, then Semantic Scholar (with DOI
//! handoff back to CrossRef), then DBLP, then a locally built entry.

use crate::bibtex::{build_fallback_entry, extract_citation_key, stub_citation_key};
use crate::config::ResolverConfig;
use crate::source::{doi_url, CitationSource, DoiDiscovery, DoiLookup, DoiSource};
use crate::types::{MatchSource, MatchStatus, ProviderMatch, ReferenceStub, ResolvedCitation};
use std::sync::Arc;

/// Tries providers in fixed priority order and stops at the first match.
#[derive(Clone)]
pub struct Waterfall {
    crossref: Arc<dyn DoiSource>,
    semantic_scholar: Arc<dyn DoiDiscovery>,
    dblp: Arc<dyn CitationSource>,
    config: ResolverConfig,
}

impl Waterfall {
    pub fn new(
        crossref: Arc<dyn DoiSource>,
        semantic_scholar: Arc<dyn DoiDiscovery>,
        dblp: Arc<dyn CitationSource>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            crossref,
            semantic_scholar,
            dblp,
            config,
        }
    }

    /// Resolve one stub. Never fails: exhaustion yields a fallback entry.
    pub async fn resolve(&self, stub: &ReferenceStub) -> ResolvedCitation {
        if let Some(found) = self.try_source(self.crossref.as_ref(), stub).await {
            return self.build_resolved(stub, found, MatchSource::Crossref);
        }

        if let Some(resolved) = self.try_semantic_scholar(stub).await {
            return resolved;
        }

        if let Some(found) = self.try_source(self.dblp.as_ref(), stub).await {
            return self.build_resolved(stub, found, MatchSource::Dblp);
        }

        tracing::info!(index = stub.index, "using local fallback entry");
        build_fallback(stub)
    }

    async fn try_source<S>(&self, source: &S, stub: &ReferenceStub) -> Option<ProviderMatch>
    where
        S: CitationSource + ?Sized,
    {
        match source.lookup(stub).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    index = stub.index,
                    source = %source.source(),
                    error = %e,
                    "lookup failed, continuing"
                );
                None
            }
        }
    }

    async fn try_semantic_scholar(&self, stub: &ReferenceStub) -> Option<ResolvedCitation> {
        let DoiLookup { citation, doi } = match self.semantic_scholar.lookup_with_doi(stub).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    index = stub.index,
                    source = %MatchSource::SemanticScholar,
                    error = %e,
                    "lookup failed, continuing"
                );
                return None;
            }
        };

        if let Some(found) = citation {
            return Some(self.build_resolved(stub, found, MatchSource::SemanticScholar));
        }

        // CrossRef already saw the stub's own DOI in the first step.
        let doi = doi.filter(|d| Some(d.as_str()) != stub.doi())?;

        tracing::info!(
            index = stub.index,
            doi = doi.as_str(),
            "handing Semantic Scholar DOI to CrossRef"
        );
        // DOI only: CrossRef's title search already ran for this stub.
        let found = match self.crossref.resolve_doi(&doi).await {
            Ok(found) => found?,
            Err(e) => {
                tracing::warn!(
                    index = stub.index,
                    doi = doi.as_str(),
                    error = %e,
                    "DOI handoff failed, continuing"
                );
                return None;
            }
        };
        Some(self.build_resolved(stub, found, MatchSource::Crossref))
    }

    fn build_resolved(
        &self,
        stub: &ReferenceStub,
        found: ProviderMatch,
        source: MatchSource,
    ) -> ResolvedCitation {
        tracing::info!(
            index = stub.index,
            %source,
            confidence = found.confidence,
            "reference resolved"
        );

        let citation_key =
            extract_citation_key(&found.citation).unwrap_or_else(|| stub_citation_key(stub));

        ResolvedCitation {
            stub: stub.clone(),
            match_status: MatchStatus::from_confidence(found.confidence, &self.config),
            match_source: source,
            citation_key,
            url: found.url,
            bibtex: found.citation,
        }
    }
}

/// Unmatched citation built purely from the stub's own fields.
pub fn build_fallback(stub: &ReferenceStub) -> ResolvedCitation {
    ResolvedCitation {
        stub: stub.clone(),
        bibtex: build_fallback_entry(stub),
        citation_key: stub_citation_key(stub),
        match_status: MatchStatus::Unmatched,
        match_source: MatchSource::LocalFallback,
        url: stub.doi().map(doi_url),
    }
}
