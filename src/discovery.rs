//! Availability probing: is a reference findable in any indexed source?
//!
//! Unlike the resolver, probes report provider errors so the aggregate can
//! tell "not indexed" apart from "every provider failed".

use crate::client::ProviderClient;
use crate::config::ResolverConfig;
use crate::crossref::CrossrefSource;
use crate::dblp::DblpSource;
use crate::error::Result;
use crate::semantic_scholar::SemanticScholarSource;
use crate::similarity::title_similarity;
use crate::source::doi_url;
use crate::types::{MatchSource, ReferenceStub};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    Available,
    Unavailable,
    Error,
    Skipped,
}

impl DiscoveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryStatus::Available => "available",
            DiscoveryStatus::Unavailable => "unavailable",
            DiscoveryStatus::Error => "error",
            DiscoveryStatus::Skipped => "skipped",
        }
    }
}

/// Probe outcome for one reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub index: u32,
    pub discovery_status: DiscoveryStatus,
    /// Providers that found the reference, in probe order.
    #[serde(default)]
    pub available_on: Vec<MatchSource>,
    pub best_confidence: Option<f64>,
    pub best_url: Option<String>,
    pub reason: Option<String>,
}

impl DiscoveryResult {
    fn without_hits(index: u32, status: DiscoveryStatus, reason: &str) -> Self {
        Self {
            index,
            discovery_status: status,
            available_on: Vec::new(),
            best_confidence: None,
            best_url: None,
            reason: Some(reason.to_string()),
        }
    }
}

/// A provider's best candidate for a probed reference.
#[derive(Debug, Clone, PartialEq)]
struct Sighting {
    confidence: f64,
    url: Option<String>,
}

fn best_sighting(candidates: impl IntoIterator<Item = Sighting>) -> Option<Sighting> {
    candidates.into_iter().fold(None, |best, s| match best {
        Some(b) if b.confidence >= s.confidence => Some(b),
        _ => Some(s),
    })
}

/// Checks references against CrossRef, Semantic Scholar, and DBLP.
pub struct DiscoveryService {
    crossref: CrossrefSource,
    semantic_scholar: SemanticScholarSource,
    dblp: DblpSource,
    config: ResolverConfig,
}

impl DiscoveryService {
    pub fn new(
        crossref: CrossrefSource,
        semantic_scholar: SemanticScholarSource,
        dblp: DblpSource,
        config: ResolverConfig,
    ) -> Self {
        Self {
            crossref,
            semantic_scholar,
            dblp,
            config,
        }
    }

    pub fn from_config(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        let http = ProviderClient::build_http(&config.user_agent)?;
        Ok(Self::new(
            CrossrefSource::from_config(http.clone(), &config)?,
            SemanticScholarSource::from_config(http.clone(), &config)?,
            DblpSource::from_config(http, &config)?,
            config,
        ))
    }

    /// Probe every reference. Output order matches input order.
    pub async fn check_all(&self, refs: &[ReferenceStub]) -> Vec<DiscoveryResult> {
        let semaphore = &Semaphore::new(self.config.max_concurrent_lookups);
        join_all(refs.iter().map(|stub| async move {
            if stub.title().is_none() {
                return DiscoveryResult::without_hits(
                    stub.index,
                    DiscoveryStatus::Skipped,
                    "Missing title; cannot run discovery search.",
                );
            }
            let _permit = semaphore.acquire().await.ok();
            self.check_one(stub).await
        }))
        .await
    }

    async fn check_one(&self, stub: &ReferenceStub) -> DiscoveryResult {
        let probes = [
            (MatchSource::Crossref, self.probe_crossref(stub).await),
            (MatchSource::SemanticScholar, self.probe_semantic_scholar(stub).await),
            (MatchSource::Dblp, self.probe_dblp(stub).await),
        ];
        let probe_count = probes.len();

        let mut available_on = Vec::new();
        let mut best: Option<Sighting> = None;
        let mut errors = 0;

        for (source, outcome) in probes {
            match outcome {
                Ok(Some(sighting)) => {
                    available_on.push(source);
                    if best.as_ref().map_or(true, |b| sighting.confidence > b.confidence) {
                        best = Some(sighting);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(index = stub.index, %source, error = %e, "discovery probe failed");
                    errors += 1;
                }
            }
        }

        if let Some(best) = best {
            return DiscoveryResult {
                index: stub.index,
                discovery_status: DiscoveryStatus::Available,
                available_on,
                best_confidence: Some(best.confidence),
                best_url: best.url,
                reason: None,
            };
        }
        if errors == probe_count {
            return DiscoveryResult::without_hits(
                stub.index,
                DiscoveryStatus::Error,
                "All indexed sources failed. Please retry.",
            );
        }
        DiscoveryResult::without_hits(
            stub.index,
            DiscoveryStatus::Unavailable,
            "Not found in indexed sources.",
        )
    }

    fn accept(&self, best: Option<Sighting>) -> Option<Sighting> {
        best.filter(|s| s.confidence >= self.config.fuzzy_match_threshold)
    }

    async fn probe_crossref(&self, stub: &ReferenceStub) -> Result<Option<Sighting>> {
        if let Some(doi) = stub.doi() {
            let work = self.crossref.fetch_work(doi).await?;
            return Ok(Some(Sighting {
                confidence: 1.0,
                url: Some(work.url.unwrap_or_else(|| doi_url(doi))),
            }));
        }

        let Some(title) = stub.title() else {
            return Ok(None);
        };
        let works = self.crossref.search_works(title).await?;
        let best = best_sighting(works.iter().filter_map(|work| {
            Some(Sighting {
                confidence: title_similarity(title, work.first_title()?),
                url: work.url.clone().or_else(|| work.doi().map(doi_url)),
            })
        }));
        Ok(self.accept(best))
    }

    async fn probe_semantic_scholar(&self, stub: &ReferenceStub) -> Result<Option<Sighting>> {
        let Some(title) = stub.title() else {
            return Ok(None);
        };
        let papers = self.semantic_scholar.search(title).await?;
        let best = best_sighting(papers.into_iter().map(|p| Sighting {
            confidence: p.score,
            url: p.url,
        }));
        Ok(self.accept(best))
    }

    async fn probe_dblp(&self, stub: &ReferenceStub) -> Result<Option<Sighting>> {
        let Some(title) = stub.title() else {
            return Ok(None);
        };
        let hits = self.dblp.search(title).await?;
        let best = best_sighting(hits.into_iter().map(|h| Sighting {
            confidence: h.score,
            url: h.url,
        }));
        Ok(self.accept(best))
    }
}
