//! Batch resolution: bounded fan-out, a retry pass for fallbacks, then key
//! deduplication.

use crate::client::ProviderClient;
use crate::config::ResolverConfig;
use crate::crossref::CrossrefSource;
use crate::dblp::DblpSource;
use crate::dedup::deduplicate_citation_keys;
use crate::error::Result;
use crate::semantic_scholar::SemanticScholarSource;
use crate::types::{ReferenceStub, ResolveReport, ResolvedCitation};
use crate::waterfall::Waterfall;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Resolves whole batches of stubs through one [`Waterfall`].
///
/// The providers' rate limiters live as long as the resolver, so reuse one
/// instance across batches.
#[derive(Clone)]
pub struct BatchResolver {
    waterfall: Waterfall,
    config: ResolverConfig,
}

impl BatchResolver {
    pub fn new(waterfall: Waterfall, config: ResolverConfig) -> Self {
        Self { waterfall, config }
    }

    /// Wire up the three HTTP providers from `config`.
    pub fn from_config(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        let http = ProviderClient::build_http(&config.user_agent)?;

        let crossref = CrossrefSource::from_config(http.clone(), &config)?;
        let semantic_scholar = SemanticScholarSource::from_config(http.clone(), &config)?;
        let dblp = DblpSource::from_config(http, &config)?;

        let waterfall = Waterfall::new(
            Arc::new(crossref),
            Arc::new(semantic_scholar),
            Arc::new(dblp),
            config.clone(),
        );
        Ok(Self::new(waterfall, config))
    }

    /// Resolve every stub. Output order matches input order.
    pub async fn resolve_all(&self, stubs: &[ReferenceStub]) -> Vec<ResolvedCitation> {
        tracing::info!(
            count = stubs.len(),
            concurrency = self.config.max_concurrent_lookups,
            "resolving references"
        );

        let semaphore = &Semaphore::new(self.config.max_concurrent_lookups);
        let mut results = join_all(stubs.iter().map(|stub| async move {
            let _permit = semaphore.acquire().await.ok();
            self.waterfall.resolve(stub).await
        }))
        .await;

        self.retry_fallbacks(stubs, &mut results).await;
        deduplicate_citation_keys(results)
    }

    /// Resolve and summarize.
    pub async fn resolve_report(&self, stubs: &[ReferenceStub]) -> ResolveReport {
        let start = Instant::now();
        let references = self.resolve_all(stubs).await;
        let report = ResolveReport::new(references, start.elapsed());

        tracing::info!(
            total = report.total_count,
            matched = report.matched_count,
            fuzzy = report.fuzzy_count,
            unmatched = report.unmatched_count,
            seconds = report.processing_time_seconds,
            "batch resolved"
        );
        report
    }

    /// Second pass over fallbacks; only provider matches replace them.
    async fn retry_fallbacks(&self, stubs: &[ReferenceStub], results: &mut [ResolvedCitation]) {
        let pending: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_fallback())
            .map(|(pos, _)| pos)
            .collect();
        if pending.is_empty() {
            return;
        }

        tracing::info!(count = pending.len(), "retrying unresolved references");

        let semaphore = &Semaphore::new(self.config.retry_concurrency);
        let retried = join_all(pending.into_iter().map(|pos| async move {
            let _permit = semaphore.acquire().await.ok();
            tokio::time::sleep(self.config.retry_delay).await;
            (pos, self.waterfall.resolve(&stubs[pos]).await)
        }))
        .await;

        for (pos, resolved) in retried {
            if !resolved.is_fallback() {
                tracing::info!(
                    index = resolved.index(),
                    source = %resolved.match_source,
                    "resolved on retry"
                );
                results[pos] = resolved;
            }
        }
    }
}
