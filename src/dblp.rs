//! DBLP adapter: title search, then the record's `.bib` export.

use crate::bibtex::accept_entry;
use crate::client::ProviderClient;
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::parse::{extract_dblp_key, parse_dblp_search};
use crate::rate_limit::RateLimiter;
use crate::similarity::title_similarity;
use crate::source::{log_provider_error, log_title, CitationSource, SEARCH_CANDIDATES};
use crate::types::{MatchSource, ProviderMatch, ReferenceStub};
use async_trait::async_trait;

/// Searches DBLP by title and downloads BibTeX for the best hit.
pub struct DblpSource {
    client: ProviderClient,
    config: ResolverConfig,
}

/// A DBLP hit scored against the query title.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
    pub score: f64,
    /// Record URL, e.g. `https://dblp.org/rec/conf/nips/VaswaniSPUJGKP17`.
    pub url: Option<String>,
}

impl DblpSource {
    pub fn new(client: ProviderClient, config: ResolverConfig) -> Self {
        Self { client, config }
    }

    /// Build the adapter with its own rate limiter from `config`.
    pub fn from_config(http: reqwest::Client, config: &ResolverConfig) -> Result<Self> {
        let limiter = RateLimiter::new(config.dblp_rps)?;
        let client = ProviderClient::new(http, &config.dblp_base_url, limiter);
        Ok(Self::new(client, config.clone()))
    }

    /// Top search hits scored against `title`, in response order.
    pub async fn search(&self, title: &str) -> Result<Vec<ScoredHit>> {
        let hits = SEARCH_CANDIDATES.to_string();
        let params = [("q", title), ("format", "json"), ("h", hits.as_str())];

        let url = self.client.url(&["search", "publ", "api"])?;
        let body = self
            .client
            .get(url, &params, None, self.config.search_timeout)
            .await?;

        Ok(parse_dblp_search(&body)?
            .into_iter()
            .filter_map(|hit| {
                // DBLP titles usually end with a period.
                let hit_title = hit.info.title?;
                let hit_title = hit_title.trim().trim_end_matches('.');
                if hit_title.is_empty() {
                    return None;
                }
                Some(ScoredHit {
                    score: title_similarity(title, hit_title),
                    url: hit.info.url,
                })
            })
            .collect())
    }

    /// Download `rec/{key}.bib`.
    pub async fn fetch_bibtex(&self, key: &str) -> Result<Option<String>> {
        let mut segments: Vec<String> = key.split('/').map(String::from).collect();
        if let Some(last) = segments.last_mut() {
            last.push_str(".bib");
        }
        let mut path = vec!["rec"];
        path.extend(segments.iter().map(String::as_str));

        let url = self.client.url(&path)?;
        let body = self
            .client
            .get(url, &[], None, self.config.doi_timeout)
            .await?;

        let entry = accept_entry(&body);
        if entry.is_none() {
            tracing::warn!(key, "DBLP response was not BibTeX");
        }
        Ok(entry)
    }
}

#[async_trait]
impl CitationSource for DblpSource {
    fn source(&self) -> MatchSource {
        MatchSource::Dblp
    }

    async fn lookup(&self, stub: &ReferenceStub) -> Result<Option<ProviderMatch>> {
        let Some(title) = stub.title() else {
            tracing::debug!(index = stub.index, "skipping DBLP, no title");
            return Ok(None);
        };

        let hits = match self.search(title).await {
            Ok(hits) => hits,
            Err(e) => {
                log_provider_error(MatchSource::Dblp, "title search", &e);
                return Ok(None);
            }
        };

        let best = hits.into_iter().fold(None::<ScoredHit>, |best, hit| match best {
            Some(b) if b.score >= hit.score => Some(b),
            _ => Some(hit),
        });
        let Some(best) = best.filter(|b| b.score >= self.config.fuzzy_match_threshold) else {
            tracing::debug!(
                index = stub.index,
                threshold = self.config.fuzzy_match_threshold,
                title = log_title(title),
                "DBLP best match below threshold"
            );
            return Ok(None);
        };

        let rec_url = best.url.unwrap_or_default();
        let Some(key) = extract_dblp_key(&rec_url) else {
            tracing::warn!(url = rec_url.as_str(), "could not extract DBLP record key");
            return Ok(None);
        };

        match self.fetch_bibtex(&key).await {
            Ok(Some(entry)) => {
                tracing::info!(
                    index = stub.index,
                    confidence = best.score,
                    title = log_title(title),
                    "DBLP matched"
                );
                Ok(Some(ProviderMatch::new(entry, best.score, Some(rec_url))))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                log_provider_error(MatchSource::Dblp, "bibtex fetch", &e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const BIBTEX: &str = "@inproceedings{DBLP:conf/nips/VaswaniSPUJGKP17,\n  title = {Attention is All you Need}\n}";

    fn source(server: &Server) -> DblpSource {
        let config = ResolverConfig::default().with_base_url(server.url());
        DblpSource::from_config(reqwest::Client::new(), &config).unwrap()
    }

    fn hit(title: &str, key: &str) -> serde_json::Value {
        json!({"info": {"title": title, "url": format!("https://dblp.org/rec/{key}"), "year": "2017"}})
    }

    #[tokio::test]
    async fn test_lookup_fetches_best_record() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("GET", "/search/publ/api")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "Attention Is All You Need".into()),
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded("h".into(), "3".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({"result": {"hits": {"hit": [
                    hit("Graph Attention Networks.", "conf/iclr/VelickovicCCRLB18"),
                    hit("Attention is All you Need.", "conf/nips/VaswaniSPUJGKP17"),
                ]}}})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let bib = server
            .mock("GET", "/rec/conf/nips/VaswaniSPUJGKP17.bib")
            .with_status(200)
            .with_body(format!("{BIBTEX}\n\n"))
            .expect(1)
            .create_async()
            .await;

        let found = source(&server)
            .lookup(&ReferenceStub::titled(1, "Attention Is All You Need"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.citation, BIBTEX);
        assert_eq!(found.confidence, 1.0);
        assert_eq!(
            found.url.as_deref(),
            Some("https://dblp.org/rec/conf/nips/VaswaniSPUJGKP17")
        );
        search.assert_async().await;
        bib.assert_async().await;
    }

    #[tokio::test]
    async fn test_single_hit_object() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/search/publ/api")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({"result": {"hits": {"hit": hit("Attention is All you Need.", "conf/nips/V17")}}})
                    .to_string(),
            )
            .create_async()
            .await;
        let _bib = server
            .mock("GET", "/rec/conf/nips/V17.bib")
            .with_status(200)
            .with_body(BIBTEX)
            .create_async()
            .await;

        let found = source(&server)
            .lookup(&ReferenceStub::titled(1, "Attention Is All You Need"))
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_search_strips_trailing_period() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/search/publ/api")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"result": {"hits": {"hit": [hit("Deep Learning.", "journals/nature/LeCunBH15")]}}}).to_string())
            .create_async()
            .await;

        let hits = source(&server).search("Deep Learning").await.unwrap();
        assert_eq!(
            hits,
            vec![ScoredHit {
                score: 1.0,
                url: Some("https://dblp.org/rec/journals/nature/LeCunBH15".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_non_bibtex_record_is_no_match() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/search/publ/api")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"result": {"hits": {"hit": [hit("Attention is All you Need.", "conf/nips/V17")]}}}).to_string())
            .create_async()
            .await;
        let _bib = server
            .mock("GET", "/rec/conf/nips/V17.bib")
            .with_status(200)
            .with_body("<!DOCTYPE html>")
            .create_async()
            .await;

        let found = source(&server)
            .lookup(&ReferenceStub::titled(1, "Attention Is All You Need"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_below_threshold_skips_record_fetch() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/search/publ/api")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"result": {"hits": {"hit": [hit("Protein folding dynamics.", "journals/x/P1")]}}}).to_string())
            .create_async()
            .await;
        let bib = server
            .mock("GET", Matcher::Regex(r"^/rec/".to_string()))
            .expect(0)
            .create_async()
            .await;

        let found = source(&server)
            .lookup(&ReferenceStub::titled(1, "Attention Is All You Need"))
            .await
            .unwrap();
        assert!(found.is_none());
        bib.assert_async().await;
    }
}
