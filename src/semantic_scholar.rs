//! Semantic Scholar adapter: title search returning BibTeX and DOIs.

use crate::client::ProviderClient;
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::parse::{parse_s2_search, S2Paper};
use crate::rate_limit::RateLimiter;
use crate::similarity::title_similarity;
use crate::source::{
    doi_url, log_provider_error, log_title, CitationSource, DoiDiscovery, DoiLookup,
    SEARCH_CANDIDATES,
};
use crate::types::{MatchSource, ProviderMatch, ReferenceStub};
use async_trait::async_trait;

/// Fields requested from `paper/search`.
pub const SEARCH_FIELDS: &str = "title,citationStyles,externalIds,url,year,authors,venue";

/// Searches Semantic Scholar by title.
pub struct SemanticScholarSource {
    client: ProviderClient,
    config: ResolverConfig,
}

/// A scored search candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPaper {
    pub score: f64,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub bibtex: Option<String>,
}

impl SemanticScholarSource {
    pub fn new(client: ProviderClient, config: ResolverConfig) -> Self {
        Self { client, config }
    }

    /// Build the adapter with its own rate limiter from `config`.
    pub fn from_config(http: reqwest::Client, config: &ResolverConfig) -> Result<Self> {
        let limiter = RateLimiter::new(config.semantic_scholar_rps)?;
        let client = ProviderClient::new(http, &config.semantic_scholar_base_url, limiter);
        Ok(Self::new(client, config.clone()))
    }

    /// Top search candidates scored against `title`, in response order.
    pub async fn search(&self, title: &str) -> Result<Vec<ScoredPaper>> {
        let limit = SEARCH_CANDIDATES.to_string();
        let params = [
            ("query", title),
            ("limit", limit.as_str()),
            ("fields", SEARCH_FIELDS),
        ];

        let url = self.client.url(&["paper", "search"])?;
        let body = self
            .client
            .get(url, &params, None, self.config.search_timeout)
            .await?;

        Ok(parse_s2_search(&body)?
            .iter()
            .filter_map(|paper| score_paper(title, paper))
            .collect())
    }
}

fn score_paper(title: &str, paper: &S2Paper) -> Option<ScoredPaper> {
    let paper_title = paper.title.as_deref().filter(|t| !t.trim().is_empty())?;
    let doi = paper.doi();
    let url = paper
        .url
        .clone()
        .filter(|u| !u.is_empty())
        .or_else(|| doi.as_deref().map(doi_url));

    Some(ScoredPaper {
        score: title_similarity(title, paper_title),
        url,
        doi,
        bibtex: paper.bibtex().map(String::from),
    })
}

/// Pick the citation and the DOI to hand off from scored candidates.
///
/// The DOI comes from the best-scoring candidate overall; the citation from
/// the best-scoring candidate that carries BibTeX. Nothing is returned when
/// the best overall score is below `threshold`.
fn select(candidates: &[ScoredPaper], threshold: f64) -> DoiLookup {
    let best_by = |with_bibtex: bool| {
        candidates
            .iter()
            .filter(|c| !with_bibtex || c.bibtex.is_some())
            .fold(None::<&ScoredPaper>, |best, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })
    };

    let Some(best) = best_by(false).filter(|b| b.score >= threshold) else {
        return DoiLookup::default();
    };

    let citation = best_by(true)
        .filter(|b| b.score >= threshold)
        .and_then(|b| {
            let entry = b.bibtex.as_deref()?;
            Some(ProviderMatch::new(entry, b.score, b.url.clone()))
        });

    DoiLookup {
        citation,
        doi: best.doi.clone(),
    }
}

#[async_trait]
impl CitationSource for SemanticScholarSource {
    fn source(&self) -> MatchSource {
        MatchSource::SemanticScholar
    }

    async fn lookup(&self, stub: &ReferenceStub) -> Result<Option<ProviderMatch>> {
        Ok(self.lookup_with_doi(stub).await?.citation)
    }
}

#[async_trait]
impl DoiDiscovery for SemanticScholarSource {
    async fn lookup_with_doi(&self, stub: &ReferenceStub) -> Result<DoiLookup> {
        let Some(title) = stub.title() else {
            tracing::debug!(index = stub.index, "skipping Semantic Scholar, no title");
            return Ok(DoiLookup::default());
        };

        let candidates = match self.search(title).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log_provider_error(MatchSource::SemanticScholar, "title search", &e);
                return Ok(DoiLookup::default());
            }
        };

        let outcome = select(&candidates, self.config.fuzzy_match_threshold);
        match (&outcome.citation, &outcome.doi) {
            (Some(found), _) => tracing::info!(
                index = stub.index,
                confidence = found.confidence,
                title = log_title(title),
                "Semantic Scholar matched"
            ),
            (None, Some(doi)) => tracing::info!(
                index = stub.index,
                doi = doi.as_str(),
                title = log_title(title),
                "Semantic Scholar found DOI without BibTeX"
            ),
            (None, None) => tracing::debug!(
                index = stub.index,
                title = log_title(title),
                "no Semantic Scholar match"
            ),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn candidate(score: f64, doi: Option<&str>, bibtex: Option<&str>) -> ScoredPaper {
        ScoredPaper {
            score,
            url: Some(format!("https://www.semanticscholar.org/p/{score}")),
            doi: doi.map(String::from),
            bibtex: bibtex.map(String::from),
        }
    }

    #[test]
    fn test_select_prefers_bibtex_candidate() {
        let outcome = select(
            &[
                candidate(0.95, Some("10.1/best"), None),
                candidate(0.8, Some("10.1/other"), Some("@article{b,}")),
            ],
            0.7,
        );
        let citation = outcome.citation.unwrap();
        assert_eq!(citation.citation, "@article{b,}");
        assert_eq!(citation.confidence, 0.8);
        assert_eq!(outcome.doi.as_deref(), Some("10.1/best"));
    }

    #[test]
    fn test_select_doi_only() {
        let outcome = select(&[candidate(0.92, Some("10.9999/new"), None)], 0.7);
        assert!(outcome.citation.is_none());
        assert_eq!(outcome.doi.as_deref(), Some("10.9999/new"));
    }

    #[test]
    fn test_select_below_threshold() {
        let outcome = select(&[candidate(0.5, Some("10.1/x"), Some("@misc{x,}"))], 0.7);
        assert_eq!(outcome, DoiLookup::default());
    }

    #[test]
    fn test_select_bibtex_candidate_below_threshold() {
        let outcome = select(
            &[
                candidate(0.9, Some("10.1/x"), None),
                candidate(0.4, None, Some("@misc{y,}")),
            ],
            0.7,
        );
        assert!(outcome.citation.is_none());
        assert_eq!(outcome.doi.as_deref(), Some("10.1/x"));
    }

    fn source(server: &Server) -> SemanticScholarSource {
        let config = ResolverConfig {
            semantic_scholar_rps: 100.0,
            ..ResolverConfig::default().with_base_url(server.url())
        };
        SemanticScholarSource::from_config(reqwest::Client::new(), &config).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_with_doi_over_http() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "Attention Is All You Need".into()),
                Matcher::UrlEncoded("limit".into(), "3".into()),
                Matcher::UrlEncoded("fields".into(), SEARCH_FIELDS.into()),
            ]))
            .with_status(200)
            .with_body(
                json!({"data": [{
                    "title": "Attention is All you Need",
                    "url": "https://www.semanticscholar.org/paper/abc",
                    "externalIds": {"DOI": "10.5555/3295222", "CorpusId": 13756489},
                    "citationStyles": {"bibtex": "@inproceedings{Vaswani2017AttentionIA,\n title={Attention is All you Need}\n}"}
                }]})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let outcome = source(&server)
            .lookup_with_doi(&ReferenceStub::titled(1, "Attention Is All You Need"))
            .await
            .unwrap();

        let citation = outcome.citation.unwrap();
        assert_eq!(citation.confidence, 1.0);
        assert!(citation.citation.starts_with("@inproceedings{Vaswani2017AttentionIA,"));
        assert_eq!(citation.url.as_deref(), Some("https://www.semanticscholar.org/paper/abc"));
        assert_eq!(outcome.doi.as_deref(), Some("10.5555/3295222"));
        search.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_empty_outcome() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("GET", "/paper/search")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let outcome = source(&server)
            .lookup_with_doi(&ReferenceStub::titled(1, "Anything"))
            .await
            .unwrap();
        assert_eq!(outcome, DoiLookup::default());
    }

    #[tokio::test]
    async fn test_no_title_skips_request() {
        let mut server = Server::new_async().await;
        let any = server.mock("GET", Matcher::Any).expect(0).create_async().await;

        let mut stub = ReferenceStub::titled(1, "");
        stub.title = None;
        assert!(source(&server).lookup(&stub).await.unwrap().is_none());
        any.assert_async().await;
    }
}
