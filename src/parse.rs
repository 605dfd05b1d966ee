//! Provider response parsing.
//!
//! Only the fields the resolver reads are modelled; everything else in the
//! payloads is ignored.

use crate::error::{ResolveError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// CrossRef wraps every payload in `{"message": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct CrossrefEnvelope<T> {
    pub message: T,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CrossrefWorkList {
    #[serde(default)]
    pub items: Vec<CrossrefWork>,
}

/// A CrossRef work record, as returned by `works/{doi}` and search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefWork {
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub author: Vec<CrossrefAuthor>,
    #[serde(rename = "container-title", default)]
    pub container_title: Vec<String>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub page: Option<String>,
    pub publisher: Option<String>,
    pub published: Option<CrossrefDate>,
    #[serde(rename = "published-print")]
    pub published_print: Option<CrossrefDate>,
    #[serde(rename = "published-online")]
    pub published_online: Option<CrossrefDate>,
    pub issued: Option<CrossrefDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefAuthor {
    pub given: Option<String>,
    pub family: Option<String>,
    /// Organizational authors carry only a name.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefDate {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i64>>>,
}

impl CrossrefWork {
    /// First non-empty title.
    pub fn first_title(&self) -> Option<&str> {
        self.title
            .iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
    }

    /// First non-empty container (journal, proceedings, series).
    pub fn container(&self) -> Option<&str> {
        self.container_title
            .iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    /// Publication year, preferring `published` over print, online, issued.
    pub fn year(&self) -> Option<i64> {
        [
            &self.published,
            &self.published_print,
            &self.published_online,
            &self.issued,
        ]
        .into_iter()
        .flatten()
        .find_map(|date| date.date_parts.first()?.first().copied().flatten())
    }
}

impl CrossrefAuthor {
    /// "Family, Given" or whatever part is present.
    pub fn bibtex_name(&self) -> Option<String> {
        let family = self.family.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let given = self.given.as_deref().map(str::trim).filter(|s| !s.is_empty());
        match (family, given) {
            (Some(family), Some(given)) => Some(format!("{}, {}", family, given)),
            (Some(family), None) => Some(family.to_string()),
            (None, Some(given)) => Some(given.to_string()),
            (None, None) => self
                .name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }
}

/// Semantic Scholar `paper/search` response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct S2SearchResponse {
    #[serde(default)]
    pub data: Vec<S2Paper>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct S2Paper {
    pub title: Option<String>,
    pub url: Option<String>,
    /// Mixed value types (`CorpusId` is numeric), hence `Value`.
    #[serde(rename = "externalIds")]
    pub external_ids: Option<HashMap<String, serde_json::Value>>,
    #[serde(rename = "citationStyles")]
    pub citation_styles: Option<S2CitationStyles>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct S2CitationStyles {
    pub bibtex: Option<String>,
}

impl S2Paper {
    pub fn doi(&self) -> Option<String> {
        let ids = self.external_ids.as_ref()?;
        ["DOI", "doi"]
            .iter()
            .filter_map(|k| ids.get(*k)?.as_str())
            .map(str::trim)
            .find(|d| !d.is_empty())
            .map(String::from)
    }

    pub fn bibtex(&self) -> Option<&str> {
        self.citation_styles
            .as_ref()?
            .bibtex
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}

/// DBLP `search/publ/api` response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DblpSearchResponse {
    #[serde(default)]
    pub result: DblpResult,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DblpResult {
    #[serde(default)]
    pub hits: DblpHits,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DblpHits {
    #[serde(default)]
    pub hit: OneOrMany<DblpHit>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DblpHit {
    #[serde(default)]
    pub info: DblpInfo,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DblpInfo {
    pub title: Option<String>,
    pub url: Option<String>,
}

/// DBLP returns a bare object instead of a list when there is one hit.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Parse a CrossRef `works/{doi}` response.
pub fn parse_crossref_work(json: &str) -> Result<CrossrefWork> {
    let envelope: CrossrefEnvelope<CrossrefWork> = serde_json::from_str(json)
        .map_err(|e| ResolveError::Parse(format!("Invalid CrossRef work JSON: {}", e)))?;
    Ok(envelope.message)
}

/// Parse a CrossRef `works?query...` response into its items.
pub fn parse_crossref_search(json: &str) -> Result<Vec<CrossrefWork>> {
    let envelope: CrossrefEnvelope<CrossrefWorkList> = serde_json::from_str(json)
        .map_err(|e| ResolveError::Parse(format!("Invalid CrossRef search JSON: {}", e)))?;
    Ok(envelope.message.items)
}

pub(crate) fn parse_s2_search(json: &str) -> Result<Vec<S2Paper>> {
    let response: S2SearchResponse = serde_json::from_str(json)
        .map_err(|e| ResolveError::Parse(format!("Invalid Semantic Scholar JSON: {}", e)))?;
    Ok(response.data)
}

pub(crate) fn parse_dblp_search(json: &str) -> Result<Vec<DblpHit>> {
    let response: DblpSearchResponse = serde_json::from_str(json)
        .map_err(|e| ResolveError::Parse(format!("Invalid DBLP JSON: {}", e)))?;
    Ok(response.result.hits.hit.into_vec())
}

/// Extract the record key from a DBLP URL.
///
/// `https://dblp.org/rec/conf/nips/VaswaniSPUJGKP17` -> `conf/nips/VaswaniSPUJGKP17`
pub fn extract_dblp_key(dblp_url: &str) -> Option<String> {
    const MARKER: &str = "dblp.org/rec/";
    let start = dblp_url.find(MARKER)? + MARKER.len();
    let key = dblp_url[start..]
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
