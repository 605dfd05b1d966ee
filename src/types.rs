//! Public types for reference resolution.
//!
//! Stubs come in from the extraction step, resolved citations go out to the
//! serving layer. Both serialize with serde in snake_case.

use crate::config::ResolverConfig;
use serde::{Deserialize, Serialize};

/// A reference parsed out of a document, before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStub {
    /// 1-based position in the source document.
    pub index: u32,
    /// Raw citation text as printed.
    #[serde(default)]
    pub raw_citation: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Authors, usually "Surname, F." but free text is allowed.
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub doi: Option<String>,
    /// Journal, conference, or book title.
    #[serde(default)]
    pub venue: Option<String>,
}

impl ReferenceStub {
    /// A stub with only an index and a title.
    pub fn titled(index: u32, title: impl Into<String>) -> Self {
        Self {
            index,
            raw_citation: String::new(),
            title: Some(title.into()),
            authors: Vec::new(),
            year: None,
            doi: None,
            venue: None,
        }
    }

    /// Same stub with a different DOI substituted.
    pub fn with_doi(&self, doi: impl Into<String>) -> Self {
        Self {
            doi: Some(doi.into()),
            ..self.clone()
        }
    }

    /// Title if present and non-blank.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// DOI if present and non-blank.
    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }
}

/// How well the resolved entry matched the stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    Fuzzy,
    Unmatched,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Matched => "matched",
            MatchStatus::Fuzzy => "fuzzy",
            MatchStatus::Unmatched => "unmatched",
        }
    }

    /// Classify a provider confidence against the configured thresholds.
    pub fn from_confidence(confidence: f64, config: &ResolverConfig) -> Self {
        if confidence >= config.exact_match_threshold {
            MatchStatus::Matched
        } else if confidence >= config.fuzzy_match_threshold {
            MatchStatus::Fuzzy
        } else {
            MatchStatus::Unmatched
        }
    }
}

/// Which provider supplied the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Crossref,
    SemanticScholar,
    Dblp,
    LocalFallback,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Crossref => "crossref",
            MatchSource::SemanticScholar => "semantic_scholar",
            MatchSource::Dblp => "dblp",
            MatchSource::LocalFallback => "local_fallback",
        }
    }
}

impl std::fmt::Display for MatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single provider's answer for one stub.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMatch {
    /// BibTeX entry text.
    pub citation: String,
    /// Confidence in [0, 1]; 1.0 for exact DOI hits.
    pub confidence: f64,
    pub url: Option<String>,
}

impl ProviderMatch {
    /// Build a match, clamping confidence into [0, 1].
    pub fn new(citation: impl Into<String>, confidence: f64, url: Option<String>) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            citation: citation.into(),
            confidence,
            url,
        }
    }
}

/// A stub together with its resolved BibTeX entry and match metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCitation {
    #[serde(flatten)]
    pub stub: ReferenceStub,
    /// Full BibTeX entry.
    pub bibtex: String,
    /// Citation key, unique within a batch after deduplication.
    pub citation_key: String,
    pub match_status: MatchStatus,
    pub match_source: MatchSource,
    /// Canonical URL of the matched work.
    pub url: Option<String>,
}

impl ResolvedCitation {
    pub fn index(&self) -> u32 {
        self.stub.index
    }

    pub fn is_fallback(&self) -> bool {
        self.match_source == MatchSource::LocalFallback
    }
}

/// Resolved batch plus aggregate counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveReport {
    pub references: Vec<ResolvedCitation>,
    pub total_count: usize,
    pub matched_count: usize,
    pub fuzzy_count: usize,
    pub unmatched_count: usize,
    pub processing_time_seconds: f64,
}

impl ResolveReport {
    /// Derive the counts from a finished batch.
    pub fn new(references: Vec<ResolvedCitation>, elapsed: std::time::Duration) -> Self {
        let count = |status: MatchStatus| {
            references
                .iter()
                .filter(|r| r.match_status == status)
                .count()
        };
        let matched_count = count(MatchStatus::Matched);
        let fuzzy_count = count(MatchStatus::Fuzzy);
        let unmatched_count = count(MatchStatus::Unmatched);

        Self {
            total_count: references.len(),
            matched_count,
            fuzzy_count,
            unmatched_count,
            processing_time_seconds: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
            references,
        }
    }
}
