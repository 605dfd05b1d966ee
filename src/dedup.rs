//! Batch-wide citation key deduplication.

use crate::bibtex::{generate_citation_key, replace_citation_key};
use crate::types::ResolvedCitation;
use std::collections::HashSet;

/// Make every citation key in the batch unique.
///
/// Citations are visited in order. A key already taken earlier in the batch
/// gets a numeric suffix starting at 2. When the final key differs from the
/// carried one, the key token at the head of the BibTeX entry is rewritten
/// and the rest of the entry is left untouched.
pub fn deduplicate_citation_keys(mut citations: Vec<ResolvedCitation>) -> Vec<ResolvedCitation> {
    let mut used: HashSet<String> = HashSet::with_capacity(citations.len());

    for citation in &mut citations {
        let carried = citation.citation_key.trim();
        let base = if carried.is_empty() {
            generate_citation_key(
                &citation.stub.authors,
                citation.stub.year,
                citation.stub.title(),
            )
        } else {
            carried.to_string()
        };

        let mut key = base.clone();
        let mut suffix = 2u32;
        while used.contains(&key) {
            key = format!("{base}{suffix}");
            suffix += 1;
        }

        if key != citation.citation_key {
            tracing::debug!(
                index = citation.stub.index,
                from = citation.citation_key.as_str(),
                to = key.as_str(),
                "renaming citation key"
            );
            citation.bibtex = replace_citation_key(&citation.bibtex, &key);
            citation.citation_key = key.clone();
        }
        used.insert(key);
    }

    citations
}
