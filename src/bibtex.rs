//! BibTeX entry helpers: citation keys, escaping, and locally built entries.

use crate::parse::CrossrefWork;
use crate::types::ReferenceStub;
use regex::Regex;
use std::sync::LazyLock;

/// Short words skipped when picking the title word of a citation key.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "of", "in", "on", "at", "to", "for", "and", "or", "is", "are", "was",
    "were", "with", "by", "from", "as", "its", "it", "not", "but", "be", "been", "being",
    "that", "this", "which", "their", "our", "we", "do", "does", "did", "has", "have", "had",
    "can", "may", "will", "shall", "should", "could", "would", "about", "into", "over",
    "than", "then", "so", "no", "nor", "up", "out", "if", "how", "when", "where", "what",
    "who", "whom", "why", "each", "every", "all", "both", "few", "more", "most", "some",
    "any", "via", "using", "through",
];

/// Head of the first entry: `@type{`, the key, and the comma after it.
static ENTRY_HEAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(@\w+\s*\{)\s*([^,\n]*?)\s*(,)").expect("valid regex"));

static LATEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[a-zA-Z]+|\{[^}]+\}|\$[^$]+\$").expect("valid regex")
});

/// Characters kept when the note field quotes raw citation text.
const RAW_NOTE_LIMIT: usize = 300;

/// Citation key of the first entry in `entry`, if any.
pub fn extract_citation_key(entry: &str) -> Option<String> {
    ENTRY_HEAD_RE
        .captures(entry)
        .map(|caps| caps[2].to_string())
        .filter(|key| !key.is_empty())
}

/// Replace the key of the first entry, leaving everything else untouched.
pub fn replace_citation_key(entry: &str, key: &str) -> String {
    ENTRY_HEAD_RE
        .replacen(entry, 1, |caps: &regex::Captures| {
            format!("{}{}{}", &caps[1], key, &caps[3])
        })
        .into_owned()
}

fn surname(author: &str) -> String {
    let author = author.trim();
    let raw = match author.split_once(',') {
        Some((family, _)) => family,
        None => author.split_whitespace().last().unwrap_or(author),
    };
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

fn first_significant_word(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();

    words
        .iter()
        .find(|w| w.len() > 1 && !STOP_WORDS.contains(*w))
        .or_else(|| words.first())
        .map(|w| w.to_string())
        .unwrap_or_default()
}

/// Build a key like `vaswani2017attention`.
///
/// `<first author surname><year><first significant title word>`; missing
/// parts are left out, and an empty result becomes `unknown`.
pub fn generate_citation_key(authors: &[String], year: Option<i32>, title: Option<&str>) -> String {
    let author_part = authors.first().map(|a| surname(a)).unwrap_or_default();
    let year_part = year.map(|y| y.to_string()).unwrap_or_default();
    let title_part = title.map(first_significant_word).unwrap_or_default();

    let key = format!("{author_part}{year_part}{title_part}");
    if key.is_empty() {
        "unknown".to_string()
    } else {
        key
    }
}

/// Key for a stub built from its own fields.
pub fn stub_citation_key(stub: &ReferenceStub) -> String {
    generate_citation_key(&stub.authors, stub.year, stub.title())
}

fn looks_like_latex(value: &str) -> bool {
    LATEX_RE.is_match(value)
}

/// Escape BibTeX special characters in a field value.
///
/// Values that already contain LaTeX markup only get `& % # _` escaped so
/// commands, braces, and math survive.
pub fn escape_bibtex(value: &str) -> String {
    let latex = looks_like_latex(value);
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' | '%' | '#' | '_' => {
                out.push('\\');
                out.push(c);
            }
            _ if latex => out.push(c),
            '\\' => out.push_str(r"\textbackslash{}"),
            '{' | '}' | '$' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str(r"\^{}"),
            '~' => out.push_str(r"\~{}"),
            _ => out.push(c),
        }
    }
    out
}

fn render_entry(entry_type: &str, key: &str, fields: &[(&str, String)]) -> String {
    let body = fields
        .iter()
        .map(|(name, value)| format!("  {} = {{{}}}", name, value))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("@{}{{{},\n{}\n}}", entry_type, key, body)
}

/// `@misc` entry from whatever the stub carries.
pub fn build_fallback_entry(stub: &ReferenceStub) -> String {
    let mut fields: Vec<(&str, String)> = Vec::new();

    if let Some(title) = stub.title() {
        fields.push(("title", escape_bibtex(title)));
    }
    if !stub.authors.is_empty() {
        fields.push(("author", escape_bibtex(&stub.authors.join(" and "))));
    }
    if let Some(year) = stub.year {
        fields.push(("year", year.to_string()));
    }
    if let Some(doi) = stub.doi() {
        fields.push(("doi", escape_bibtex(doi)));
    }
    if let Some(venue) = stub.venue.as_deref().filter(|v| !v.trim().is_empty()) {
        fields.push(("howpublished", escape_bibtex(venue.trim())));
    }
    let raw = stub.raw_citation.trim();
    if !raw.is_empty() {
        let raw: String = raw.chars().take(RAW_NOTE_LIMIT).collect();
        fields.push(("note", format!("Parsed from PDF: {}", escape_bibtex(&raw))));
    }

    render_entry("misc", &stub_citation_key(stub), &fields)
}

/// Entry built from CrossRef work metadata, or `None` without a title.
pub fn build_entry_from_crossref(work: &CrossrefWork) -> Option<String> {
    let title = work.first_title()?;

    let (entry_type, container_field) = match work.work_type.as_deref() {
        Some("proceedings-article") => ("inproceedings", "booktitle"),
        Some("book") | Some("monograph") | Some("edited-book") => ("book", "series"),
        Some("book-chapter") => ("incollection", "booktitle"),
        _ => ("article", "journal"),
    };

    let authors: Vec<String> = work.author.iter().filter_map(|a| a.bibtex_name()).collect();
    let year = work.year();
    let key_year = year.and_then(|y| i32::try_from(y).ok());

    let mut fields: Vec<(&str, String)> = vec![("title", escape_bibtex(title))];
    if !authors.is_empty() {
        fields.push(("author", escape_bibtex(&authors.join(" and "))));
    }
    if let Some(year) = year {
        fields.push(("year", year.to_string()));
    }
    if let Some(doi) = work.doi() {
        fields.push(("doi", escape_bibtex(doi)));
    }
    if let Some(container) = work.container() {
        fields.push((container_field, escape_bibtex(container)));
    }
    let optional = [
        ("volume", &work.volume),
        ("number", &work.issue),
        ("pages", &work.page),
        ("publisher", &work.publisher),
    ];
    for (name, value) in optional {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            fields.push((name, escape_bibtex(value)));
        }
    }

    let key = generate_citation_key(&authors, key_year, Some(title));
    Some(render_entry(entry_type, &key, &fields))
}

/// Trimmed body if it looks like a BibTeX entry.
pub(crate) fn accept_entry(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.starts_with('@') {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_crossref_work;

    fn authors(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_generate_key() {
        assert_eq!(
            generate_citation_key(&authors(&["Vaswani, A."]), Some(2017), Some("Attention Is All You Need")),
            "vaswani2017attention"
        );
    }

    #[test]
    fn test_generate_key_first_last_format_and_stop_words() {
        assert_eq!(
            generate_citation_key(&authors(&["Geoffrey Hinton"]), Some(2006), Some("A Fast Learning Algorithm")),
            "hinton2006fast"
        );
    }

    #[test]
    fn test_generate_key_omits_missing_parts() {
        assert_eq!(generate_citation_key(&[], Some(2020), Some("On the Origin")), "2020origin");
        assert_eq!(generate_citation_key(&authors(&["Smith, J."]), None, None), "smith");
        assert_eq!(generate_citation_key(&[], None, None), "unknown");
        assert_eq!(generate_citation_key(&authors(&["??"]), None, Some("!!")), "unknown");
    }

    #[test]
    fn test_generate_key_all_stop_words_uses_first() {
        assert_eq!(generate_citation_key(&[], None, Some("Of The And")), "of");
    }

    #[test]
    fn test_extract_and_replace_key() {
        let entry = "@article{smith2024shared,\n  title = {A},\n  note = {@misc{other,}}\n}";
        assert_eq!(extract_citation_key(entry).as_deref(), Some("smith2024shared"));

        let replaced = replace_citation_key(entry, "smith2024shared2");
        assert_eq!(
            replaced,
            "@article{smith2024shared2,\n  title = {A},\n  note = {@misc{other,}}\n}"
        );
    }

    #[test]
    fn test_extract_and_replace_agree_on_odd_keys() {
        let spaced = "@inproceedings{ Smith 2024 ,\n  title = {A}\n}";
        assert_eq!(extract_citation_key(spaced).as_deref(), Some("Smith 2024"));
        let replaced = replace_citation_key(spaced, "smith2024a");
        assert_eq!(replaced, "@inproceedings{smith2024a,\n  title = {A}\n}");
        assert_eq!(extract_citation_key(&replaced).as_deref(), Some("smith2024a"));

        let keyless = "@misc{,\n  title = {A}\n}";
        assert_eq!(extract_citation_key(keyless), None);
        assert_eq!(replace_citation_key(keyless, "anon"), "@misc{anon,\n  title = {A}\n}");

        let indented = "\n  @article{k1,\n  title = {A}\n}";
        assert_eq!(extract_citation_key(indented).as_deref(), Some("k1"));
        assert!(replace_citation_key(indented, "k2").contains("@article{k2,"));
    }

    #[test]
    fn test_replace_key_without_entry_is_noop() {
        assert_eq!(replace_citation_key("not bibtex", "k"), "not bibtex");
    }

    #[test]
    fn test_escape_plain_text() {
        assert_eq!(escape_bibtex("R&D 100% #1 a_b"), r"R\&D 100\% \#1 a\_b");
        assert_eq!(escape_bibtex("x^2 ~ y"), r"x\^{}2 \~{} y");
    }

    #[test]
    fn test_escape_keeps_latex() {
        assert_eq!(escape_bibtex(r"The {BERT} model & \emph{more}"), r"The {BERT} model \& \emph{more}");
        assert_eq!(escape_bibtex("Cost $O(n)$"), "Cost $O(n)$");
    }

    #[test]
    fn test_fallback_entry() {
        let stub = ReferenceStub {
            index: 3,
            raw_citation: "Vaswani A. et al. Attention is all you need. 2017.".to_string(),
            title: Some("Attention Is All You Need".to_string()),
            authors: authors(&["Vaswani, A.", "Shazeer, N."]),
            year: Some(2017),
            doi: Some("10.1000/xyz123".to_string()),
            venue: Some("NeurIPS".to_string()),
        };
        let entry = build_fallback_entry(&stub);
        assert!(entry.starts_with("@misc{vaswani2017attention,\n"));
        assert!(entry.contains("  author = {Vaswani, A. and Shazeer, N.}"));
        assert!(entry.contains("  year = {2017}"));
        assert!(entry.contains("  doi = {10.1000/xyz123}"));
        assert!(entry.contains("  howpublished = {NeurIPS}"));
        assert!(entry.contains("  note = {Parsed from PDF: Vaswani A."));
        assert!(entry.ends_with("\n}"));
    }

    #[test]
    fn test_fallback_truncates_raw_text() {
        let mut stub = ReferenceStub::titled(1, "T");
        stub.raw_citation = "x".repeat(1000);
        let entry = build_fallback_entry(&stub);
        assert!(entry.contains(&format!("Parsed from PDF: {}}}", "x".repeat(300))));
    }

    fn work(work_type: &str) -> CrossrefWork {
        let json = format!(
            r#"{{"message": {{
                "title": ["Attention Is All You Need"],
                "DOI": "10.1234/test",
                "type": "{work_type}",
                "author": [{{"family": "Vaswani", "given": "Ashish"}}, {{"family": "Shazeer", "given": "Noam"}}],
                "published": {{"date-parts": [[2017]]}},
                "container-title": ["Advances in Neural Information Processing Systems"],
                "volume": "30",
                "page": "5998-6008",
                "publisher": "Curran Associates"
            }}}}"#
        );
        parse_crossref_work(&json).unwrap()
    }

    #[test]
    fn test_crossref_journal_article() {
        let entry = build_entry_from_crossref(&work("journal-article")).unwrap();
        assert!(entry.starts_with("@article{vaswani2017attention,"));
        assert!(entry.contains("title = {Attention Is All You Need}"));
        assert!(entry.contains("author = {Vaswani, Ashish and Shazeer, Noam}"));
        assert!(entry.contains("year = {2017}"));
        assert!(entry.contains("doi = {10.1234/test}"));
        assert!(entry.contains("journal = {Advances in Neural Information Processing Systems}"));
        assert!(entry.contains("volume = {30}"));
        assert!(entry.contains("pages = {5998-6008}"));
        assert!(entry.contains("publisher = {Curran Associates}"));
    }

    #[test]
    fn test_crossref_entry_types() {
        let proceedings = build_entry_from_crossref(&work("proceedings-article")).unwrap();
        assert!(proceedings.starts_with("@inproceedings{"));
        assert!(proceedings.contains("booktitle = {Advances"));

        let book = build_entry_from_crossref(&work("book")).unwrap();
        assert!(book.starts_with("@book{"));
        assert!(book.contains("series = {Advances"));

        let dataset = build_entry_from_crossref(&work("dataset")).unwrap();
        assert!(dataset.starts_with("@article{"));
    }

    #[test]
    fn test_crossref_without_title() {
        let mut w = work("journal-article");
        w.title.clear();
        assert!(build_entry_from_crossref(&w).is_none());
    }

    #[test]
    fn test_accept_entry() {
        assert_eq!(accept_entry("  @book{x,\n}\n").as_deref(), Some("@book{x,\n}"));
        assert!(accept_entry("<html>").is_none());
        assert!(accept_entry("").is_none());
    }
}
