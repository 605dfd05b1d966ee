//! Title normalization and fuzzy similarity.
//!
//! Every adapter scores candidates with [`title_similarity`], so confidences
//! from different providers are comparable.

use similar::{capture_diff_slices, Algorithm, DiffOp};

/// Lowercase, drop punctuation, and collapse whitespace.
///
/// ```
/// use refbib_resolver::similarity::normalize_title;
/// assert_eq!(normalize_title("Attention Is All You Need!"), "attention is all you need");
/// assert_eq!(normalize_title("  A   B  "), "a b");
/// ```
pub fn normalize_title(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two titles in [0, 1].
///
/// Twice the number of characters the shortest edit script keeps, over the
/// combined length of the normalized titles. 0.0 when either side normalizes
/// to nothing.
///
/// ```
/// use refbib_resolver::similarity::title_similarity;
/// assert_eq!(title_similarity("Deep Learning.", "deep learning"), 1.0);
/// ```
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize_title(a).chars().collect();
    let b: Vec<char> = normalize_title(b).chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let kept: usize = capture_diff_slices(Algorithm::Myers, &a, &b)
        .iter()
        .map(|op| match op {
            DiffOp::Equal { len, .. } => *len,
            _ => 0,
        })
        .sum();

    2.0 * kept as f64 / (a.len() + b.len()) as f64
}
