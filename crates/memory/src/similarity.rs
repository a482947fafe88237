//! Token-overlap similarity between problem statements.

/// Normalized token set of a statement: lowercased alphanumeric tokens,
/// deduplicated, sorted.
pub fn signature(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Jaccard overlap of two signatures: |intersection| / |union| in `[0, 1]`.
///
/// Both inputs must be sorted and deduplicated (the [`signature`] form);
/// the merge walk below relies on it.
pub fn jaccard(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut intersection = 0usize;
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                intersection += 1;
                i += 1;
                j += 1;
            }
        }
    }

    let union = a.len() + b.len() - intersection;
    intersection as f32 / union as f32
}
