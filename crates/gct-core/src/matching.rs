//! Approximate string matching for map lookups.
//!
//! Source models spell category and fuel names inconsistently ("Gas CC",
//! "gas-cc", "GAS_CC"). Lookups first normalize, then fall back to the
//! closest candidate within a small edit-distance bound.

/// Lowercase and strip separator characters so that spelling variants of
/// the same name compare equal.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | '.'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let sub = prev[j] + usize::from(ca != cb);
            curr[j + 1] = sub.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Find the candidate closest to `query` after normalization.
///
/// Exact normalized matches win outright. Otherwise the candidate with the
/// smallest edit distance is returned, provided the distance is at most a
/// third of the query length; anything farther is considered a different
/// name, not a misspelling.
pub fn closest_match<'a, I>(query: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized = normalize_name(query);
    let mut best: Option<(&'a str, usize)> = None;
    for candidate in candidates {
        let dist = edit_distance(&normalized, &normalize_name(candidate));
        if dist == 0 {
            return Some(candidate);
        }
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((candidate, dist));
        }
    }
    let cutoff = (normalized.chars().count() / 3).max(1);
    best.filter(|&(_, d)| d <= cutoff).map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize_name("Gas CC"), normalize_name("gas-cc"));
        assert_eq!(normalize_name("GAS_CC"), "gascc");
    }

    #[test]
    fn test_exact_normalized_match() {
        let cands = ["gas-cc", "gas-ct", "coal"];
        assert_eq!(closest_match("Gas CC", cands), Some("gas-cc"));
    }

    #[test]
    fn test_near_match_within_cutoff() {
        let cands = ["hydropower", "geothermal", "battery"];
        assert_eq!(closest_match("hydropowr", cands), Some("hydropower"));
    }

    #[test]
    fn test_distant_query_rejected() {
        let cands = ["wind-ons", "wind-ofs"];
        assert_eq!(closest_match("nuclear", cands), None);
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(closest_match("anything", std::iter::empty()), None);
    }
}
