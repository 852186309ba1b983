// huntwarden/src/clue/text.rs
//
// Small text helpers shared by clue scoring and prompt building.

use std::collections::HashSet;

/// Collapse runs of whitespace; truncate to `max_len` chars with a "..." tail.
pub fn normalize(text: &str, max_len: Option<usize>) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match max_len {
        Some(max) if joined.chars().count() > max => {
            let keep = max.saturating_sub(3);
            let mut out: String = joined.chars().take(keep).collect();
            out.push_str("...");
            out
        }
        _ => joined,
    }
}

/// Edit distance over chars, two-row DP.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() { return b.len(); }
    if b.is_empty() { return a.len(); }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let sub = prev[j] + usize::from(ca != cb);
            cur[j + 1] = sub.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// 1 − distance / longer length. Either side empty → 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() { return 0.0; }
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Jaccard overlap of lowercase word sets.
pub fn word_jaccard(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let wa: HashSet<&str> = a.split_whitespace().collect();
    let wb: HashSet<&str> = b.split_whitespace().collect();
    let union = wa.union(&wb).count();
    if union == 0 { return 0.0; }
    wa.intersection(&wb).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_truncates() {
        assert_eq!(normalize("  find   the\n tower ", None), "find the tower");
        assert_eq!(normalize("abcdefghij", Some(8)), "abcde...");
        assert_eq!(normalize("short", Some(8)), "short");
    }

    #[test]
    fn levenshtein_known_values() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("", "abc"), 0.0);
        assert!((similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-12);
    }

    #[test]
    fn jaccard_ignores_case() {
        assert_eq!(word_jaccard("Find the Tower", "find the tower"), 1.0);
        assert!((word_jaccard("a b", "b c") - 1.0 / 3.0).abs() < 1e-12);
    }
}
