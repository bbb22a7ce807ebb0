//! Greedy clustering of near-duplicate heading strings.
//!
//! Headings pooled from every competitor page are grouped into themes. Each incoming
//! heading is compared (case-insensitively) against the representative of every existing
//! cluster, in creation order. The result depends on input order: callers pool headings
//! in a fixed order (competitor rank) before clustering.

use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// How a heading picks among several qualifying clusters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// First cluster (creation order) whose representative clears the threshold.
    #[default]
    FirstMatch,
    /// Cluster with the highest representative similarity; earliest wins ties.
    BestMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    /// First-seen heading of the cluster.
    pub representative: String,
    /// Distinct member strings in arrival order; includes the representative.
    pub members: Vec<String>,
}

/// Ratcliff/Obershelp similarity: `2*M / T`, where `M` counts chars in matching blocks
/// (longest common block first, then recursively left and right of it) and `T` is the
/// combined length. Returns `1.0` for two empty strings.
///
/// Matches `difflib.SequenceMatcher.ratio()` for inputs below its 200-element
/// auto-junk cutoff.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    similarity_chars(&a, &b)
}

fn similarity_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(a, b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0usize;
    let mut stack = vec![(0usize, a.len(), 0usize, b.len())];
    while let Some((alo, ahi, blo, bhi)) = stack.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            stack.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            stack.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Ties resolve to the block that starts earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0usize);
    // prev[jj]: length of the common run ending at a[i-1] and b[blo + jj - 1].
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let jj = j - blo + 1;
            if a[i] == b[j] {
                let k = prev[jj - 1] + 1;
                cur[jj] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            } else {
                cur[jj] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (best_i, best_j, best_k)
}

/// Cluster headings and return every cluster with its members.
///
/// A heading seen before (case-insensitively) joins the cluster it was first placed in.
pub fn cluster_with<S: AsRef<str>>(
    headings: &[S],
    threshold: f64,
    strategy: ClusterStrategy,
) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    // Lowercased representative chars, parallel to `clusters`.
    let mut keys: Vec<Vec<char>> = Vec::new();
    // Lowercased heading -> cluster it was placed in; repeats go back to the same cluster.
    let mut placed: HashMap<String, usize> = HashMap::new();

    for h in headings {
        let h = h.as_ref();
        let lower = h.to_lowercase();
        if let Some(&idx) = placed.get(&lower) {
            let c = &mut clusters[idx];
            if !c.members.iter().any(|m| m == h) {
                c.members.push(h.to_string());
            }
            continue;
        }
        let key: Vec<char> = lower.chars().collect();

        let target = match strategy {
            ClusterStrategy::FirstMatch => keys
                .iter()
                .position(|rep| similarity_chars(&key, rep) >= threshold),
            ClusterStrategy::BestMatch => {
                let mut best: Option<(usize, f64)> = None;
                for (idx, rep) in keys.iter().enumerate() {
                    let s = similarity_chars(&key, rep);
                    if s >= threshold && best.map_or(true, |(_, b)| s > b) {
                        best = Some((idx, s));
                    }
                }
                best.map(|(idx, _)| idx)
            }
        };

        let idx = match target {
            Some(idx) => {
                clusters[idx].members.push(h.to_string());
                idx
            }
            None => {
                clusters.push(Cluster {
                    representative: h.to_string(),
                    members: vec![h.to_string()],
                });
                keys.push(key);
                clusters.len() - 1
            }
        };
        placed.insert(lower, idx);
    }

    clusters
}

/// First-match clustering; returns representatives in cluster-creation order.
pub fn cluster_headings<S: AsRef<str>>(headings: &[S], threshold: f64) -> Vec<String> {
    cluster_with(headings, threshold, ClusterStrategy::FirstMatch)
        .into_iter()
        .map(|c| c.representative)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn similarity_matches_known_ratios() {
        // difflib.SequenceMatcher(None, "abcd", "bcde").ratio() == 0.75
        assert!(approx(similarity("abcd", "bcde"), 0.75));
        // 8 matching chars out of 18 total.
        assert!(approx(similarity("seo tips", "seo tips!!"), 16.0 / 18.0));
        assert!(approx(similarity("", ""), 1.0));
        assert!(approx(similarity("abc", ""), 0.0));
        assert!(approx(similarity("same", "same"), 1.0));
    }

    #[test]
    fn similarity_recurses_on_both_sides_of_the_longest_block() {
        // Longest block "bcd"; then "a"/"a" on the left and "e"/"e" on the right.
        assert!(approx(similarity("abcde", "axbcdye"), 2.0 * 5.0 / 12.0));
    }

    #[test]
    fn merges_case_insensitive_near_duplicates() {
        let reps = cluster_headings(&["SEO Tips", "seo tips!!", "Pricing Guide"], 0.75);
        assert_eq!(reps, vec!["SEO Tips", "Pricing Guide"]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let empty: [&str; 0] = [];
        assert!(cluster_headings(&empty, DEFAULT_THRESHOLD).is_empty());
    }

    #[test]
    fn threshold_one_only_merges_identical_strings() {
        let reps = cluster_headings(&["FAQ", "faq", "FAQs", "FAQ"], 1.0);
        assert_eq!(reps, vec!["FAQ", "FAQs"]);
    }

    #[test]
    fn tiny_threshold_merges_everything_into_first_cluster() {
        let clusters = cluster_with(
            &["Pricing", "Features", "Integrations"],
            1e-9,
            ClusterStrategy::FirstMatch,
        );
        // "Features" and "Integrations" share chars with "pricing".
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].representative, "Pricing");
        assert_eq!(clusters[0].members.len(), 3);
    }

    #[test]
    fn members_stay_within_threshold_of_representative() {
        let input = [
            "What is project management software?",
            "What is Project Management Software",
            "Best project management tools",
            "Best project management tools 2024",
            "Pricing",
            "pricing plans",
        ];
        for c in cluster_with(&input, 0.75, ClusterStrategy::FirstMatch) {
            for m in &c.members {
                assert!(
                    similarity(&m.to_lowercase(), &c.representative.to_lowercase()) >= 0.75,
                    "{m} vs {}",
                    c.representative
                );
            }
        }
    }

    #[test]
    fn raising_threshold_never_reduces_cluster_count_on_fixed_input() {
        let input = [
            "How to choose project management software",
            "How to Choose Project Management Software?",
            "Top 10 project management tools",
            "Top 10 Project Management Tools for 2024",
            "Pricing comparison",
            "Pricing",
            "FAQ",
            "Frequently asked questions",
        ];
        let mut prev = 0usize;
        for t in [0.05, 0.25, 0.5, 0.75, 0.9, 1.0] {
            let n = cluster_headings(&input, t).len();
            assert!(n >= prev, "t={t}: {n} < {prev}");
            prev = n;
        }
        assert_eq!(prev, input.len());
    }

    #[test]
    fn first_match_and_best_match_can_disagree() {
        // The third heading clears 0.6 against both representatives (0.625 vs 0.733).
        let input = ["Pricing plans", "FAQ section", "Pricing FAQ section"];

        let first = cluster_with(&input, 0.6, ClusterStrategy::FirstMatch);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].members, vec!["Pricing plans", "Pricing FAQ section"]);
        assert_eq!(first[1].members, vec!["FAQ section"]);

        let best = cluster_with(&input, 0.6, ClusterStrategy::BestMatch);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].members, vec!["Pricing plans"]);
        assert_eq!(best[1].members, vec!["FAQ section", "Pricing FAQ section"]);
    }

    #[test]
    fn repeated_heading_stays_in_its_first_cluster() {
        // The repeat is closer to "pricing" (created after the first placement) but must
        // not become a member of a second cluster.
        let input = ["review", "review pricing", "pricing", "Review Pricing", "review pricing"];
        for strategy in [ClusterStrategy::FirstMatch, ClusterStrategy::BestMatch] {
            let clusters = cluster_with(&input[..], 0.55, strategy);
            let reps: Vec<&str> = clusters.iter().map(|c| c.representative.as_str()).collect();
            assert_eq!(reps, vec!["review", "pricing"], "{strategy:?}");
            assert_eq!(
                clusters[0].members,
                vec!["review", "review pricing", "Review Pricing"],
                "{strategy:?}"
            );
            assert_eq!(clusters[1].members, vec!["pricing"], "{strategy:?}");
        }
    }

    proptest! {
        #[test]
        fn similarity_is_bounded_and_reflexive(a in ".{0,40}", b in ".{0,40}") {
            let s = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
            prop_assert!(approx(similarity(&a, &a), 1.0));
        }

        #[test]
        fn every_input_lands_in_exactly_one_cluster(
            input in prop::collection::vec("[a-dA-D ]{1,8}", 0..30),
            t in 0.05f64..1.0,
            best in any::<bool>(),
        ) {
            let strategy = if best { ClusterStrategy::BestMatch } else { ClusterStrategy::FirstMatch };
            let clusters = cluster_with(input.as_slice(), t, strategy);
            let mut distinct = input.clone();
            distinct.sort();
            distinct.dedup();
            let members: usize = clusters.iter().map(|c| c.members.len()).sum();
            prop_assert_eq!(members, distinct.len());
            for s in &input {
                let homes = clusters.iter().filter(|c| c.members.contains(s)).count();
                prop_assert_eq!(homes, 1, "{:?} is in {} clusters", s, homes);
            }
        }
    }
}
