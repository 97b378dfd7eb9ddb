use std::collections::BTreeSet;

use crate::model::{MatchEntry, MatchSet, SiteIndex};

/// Sentinel description emitted when scoring a pair fails outright.
pub const NOT_FOUND: &str = "NOT FOUND";

/// Jaccard similarity over token sets: |A ∩ B| / |A ∪ B|.
/// Two empty sets score 0.0, not 1.0.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

/// Score one query token set against every distinct description at the
/// target site and keep the best `top_n`.
///
/// `exclude` tokens are removed from a copy of the query only; candidate
/// sets are scored as indexed. Ties break on description, ascending, so
/// ranking is deterministic for equal scores.
pub fn score(
    query: &BTreeSet<String>,
    index: &SiteIndex,
    exclude: &BTreeSet<String>,
    top_n: usize,
) -> MatchSet {
    let effective: BTreeSet<String> = query.difference(exclude).cloned().collect();
    let mut ranked: Vec<MatchEntry> = index
        .by_text
        .values()
        .map(|candidate| MatchEntry {
            description: candidate.text.clone(),
            score: jaccard(&candidate.tokens, &effective),
            members: candidate.members.clone(),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.description.cmp(&b.description))
    });
    ranked.truncate(top_n);
    MatchSet::from_ranked(ranked)
}

/// The fallback match set for a pair whose evaluation failed: `top_n`
/// zero-score sentinel entries with no members, so downstream consumers
/// see a full-width degraded result rather than a hole.
pub fn not_found(top_n: usize) -> MatchSet {
    let sentinel = MatchEntry {
        description: NOT_FOUND.into(),
        score: 0.0,
        members: BTreeSet::new(),
    };
    MatchSet::from_ranked(vec![sentinel; top_n])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_indexes;
    use crate::model::Record;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn record(site: &str, code: &str, desc: &str) -> Record {
        Record {
            site: site.into(),
            stock_code: code.into(),
            item_id: format!("{} & {}", code, site),
            description: desc.into(),
            code: None,
        }
    }

    #[test]
    fn jaccard_identity_is_one() {
        let a = set(&["pump", "hydraulic"]);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_is_symmetric() {
        let a = set(&["pump", "hydraulic", "main"]);
        let b = set(&["pump", "seal"]);
        assert_eq!(jaccard(&a, &b), jaccard(&b, &a));
    }

    #[test]
    fn jaccard_of_empty_sets_is_zero() {
        assert_eq!(jaccard(&set(&[]), &set(&[])), 0.0);
        assert_eq!(jaccard(&set(&["pump"]), &set(&[])), 0.0);
    }

    #[test]
    fn jaccard_partial_overlap() {
        // {a,b} vs {b,c}: 1 shared of 3 total.
        let v = jaccard(&set(&["a", "b"]), &set(&["b", "c"]));
        assert!((v - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn score_ranks_best_first_and_truncates() {
        let index = build_indexes(
            &[
                record("B", "1", "hydraulic pump"),
                record("B", "2", "hydraulic pump seal"),
                record("B", "3", "gasket"),
            ],
            &[],
        );
        let result = score(&set(&["hydraulic", "pump"]), &index["B"], &set(&[]), 2);
        assert_eq!(result.len(), 2);
        assert_eq!(result.entries()[0].description, "hydraulic pump");
        assert_eq!(result.entries()[0].score, 1.0);
        assert_eq!(result.entries()[1].description, "hydraulic pump seal");
    }

    #[test]
    fn equal_scores_break_ties_lexicographically() {
        let index = build_indexes(
            &[record("B", "1", "pump beta"), record("B", "2", "pump alpha")],
            &[],
        );
        let result = score(&set(&["pump", "x"]), &index["B"], &set(&[]), 10);
        assert_eq!(result.entries()[0].description, "pump alpha");
        assert_eq!(result.entries()[1].description, "pump beta");
    }

    #[test]
    fn exclude_tokens_drop_from_query_only() {
        let index = build_indexes(&[record("B", "1", "pump assy")], &[]);
        let full = score(&set(&["pump", "assy"]), &index["B"], &set(&[]), 1);
        let trimmed = score(&set(&["pump", "assy"]), &index["B"], &set(&["assy"]), 1);
        assert_eq!(full.entries()[0].score, 1.0);
        assert!(trimmed.entries()[0].score < 1.0);
    }

    #[test]
    fn not_found_sentinel_shape() {
        let sentinel = not_found(3);
        assert_eq!(sentinel.len(), 3);
        for entry in sentinel.entries() {
            assert_eq!(entry.description, NOT_FOUND);
            assert_eq!(entry.score, 0.0);
            assert!(entry.members.is_empty());
        }
    }
}
