use std::collections::BTreeSet;

use crate::model::{MatchEntry, MatchSet};

/// Merge two ranked match sets for the same (item, target site).
///
/// Entries concatenate with `a` first, re-rank by score descending (the
/// sort is stable, so `a` wins score ties), then duplicate descriptions
/// collapse into the first occurrence with member sets unioned. The result
/// is truncated to `top_n`.
pub fn merge(a: &MatchSet, b: &MatchSet, top_n: usize) -> MatchSet {
    let mut combined: Vec<MatchEntry> = a
        .entries()
        .iter()
        .chain(b.entries().iter())
        .cloned()
        .collect();
    combined.sort_by(|x, y| {
        y.score
            .partial_cmp(&x.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut merged: Vec<MatchEntry> = Vec::with_capacity(combined.len());
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for entry in combined {
        if seen.insert(entry.description.clone()) {
            merged.push(entry);
        } else if let Some(existing) = merged
            .iter_mut()
            .find(|e| e.description == entry.description)
        {
            existing.members.extend(entry.members);
        }
    }
    merged.truncate(top_n);
    MatchSet::from_ranked(merged)
}
