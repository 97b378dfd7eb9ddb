use std::collections::BTreeMap;

use crate::merge;
use crate::model::{MatchEntry, MatchKey, MatchSet, PriorRow, RowStatus};

/// Result of comparing a freshly computed match set with the prior
/// snapshot for the same (item, target site).
#[derive(Debug)]
pub struct DiffOutcome {
    pub status: RowStatus,
    /// The set to emit: the fresh set, or fresh merged with prior when the
    /// matches moved.
    pub final_set: MatchSet,
    /// Prior rows displaced by the new result.
    pub superseded: Vec<PriorRow>,
}

/// Group prior output rows by (item, target site).
///
/// Rows already marked Superseded are skipped: they were displaced by the
/// run that wrote them, so only the surviving rows describe the last
/// known match set.
pub fn group_prior(rows: &[PriorRow]) -> BTreeMap<MatchKey, Vec<PriorRow>> {
    let mut grouped: BTreeMap<MatchKey, Vec<PriorRow>> = BTreeMap::new();
    for row in rows {
        if row.row_status == RowStatus::Superseded {
            continue;
        }
        grouped
            .entry(MatchKey {
                item_id: row.item_id.clone(),
                target_site: row.target_site.clone(),
            })
            .or_default()
            .push(row.clone());
    }
    for rows in grouped.values_mut() {
        rows.sort_by_key(|r| r.rank);
    }
    grouped
}

/// Rebuild the prior match set from its grouped output rows.
pub fn prior_set(rows: &[PriorRow]) -> MatchSet {
    let mut entries: Vec<MatchEntry> = Vec::with_capacity(rows.len());
    for row in rows {
        match entries
            .iter_mut()
            .find(|e| e.description == row.match_description)
        {
            Some(existing) => existing.members.extend(row.match_item_ids.iter().cloned()),
            None => entries.push(MatchEntry {
                description: row.match_description.clone(),
                score: row.match_score,
                members: row.match_item_ids.clone(),
            }),
        }
    }
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    MatchSet::from_ranked(entries)
}

/// Classify a fresh match set against the prior snapshot for one key.
///
/// No prior rows means the pair is new. An identical set (same
/// descriptions, scores and members, rank order aside) is unchanged.
/// Anything else supersedes the prior rows and emits the merged set.
pub fn classify(fresh: &MatchSet, prior: Option<&[PriorRow]>, top_n: usize) -> DiffOutcome {
    let prior = match prior {
        Some(rows) if !rows.is_empty() => rows,
        _ => {
            return DiffOutcome {
                status: RowStatus::New,
                final_set: fresh.clone(),
                superseded: Vec::new(),
            }
        }
    };
    let old_set = prior_set(prior);
    if fresh.same_matches(&old_set) {
        return DiffOutcome {
            status: RowStatus::Unchanged,
            final_set: fresh.clone(),
            superseded: Vec::new(),
        };
    }
    DiffOutcome {
        status: RowStatus::New,
        final_set: merge::merge(fresh, &old_set, top_n),
        superseded: prior.to_vec(),
    }
}
