use std::collections::BTreeMap;

use crate::model::{MatchKey, MatchSet, OutputRow, PriorRow, RowStatus};

/// Query-side identity of an item, for filling the left half of a row.
#[derive(Debug, Clone)]
pub struct ItemInfo {
    pub site: String,
    pub description: String,
}

/// Flatten one key's match set into output rows, one per rank.
pub fn rows_for(
    key: &MatchKey,
    set: &MatchSet,
    status: RowStatus,
    info: &ItemInfo,
) -> Vec<OutputRow> {
    set.entries()
        .iter()
        .enumerate()
        .map(|(rank, entry)| OutputRow {
            site: info.site.clone(),
            target_site: key.target_site.clone(),
            item_id: key.item_id.clone(),
            description: info.description.clone(),
            match_description: entry.description.clone(),
            match_item_ids: entry.members.iter().cloned().collect(),
            match_score: entry.score,
            rank,
            matching_row_count: entry.members.len(),
            row_status: status,
        })
        .collect()
}

/// Re-emit a displaced prior row, keeping its original rank and score but
/// marking it Superseded.
pub fn superseded_row(prior: &PriorRow) -> OutputRow {
    OutputRow {
        site: prior.site.clone(),
        target_site: prior.target_site.clone(),
        item_id: prior.item_id.clone(),
        description: prior.description.clone(),
        match_description: prior.match_description.clone(),
        match_item_ids: prior.match_item_ids.iter().cloned().collect(),
        match_score: prior.match_score,
        rank: prior.rank,
        matching_row_count: prior.match_item_ids.len(),
        row_status: RowStatus::Superseded,
    }
}

/// Project classified match sets into the final row list.
///
/// Keys come out in table order (item id, then target site). Within a key
/// the displaced prior rows come first, then the current set by rank, so
/// the audit trail reads displaced-then-replacement.
pub fn project(
    sets: &BTreeMap<MatchKey, (MatchSet, RowStatus)>,
    superseded: &BTreeMap<MatchKey, Vec<PriorRow>>,
    items: &BTreeMap<String, ItemInfo>,
) -> Vec<OutputRow> {
    let mut rows = Vec::new();
    for (key, (set, status)) in sets {
        let info = match items.get(&key.item_id) {
            Some(info) => info,
            // A table key with no known item cannot be rendered; the
            // engine only inserts keys for items it indexed.
            None => continue,
        };
        if let Some(displaced) = superseded.get(key) {
            rows.extend(displaced.iter().map(superseded_row));
        }
        rows.extend(rows_for(key, set, *status, info));
    }
    rows
}
