use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::cache::MatchCache;
use crate::config::MatchConfig;
use crate::diff;
use crate::error::MatchError;
use crate::index::{self, build_indexes};
use crate::merge;
use crate::model::{
    MatchEntry, MatchInput, MatchKey, MatchResult, MatchSet, MatchTable, Record, RowStatus,
    RunMeta, RunSummary, SiteIndex,
};
use crate::normalize;
use crate::project::{self, ItemInfo};
use crate::score;

// ---------------------------------------------------------------------------
// Run orchestration
// ---------------------------------------------------------------------------

/// Execute one full matching run.
///
/// Builds site indexes for the current records and for items recovered
/// from the prior snapshot, computes (or loads from `cache`) the ranked
/// match table, diffs it against the prior rows, and projects the result
/// into classified output rows.
pub fn run(
    config: &MatchConfig,
    input: &MatchInput,
    cache: &dyn MatchCache,
) -> Result<MatchResult, MatchError> {
    let old_records = recover_prior_records(input);
    info!(
        "matching {} records ({} recovered from prior snapshot of {} rows)",
        input.records.len(),
        old_records.len(),
        input.prior.len()
    );

    let new_indexes = build_indexes(&input.records, &input.abbreviations);
    let old_indexes = build_indexes(&old_records, &input.abbreviations);
    let merged_indexes = index::merge_indexes(new_indexes.clone(), old_indexes.clone());

    let table = match load_cached(cache) {
        Some(table) => {
            info!("using cached match table ({} pairs)", table.len());
            table
        }
        None => {
            let table = compute_table(
                config,
                input,
                &old_records,
                &new_indexes,
                &old_indexes,
            );
            if let Err(err) = cache.save(&table) {
                warn!("failed to save match table cache: {}", err);
            }
            table
        }
    };

    let prior_groups = diff::group_prior(&input.prior);
    let top_n = config.matching.top_n;
    let mut sets: BTreeMap<MatchKey, (MatchSet, RowStatus)> = BTreeMap::new();
    let mut superseded: BTreeMap<MatchKey, Vec<_>> = BTreeMap::new();
    let mut unchanged_pairs = 0usize;
    for (key, fresh) in table.iter() {
        let outcome = diff::classify(fresh, prior_groups.get(key).map(Vec::as_slice), top_n);
        if outcome.status == RowStatus::Unchanged {
            unchanged_pairs += 1;
            if config.matching.exclude_unchanged {
                continue;
            }
        }
        if !outcome.superseded.is_empty() {
            superseded.insert(key.clone(), outcome.superseded);
        }
        sets.insert(key.clone(), (outcome.final_set, outcome.status));
    }

    let items = item_infos(&input.records, &old_records);
    let rows = project::project(&sets, &superseded, &items);

    let mut summary = RunSummary {
        input_records: input.records.len(),
        prior_rows: input.prior.len(),
        sites: merged_indexes.len(),
        pairs_scored: table.len(),
        rows_emitted: rows.len(),
        unchanged_pairs,
        ..Default::default()
    };
    for row in &rows {
        match row.row_status {
            RowStatus::New => summary.new_rows += 1,
            RowStatus::Superseded => summary.superseded_rows += 1,
            RowStatus::Unchanged => summary.unchanged_rows += 1,
        }
    }
    info!(
        "emitting {} rows ({} new, {} superseded, {} unchanged pairs)",
        summary.rows_emitted, summary.new_rows, summary.superseded_rows, summary.unchanged_pairs
    );

    Ok(MatchResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            top_n,
        },
        summary,
        rows,
    })
}

fn load_cached(cache: &dyn MatchCache) -> Option<MatchTable> {
    match cache.load() {
        Ok(found) => found,
        Err(err) => {
            warn!("failed to load match table cache, recomputing: {}", err);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Prior-record recovery
// ---------------------------------------------------------------------------

/// Rebuild query-side records from the prior snapshot, one per item id not
/// present in the current input. Current records always win on collision.
fn recover_prior_records(input: &MatchInput) -> Vec<Record> {
    let current: BTreeSet<&str> = input.records.iter().map(|r| r.item_id.as_str()).collect();
    let mut recovered: BTreeMap<String, Record> = BTreeMap::new();
    for row in &input.prior {
        if current.contains(row.item_id.as_str()) || recovered.contains_key(&row.item_id) {
            continue;
        }
        // Item ids follow "{stock_code} & {site}"; fall back to the full
        // id when a row predates that convention.
        let stock_code = row
            .item_id
            .strip_suffix(&format!(" & {}", row.site))
            .unwrap_or(&row.item_id)
            .to_string();
        recovered.insert(
            row.item_id.clone(),
            Record {
                site: row.site.clone(),
                stock_code,
                item_id: row.item_id.clone(),
                description: row.description.clone(),
                code: None,
            },
        );
    }
    recovered.into_values().collect()
}

fn item_infos(new: &[Record], old: &[Record]) -> BTreeMap<String, ItemInfo> {
    let mut items = BTreeMap::new();
    for record in new.iter().chain(old.iter()) {
        items.entry(record.item_id.clone()).or_insert_with(|| ItemInfo {
            site: record.site.clone(),
            description: record.description.trim().to_string(),
        });
    }
    items
}

// ---------------------------------------------------------------------------
// Table computation
// ---------------------------------------------------------------------------

/// Compute the full match table over three passes: current records against
/// current sites, current against prior-only, and prior-only against
/// current. Keys landing in more than one pass merge, earlier pass first.
fn compute_table(
    config: &MatchConfig,
    input: &MatchInput,
    old_records: &[Record],
    new_indexes: &BTreeMap<String, SiteIndex>,
    old_indexes: &BTreeMap<String, SiteIndex>,
) -> MatchTable {
    let top_n = config.matching.top_n;
    let exclude: BTreeSet<String> = config
        .matching
        .exclude_tokens
        .iter()
        .map(|t| t.to_lowercase())
        .collect();

    let passes = [
        ("new-vs-new", &input.records[..], new_indexes),
        ("new-vs-old", &input.records[..], old_indexes),
        ("old-vs-new", old_records, new_indexes),
    ];

    let mut table = MatchTable::new();
    for (name, records, targets) in passes {
        let pass = score_pass(records, targets, &input.abbreviations, &exclude, top_n);
        debug!("pass {}: {} pairs", name, pass.len());
        for (key, set) in pass.into_iter() {
            match table.get(&key) {
                Some(existing) => {
                    let merged = merge::merge(existing, &set, top_n);
                    table.insert(key, merged);
                }
                None => table.insert(key, set),
            }
        }
    }
    table
}

/// Score every (record, target site) unit of one pass in parallel. A
/// panicking unit is contained and downgraded to the NOT FOUND sentinel
/// rather than aborting the run.
fn score_pass(
    records: &[Record],
    targets: &BTreeMap<String, SiteIndex>,
    abbreviations: &[crate::model::Abbreviation],
    exclude: &BTreeSet<String>,
    top_n: usize,
) -> MatchTable {
    let units: Vec<(&Record, &String, &SiteIndex)> = records
        .iter()
        .flat_map(|record| {
            targets
                .iter()
                .filter(move |(site, _)| **site != record.site)
                .map(move |(site, index)| (record, site, index))
        })
        .collect();

    let scored: Vec<(MatchKey, MatchSet)> = units
        .into_par_iter()
        .map(|(record, site, index)| {
            let key = MatchKey {
                item_id: record.item_id.clone(),
                target_site: site.clone(),
            };
            let set = catch_unwind(AssertUnwindSafe(|| {
                evaluate(record, index, abbreviations, exclude, top_n)
            }))
            .unwrap_or_else(|_| {
                warn!(
                    "scoring '{}' against site '{}' panicked, recording {}",
                    record.item_id,
                    site,
                    score::NOT_FOUND
                );
                score::not_found(top_n)
            });
            (key, set)
        })
        .collect();

    let mut table = MatchTable::new();
    for (key, set) in scored {
        table.insert(key, set);
    }
    table
}

/// Score one record against one target site: exact-code short circuit
/// first, token similarity otherwise.
fn evaluate(
    record: &Record,
    index: &SiteIndex,
    abbreviations: &[crate::model::Abbreviation],
    exclude: &BTreeSet<String>,
    top_n: usize,
) -> MatchSet {
    if let Some(hit) = code_matches(record, index, top_n) {
        return hit;
    }
    let tokens = normalize::tokenize(&record.description, abbreviations);
    score::score(&tokens, index, exclude, top_n)
}

/// Exact-code pre-pass: when the record carries a code the target site
/// also carries, every holder is a score-1.0 match and fuzzy scoring is
/// skipped. Holders group by description, one entry each.
fn code_matches(record: &Record, index: &SiteIndex, top_n: usize) -> Option<MatchSet> {
    let code = record.code.as_deref()?.trim();
    if code.is_empty() {
        return None;
    }
    let holders = index.by_code.get(code)?;
    let mut by_text: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for item_id in holders {
        if let Some(text) = index.text_of.get(item_id) {
            by_text
                .entry(text.clone())
                .or_default()
                .insert(item_id.clone());
        }
    }
    if by_text.is_empty() {
        return None;
    }
    let mut entries: Vec<MatchEntry> = by_text
        .into_iter()
        .map(|(description, members)| MatchEntry {
            description,
            score: 1.0,
            members,
        })
        .collect();
    entries.truncate(top_n);
    Some(MatchSet::from_ranked(entries))
}
