//! End-to-end engine tests: full runs through config, indexing, scoring,
//! diffing and projection.

use std::collections::BTreeSet;

use sitematch_engine::model::{Abbreviation, PriorRow};
use sitematch_engine::{run, MatchConfig, MatchInput, NoCache, OutputRow, Record, RowStatus};

fn config(extra: &str) -> MatchConfig {
    MatchConfig::from_toml(&format!(
        r#"
name = "integration"

[input]
file = "stock.csv"
{extra}
"#
    ))
    .unwrap()
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

fn as_prior(rows: &[OutputRow]) -> Vec<PriorRow> {
    rows.iter()
        .map(|row| PriorRow {
            site: row.site.clone(),
            target_site: row.target_site.clone(),
            item_id: row.item_id.clone(),
            description: row.description.clone(),
            match_description: row.match_description.clone(),
            match_item_ids: row.match_item_ids.iter().cloned().collect::<BTreeSet<_>>(),
            match_score: row.match_score,
            rank: row.rank,
            row_status: row.row_status,
        })
        .collect()
}

#[test]
fn first_run_marks_everything_new() {
    let input = MatchInput {
        records: vec![
            record("North", "100", "Hydraulic Pump"),
            record("South", "200", "Hydraulic Pump"),
            record("South", "201", "Rubber Gasket"),
        ],
        ..Default::default()
    };
    let result = run(&config(""), &input, &NoCache).unwrap();
    assert!(!result.rows.is_empty());
    assert!(result.rows.iter().all(|r| r.row_status == RowStatus::New));

    let top = result
        .rows
        .iter()
        .find(|r| r.item_id == "100 & North" && r.rank == 0)
        .unwrap();
    assert_eq!(top.match_description, "Hydraulic Pump");
    assert_eq!(top.match_score, 1.0);
    assert_eq!(top.match_item_ids, vec!["200 & South"]);
    assert_eq!(top.matching_row_count, 1);
}

#[test]
fn partial_overlap_scores_one_third() {
    // {thingamajig} vs {thingamajig, red, large}: 1 shared of 3 total.
    let input = MatchInput {
        records: vec![
            record("A", "1", "Thingamajig"),
            record("B", "2", "Thingamajig red large"),
        ],
        ..Default::default()
    };
    let result = run(&config(""), &input, &NoCache).unwrap();
    let row = result.rows.iter().find(|r| r.item_id == "1 & A").unwrap();
    assert!((row.match_score - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn single_site_input_emits_no_rows() {
    let input = MatchInput {
        records: vec![record("A", "1", "Pump"), record("A", "2", "Seal")],
        ..Default::default()
    };
    let result = run(&config(""), &input, &NoCache).unwrap();
    assert!(result.rows.is_empty());
}

#[test]
fn rerun_with_unchanged_input_is_silent() {
    let input = MatchInput {
        records: vec![
            record("A", "1", "Bolt M12"),
            record("B", "2", "Bolt M12 Galvanised"),
        ],
        ..Default::default()
    };
    let first = run(&config(""), &input, &NoCache).unwrap();
    let rerun = MatchInput {
        records: input.records.clone(),
        prior: as_prior(&first.rows),
        ..Default::default()
    };
    let second = run(&config(""), &rerun, &NoCache).unwrap();
    assert!(second.rows.is_empty());
    assert_eq!(second.summary.unchanged_pairs, second.summary.pairs_scored);
}

#[test]
fn rerun_with_exclude_unchanged_off_reports_unchanged_rows() {
    let input = MatchInput {
        records: vec![record("A", "1", "Bolt"), record("B", "2", "Bolt")],
        ..Default::default()
    };
    let first = run(&config(""), &input, &NoCache).unwrap();
    let rerun = MatchInput {
        records: input.records.clone(),
        prior: as_prior(&first.rows),
        ..Default::default()
    };
    let second = run(
        &config("\n[matching]\nexclude_unchanged = false\n"),
        &rerun,
        &NoCache,
    )
    .unwrap();
    assert!(!second.rows.is_empty());
    assert!(second
        .rows
        .iter()
        .all(|r| r.row_status == RowStatus::Unchanged));
}

#[test]
fn new_candidate_supersedes_prior_rows() {
    let input = MatchInput {
        records: vec![record("A", "1", "Drive Belt"), record("B", "2", "Drive Chain")],
        ..Default::default()
    };
    let first = run(&config(""), &input, &NoCache).unwrap();

    // A better candidate appears at site B on the second run.
    let mut records = input.records.clone();
    records.push(record("B", "3", "Drive Belt"));
    let rerun = MatchInput {
        records,
        prior: as_prior(&first.rows),
        ..Default::default()
    };
    let second = run(&config(""), &rerun, &NoCache).unwrap();

    let for_item: Vec<_> = second
        .rows
        .iter()
        .filter(|r| r.item_id == "1 & A" && r.target_site == "B")
        .collect();
    assert!(for_item
        .iter()
        .any(|r| r.row_status == RowStatus::Superseded && r.match_description == "Drive Chain"));
    let best = for_item
        .iter()
        .find(|r| r.row_status == RowStatus::New && r.rank == 0)
        .unwrap();
    assert_eq!(best.match_description, "Drive Belt");
    assert_eq!(best.match_score, 1.0);
    // The displaced candidate survives in the merged set below the new one.
    assert!(for_item
        .iter()
        .any(|r| r.row_status == RowStatus::New && r.match_description == "Drive Chain"));
}

#[test]
fn abbreviations_bridge_description_variants() {
    let input = MatchInput {
        records: vec![
            record("A", "1", "HYD PUMP ASSY"),
            record("B", "2", "hydraulic pump assembly"),
        ],
        abbreviations: vec![
            Abbreviation::new("hyd", "hydraulic"),
            Abbreviation::new("assy", "assembly"),
        ],
        ..Default::default()
    };
    let result = run(&config(""), &input, &NoCache).unwrap();
    let row = result.rows.iter().find(|r| r.item_id == "1 & A").unwrap();
    assert_eq!(row.match_score, 1.0);
}

#[test]
fn top_n_caps_rows_per_pair() {
    let mut records = vec![record("A", "1", "widget")];
    for i in 0..8 {
        records.push(record("B", &format!("b{i}"), &format!("widget variant {i}")));
    }
    let input = MatchInput {
        records,
        ..Default::default()
    };
    let result = run(&config("\n[matching]\ntop_n = 3\n"), &input, &NoCache).unwrap();
    let for_item = result
        .rows
        .iter()
        .filter(|r| r.item_id == "1 & A")
        .count();
    assert_eq!(for_item, 3);
    assert_eq!(result.meta.top_n, 3);
}

#[test]
fn removed_record_still_matches_via_snapshot() {
    // Item "2 & B" disappears from the input between runs but its
    // description survives through the snapshot, so "3 & C" can still
    // match against it.
    let first_input = MatchInput {
        records: vec![record("A", "1", "Spring Washer"), record("B", "2", "Spring Washer")],
        ..Default::default()
    };
    let first = run(&config(""), &first_input, &NoCache).unwrap();

    let rerun = MatchInput {
        records: vec![record("A", "1", "Spring Washer"), record("C", "3", "Spring Washer")],
        prior: as_prior(&first.rows),
        ..Default::default()
    };
    let second = run(&config(""), &rerun, &NoCache).unwrap();
    let row = second
        .rows
        .iter()
        .find(|r| r.item_id == "3 & C" && r.target_site == "B")
        .unwrap();
    assert_eq!(row.match_description, "Spring Washer");
    assert_eq!(row.match_score, 1.0);
}

#[test]
fn exclude_tokens_are_ignored_on_the_query_side() {
    let input = MatchInput {
        records: vec![
            record("A", "1", "pump unit"),
            record("B", "2", "pump"),
        ],
        ..Default::default()
    };
    let scored = run(
        &config("\n[matching]\nexclude_tokens = [\"unit\"]\n"),
        &input,
        &NoCache,
    )
    .unwrap();
    // Query side drops "unit": "1 & A" matches "pump" exactly. The reverse
    // direction scores against the indexed {pump, unit} set unchanged.
    let forward = scored.rows.iter().find(|r| r.item_id == "1 & A").unwrap();
    assert_eq!(forward.match_score, 1.0);
    let reverse = scored.rows.iter().find(|r| r.item_id == "2 & B").unwrap();
    assert!(reverse.match_score < 1.0);
}

#[test]
fn code_hits_outrank_fuzzy_matches() {
    let mut a = record("A", "1", "Obscure Widget Mk3");
    a.code = Some("OEM-551".into());
    let mut b1 = record("B", "2", "Totally Different Name");
    b1.code = Some("OEM-551".into());
    let b2 = record("B", "3", "Obscure Widget Mk4");
    let input = MatchInput {
        records: vec![a, b1, b2],
        ..Default::default()
    };
    let result = run(&config(""), &input, &NoCache).unwrap();
    let best = result
        .rows
        .iter()
        .find(|r| r.item_id == "1 & A" && r.rank == 0)
        .unwrap();
    assert_eq!(best.match_description, "Totally Different Name");
    assert_eq!(best.match_score, 1.0);
}
