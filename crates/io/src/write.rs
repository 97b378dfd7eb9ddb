use std::fs;
use std::io::Write;
use std::path::Path;

use log::info;

use sitematch_engine::model::{MatchResult, OutputRow};
use sitematch_engine::MatchError;

const OUTPUT_HEADERS: [&str; 10] = [
    "site",
    "target_site",
    "item_id",
    "description",
    "match_description",
    "match_item_ids",
    "match_score",
    "rank",
    "matching_row_count",
    "row_status",
];

/// Write output rows as CSV. Scores print in shortest-round-trip form so
/// reloading them reproduces the same f64 bits.
pub fn write_output_csv<W: Write>(writer: W, rows: &[OutputRow]) -> Result<(), MatchError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(OUTPUT_HEADERS)
        .map_err(|e| MatchError::Io(e.to_string()))?;
    for row in rows {
        out.write_record([
            row.site.clone(),
            row.target_site.clone(),
            row.item_id.clone(),
            row.description.clone(),
            row.match_description.clone(),
            row.match_item_ids.join(";"),
            format!("{}", row.match_score),
            row.rank.to_string(),
            row.matching_row_count.to_string(),
            row.row_status.to_string(),
        ])
        .map_err(|e| MatchError::Io(e.to_string()))?;
    }
    out.flush().map_err(|e| MatchError::Io(e.to_string()))?;
    Ok(())
}

/// Write output rows to a file, creating parent directories as needed.
pub fn write_output_csv_file(path: &Path, rows: &[OutputRow]) -> Result<(), MatchError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| MatchError::Io(format!("{}: {}", parent.display(), e)))?;
        }
    }
    let file =
        fs::File::create(path).map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?;
    write_output_csv(file, rows)?;
    info!("{}: wrote {} rows", path.display(), rows.len());
    Ok(())
}

/// Write the full run result (meta, summary, rows) as pretty JSON.
pub fn write_result_json(path: &Path, result: &MatchResult) -> Result<(), MatchError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| MatchError::Io(format!("{}: {}", parent.display(), e)))?;
        }
    }
    let file =
        fs::File::create(path).map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?;
    serde_json::to_writer_pretty(file, result)
        .map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?;
    Ok(())
}
