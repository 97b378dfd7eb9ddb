use std::collections::BTreeSet;
use std::path::Path;

use log::{info, warn};

use sitematch_engine::config::ColumnMapping;
use sitematch_engine::model::{Abbreviation, PriorRow, Record, RowStatus};
use sitematch_engine::MatchError;

/// Resolve a header name to its column position, or fail with the file
/// and column named.
fn column_position(
    headers: &csv::StringRecord,
    file: &Path,
    column: &str,
) -> Result<usize, MatchError> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| MatchError::MissingColumn {
            file: file.display().to_string(),
            column: column.to_string(),
        })
}

fn field(record: &csv::StringRecord, position: usize) -> String {
    record.get(position).unwrap_or("").trim().to_string()
}

// ---------------------------------------------------------------------------
// Inventory records
// ---------------------------------------------------------------------------

/// Load inventory records from a site export. Rows with an empty item id
/// are skipped with a warning rather than aborting the run.
pub fn load_records(path: &Path, columns: &ColumnMapping) -> Result<Vec<Record>, MatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?;
    let headers = reader
        .headers()
        .map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?
        .clone();

    let site_at = column_position(&headers, path, &columns.site)?;
    let stock_code_at = column_position(&headers, path, &columns.stock_code)?;
    let item_id_at = column_position(&headers, path, &columns.item_id)?;
    let description_at = column_position(&headers, path, &columns.description)?;
    let code_at = match &columns.code {
        Some(name) => Some(column_position(&headers, path, name)?),
        None => None,
    };

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?;
        let item_id = field(&row, item_id_at);
        if item_id.is_empty() {
            warn!("{}: row {} has no item id, skipping", path.display(), line + 2);
            continue;
        }
        let code = code_at.map(|at| field(&row, at)).filter(|c| !c.is_empty());
        records.push(Record {
            site: field(&row, site_at),
            stock_code: field(&row, stock_code_at),
            item_id,
            description: field(&row, description_at),
            code,
        });
    }
    info!("{}: loaded {} records", path.display(), records.len());
    Ok(records)
}

// ---------------------------------------------------------------------------
// Abbreviation table
// ---------------------------------------------------------------------------

/// Load the ordered abbreviation table. File order is preserved: it is
/// the order expansions apply in.
pub fn load_abbreviations(path: &Path) -> Result<Vec<Abbreviation>, MatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?;
    let headers = reader
        .headers()
        .map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?
        .clone();
    let from_at = column_position(&headers, path, "Abbreviation")?;
    let to_at = column_position(&headers, path, "Expanded")?;

    let mut abbreviations = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?;
        let from = field(&row, from_at);
        if from.is_empty() {
            continue;
        }
        abbreviations.push(Abbreviation::new(from, field(&row, to_at)));
    }
    Ok(abbreviations)
}

// ---------------------------------------------------------------------------
// Prior output
// ---------------------------------------------------------------------------

/// Reload a previous run's output rows. A missing file is a first run,
/// not an error.
pub fn load_prior_rows(path: &Path) -> Result<Vec<PriorRow>, MatchError> {
    let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(reader) => reader,
        Err(err) => {
            if let csv::ErrorKind::Io(io) = err.kind() {
                if io.kind() == std::io::ErrorKind::NotFound {
                    info!("{}: no prior output, treating as first run", path.display());
                    return Ok(Vec::new());
                }
            }
            return Err(MatchError::Io(format!("{}: {}", path.display(), err)));
        }
    };
    let headers = reader
        .headers()
        .map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?
        .clone();

    let site_at = column_position(&headers, path, "site")?;
    let target_site_at = column_position(&headers, path, "target_site")?;
    let item_id_at = column_position(&headers, path, "item_id")?;
    let description_at = column_position(&headers, path, "description")?;
    let match_description_at = column_position(&headers, path, "match_description")?;
    let match_item_ids_at = column_position(&headers, path, "match_item_ids")?;
    let match_score_at = column_position(&headers, path, "match_score")?;
    let rank_at = column_position(&headers, path, "rank")?;
    let row_status_at = column_position(&headers, path, "row_status")?;

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| MatchError::Io(format!("{}: {}", path.display(), e)))?;
        let item_id = field(&row, item_id_at);
        let score_raw = field(&row, match_score_at);
        let match_score: f64 = score_raw.parse().map_err(|_| MatchError::ScoreParse {
            item_id: item_id.clone(),
            value: score_raw.clone(),
        })?;
        let rank_raw = field(&row, rank_at);
        let rank: usize = rank_raw.parse().map_err(|_| MatchError::RankParse {
            item_id: item_id.clone(),
            value: rank_raw.clone(),
        })?;
        let status_raw = field(&row, row_status_at);
        let row_status =
            RowStatus::parse(&status_raw).ok_or_else(|| MatchError::StatusParse {
                item_id: item_id.clone(),
                value: status_raw.clone(),
            })?;
        let match_item_ids: BTreeSet<String> = field(&row, match_item_ids_at)
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        rows.push(PriorRow {
            site: field(&row, site_at),
            target_site: field(&row, target_site_at),
            item_id,
            description: field(&row, description_at),
            match_description: field(&row, match_description_at),
            match_item_ids,
            match_score,
            rank,
            row_status,
        });
    }
    info!("{}: loaded {} prior rows", path.display(), rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_records_with_default_columns() {
        let file = write_temp(
            "Site,Stock Code,Stock & Site,Stock Description\n\
             A,1,1 & A,Hydraulic Pump\n\
             B,2,2 & B,Gasket\n",
        );
        let records = load_records(file.path(), &ColumnMapping::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item_id, "1 & A");
        assert_eq!(records[1].description, "Gasket");
        assert!(records[0].code.is_none());
    }

    #[test]
    fn skips_rows_without_item_id() {
        let file = write_temp(
            "Site,Stock Code,Stock & Site,Stock Description\n\
             A,1,1 & A,Pump\n\
             A,2,,Orphan\n",
        );
        let records = load_records(file.path(), &ColumnMapping::default()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn missing_column_names_file_and_column() {
        let file = write_temp("Site,Stock Code\nA,1\n");
        let err = load_records(file.path(), &ColumnMapping::default()).unwrap_err();
        match err {
            MatchError::MissingColumn { column, .. } => {
                assert_eq!(column, "Stock & Site");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn custom_code_column_loads() {
        let mut columns = ColumnMapping::default();
        columns.code = Some("OEM".into());
        let file = write_temp(
            "Site,Stock Code,Stock & Site,Stock Description,OEM\n\
             A,1,1 & A,Pump,X-9\n\
             A,2,2 & A,Seal,\n",
        );
        let records = load_records(file.path(), &columns).unwrap();
        assert_eq!(records[0].code.as_deref(), Some("X-9"));
        assert!(records[1].code.is_none());
    }

    #[test]
    fn abbreviations_preserve_file_order() {
        let file = write_temp(
            "Abbreviation,Expanded\n\
             HYD,hydraulic\n\
             brg,bearing\n",
        );
        let abbrevs = load_abbreviations(file.path()).unwrap();
        assert_eq!(abbrevs.len(), 2);
        assert_eq!(abbrevs[0].from, "hyd");
        assert_eq!(abbrevs[0].to, "hydraulic");
        assert_eq!(abbrevs[1].from, "brg");
    }

    #[test]
    fn missing_prior_file_is_empty() {
        let rows = load_prior_rows(Path::new("/nonexistent/prior.csv")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn prior_rows_round_trip_fields() {
        let file = write_temp(
            "site,target_site,item_id,description,match_description,match_item_ids,match_score,rank,matching_row_count,row_status\n\
             A,B,1 & A,Pump,Hyd Pump,2 & B;3 & B,0.75,0,2,New\n",
        );
        let rows = load_prior_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.match_item_ids.len(), 2);
        assert_eq!(row.match_score, 0.75);
        assert_eq!(row.rank, 0);
        assert_eq!(row.row_status, RowStatus::New);
    }

    #[test]
    fn bad_score_is_a_parse_error() {
        let file = write_temp(
            "site,target_site,item_id,description,match_description,match_item_ids,match_score,rank,matching_row_count,row_status\n\
             A,B,1 & A,Pump,Hyd Pump,2 & B,high,0,1,New\n",
        );
        let err = load_prior_rows(file.path()).unwrap_err();
        assert!(matches!(err, MatchError::ScoreParse { .. }));
    }

    #[test]
    fn unknown_status_is_a_parse_error() {
        let file = write_temp(
            "site,target_site,item_id,description,match_description,match_item_ids,match_score,rank,matching_row_count,row_status\n\
             A,B,1 & A,Pump,Hyd Pump,2 & B,0.5,0,1,Retired\n",
        );
        let err = load_prior_rows(file.path()).unwrap_err();
        assert!(matches!(err, MatchError::StatusParse { .. }));
    }
}
