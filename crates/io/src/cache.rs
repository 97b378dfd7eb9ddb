use std::fs;
use std::path::PathBuf;

use log::debug;

use sitematch_engine::model::{MatchTable, NestedMatches};
use sitematch_engine::{MatchCache, MatchError};

/// Match-table cache stored as a JSON file, keyed item id -> target site.
///
/// A missing file is an empty cache. Parse failures are real errors: a
/// corrupt cache should be deleted deliberately, not silently overwritten.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MatchCache for JsonFileCache {
    fn load(&self) -> Result<Option<MatchTable>, MatchError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("{}: no cached match table", self.path.display());
                return Ok(None);
            }
            Err(err) => {
                return Err(MatchError::Cache(format!(
                    "{}: {}",
                    self.path.display(),
                    err
                )))
            }
        };
        let nested: NestedMatches = serde_json::from_str(&raw)
            .map_err(|e| MatchError::Cache(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(MatchTable::from_nested(nested)))
    }

    fn save(&self, table: &MatchTable) -> Result<(), MatchError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| MatchError::Cache(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let json = serde_json::to_string_pretty(&table.to_nested())
            .map_err(|e| MatchError::Cache(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| MatchError::Cache(format!("{}: {}", self.path.display(), e)))?;
        debug!(
            "{}: cached match table ({} pairs)",
            self.path.display(),
            table.len()
        );
        Ok(())
    }
}
