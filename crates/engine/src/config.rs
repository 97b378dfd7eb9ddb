use serde::Deserialize;

use crate::error::MatchError;

// ---------------------------------------------------------------------------
// Config model
// ---------------------------------------------------------------------------

/// Top-level match configuration, loaded from TOML.
///
/// ```toml
/// name = "warehouse-recon"
///
/// [input]
/// file = "stock.csv"
///
/// [matching]
/// top_n = 10
/// exclude_tokens = ["assy", "unit"]
///
/// [snapshot]
/// prior = "out/matches.csv"
/// cache = "out/match_table.json"
///
/// [output]
/// file = "out/matches.csv"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    pub name: String,
    pub input: InputConfig,
    #[serde(default)]
    pub abbreviations: Option<AbbrevConfig>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub file: String,
    #[serde(default)]
    pub columns: ColumnMapping,
}

/// Header names in the inventory export. Defaults match the common
/// "Stock & Site" export layout so most configs omit this table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub site: String,
    pub stock_code: String,
    pub item_id: String,
    pub description: String,
    /// Optional exact-match code column; when absent the code pre-pass
    /// is skipped entirely.
    pub code: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            site: "Site".into(),
            stock_code: "Stock Code".into(),
            item_id: "Stock & Site".into(),
            description: "Stock Description".into(),
            code: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbbrevConfig {
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub top_n: usize,
    /// When true (the default), pairs whose match set is identical to the
    /// prior snapshot produce no rows at all.
    pub exclude_unchanged: bool,
    /// Tokens removed from the query side before scoring. Candidate token
    /// sets are left untouched.
    pub exclude_tokens: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            exclude_unchanged: true,
            exclude_tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Previous run's output file. Absent on the first run.
    pub prior: Option<String>,
    /// JSON match-table cache path.
    pub cache: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub file: Option<String>,
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading + validation
// ---------------------------------------------------------------------------

impl MatchConfig {
    pub fn from_toml(raw: &str) -> Result<Self, MatchError> {
        let config: MatchConfig =
            toml::from_str(raw).map_err(|e| MatchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.name.trim().is_empty() {
            return Err(MatchError::ConfigValidation("name must not be empty".into()));
        }
        if self.input.file.trim().is_empty() {
            return Err(MatchError::ConfigValidation(
                "input.file must not be empty".into(),
            ));
        }
        if self.matching.top_n == 0 {
            return Err(MatchError::ConfigValidation(
                "matching.top_n must be at least 1".into(),
            ));
        }
        let cols = &self.input.columns;
        for (field, value) in [
            ("input.columns.site", &cols.site),
            ("input.columns.stock_code", &cols.stock_code),
            ("input.columns.item_id", &cols.item_id),
            ("input.columns.description", &cols.description),
        ] {
            if value.trim().is_empty() {
                return Err(MatchError::ConfigValidation(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        if let Some(code) = &cols.code {
            if code.trim().is_empty() {
                return Err(MatchError::ConfigValidation(
                    "input.columns.code must not be empty when set".into(),
                ));
            }
        }
        if let Some(abbrev) = &self.abbreviations {
            if abbrev.file.trim().is_empty() {
                return Err(MatchError::ConfigValidation(
                    "abbreviations.file must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}
