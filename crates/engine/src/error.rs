/// Errors surfaced while configuring or running a match.
#[derive(Debug)]
pub enum MatchError {
    /// TOML syntax error in the config file.
    ConfigParse(String),
    /// Structurally valid config that fails semantic validation.
    ConfigValidation(String),
    /// A required column header is absent from an input file.
    MissingColumn { file: String, column: String },
    /// A prior-output field that should be numeric could not be parsed.
    ScoreParse { item_id: String, value: String },
    RankParse { item_id: String, value: String },
    /// An unrecognized row status in prior output.
    StatusParse { item_id: String, value: String },
    /// Cache backend failure while loading or saving a match table.
    Cache(String),
    Io(String),
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {}", msg),
            Self::ConfigValidation(msg) => write!(f, "invalid config: {}", msg),
            Self::MissingColumn { file, column } => {
                write!(f, "{}: missing required column '{}'", file, column)
            }
            Self::ScoreParse { item_id, value } => {
                write!(f, "prior row '{}': unparseable score '{}'", item_id, value)
            }
            Self::RankParse { item_id, value } => {
                write!(f, "prior row '{}': unparseable rank '{}'", item_id, value)
            }
            Self::StatusParse { item_id, value } => {
                write!(f, "prior row '{}': unknown row status '{}'", item_id, value)
            }
            Self::Cache(msg) => write!(f, "match cache error: {}", msg),
            Self::Io(msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl std::error::Error for MatchError {}

impl From<std::io::Error> for MatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
