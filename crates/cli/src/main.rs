//! `smatch` — config-driven cross-site inventory matching.

mod exit_codes;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS};
use sitematch_engine::{MatchCache, MatchConfig, MatchInput, NoCache};
use sitematch_io::JsonFileCache;

#[derive(Parser)]
#[command(name = "smatch", version, about = "Incremental cross-site inventory matching")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a matching pass from a TOML config file
    #[command(after_help = "\
Examples:
  smatch run match.toml
  smatch run match.toml --json
  smatch run match.toml --output result.json
  smatch run match.toml --no-cache")]
    Run {
        /// Path to the match config file
        config: PathBuf,

        /// Output full run result JSON to stdout instead of CSV rows
        #[arg(long)]
        json: bool,

        /// Write run result JSON to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Ignore the configured match-table cache for this run
        #[arg(long)]
        no_cache: bool,
    },

    /// Validate a match config without running
    #[command(after_help = "\
Examples:
  smatch validate match.toml")]
    Validate {
        /// Path to the match config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            no_cache,
        } => cmd_run(config, json, output, no_cache),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    fn config(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_INVALID_CONFIG,
            message: msg.into(),
            hint: None,
        }
    }

    fn runtime(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_RUNTIME,
            message: msg.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn load_config(config_path: &Path) -> Result<MatchConfig, CliError> {
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::runtime(format!("cannot read config: {e}")))?;
    MatchConfig::from_toml(&raw).map_err(|e| CliError::config(e.to_string()))
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!("config '{}' is valid", config.name);
    Ok(())
}

fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    no_cache: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    // File paths in the config resolve relative to the config file.
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let records = sitematch_io::load_records(
        &base_dir.join(&config.input.file),
        &config.input.columns,
    )
    .map_err(|e| CliError::runtime(e.to_string()))?;

    let abbreviations = match &config.abbreviations {
        Some(abbrev) => sitematch_io::load_abbreviations(&base_dir.join(&abbrev.file))
            .map_err(|e| CliError::runtime(e.to_string()))?,
        None => Vec::new(),
    };

    let prior = match &config.snapshot.prior {
        Some(prior_file) => sitematch_io::load_prior_rows(&base_dir.join(prior_file)).map_err(
            |e| {
                CliError::runtime(e.to_string())
                    .with_hint("delete or fix the prior output file to start fresh")
            },
        )?,
        None => Vec::new(),
    };

    let input = MatchInput {
        records,
        prior,
        abbreviations,
    };

    let cache: Box<dyn MatchCache> = match (&config.snapshot.cache, no_cache) {
        (Some(cache_file), false) => Box::new(JsonFileCache::new(base_dir.join(cache_file))),
        _ => Box::new(NoCache),
    };

    let result = sitematch_engine::run(&config, &input, cache.as_ref())
        .map_err(|e| CliError::runtime(e.to_string()))?;

    // Output rows: configured file, or stdout when neither file nor --json.
    if let Some(ref out_file) = config.output.file {
        sitematch_io::write_output_csv_file(&base_dir.join(out_file), &result.rows)
            .map_err(|e| CliError::runtime(e.to_string()))?;
    } else if !json_output {
        let stdout = std::io::stdout();
        sitematch_io::write_output_csv(stdout.lock(), &result.rows)
            .map_err(|e| CliError::runtime(e.to_string()))?;
    }

    // Run result JSON: --output flag wins over the configured path.
    let json_file = output_file.or_else(|| {
        config
            .output
            .json
            .as_ref()
            .map(|p| base_dir.join(p))
    });
    if let Some(ref path) = json_file {
        sitematch_io::write_result_json(path, &result)
            .map_err(|e| CliError::runtime(e.to_string()))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{json_str}")
            .map_err(|e| CliError::runtime(format!("cannot write stdout: {e}")))?;
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "{} records across {} sites: {} pairs scored, {} rows ({} new, {} superseded, {} unchanged pairs)",
        s.input_records, s.sites, s.pairs_scored, s.rows_emitted, s.new_rows, s.superseded_rows,
        s.unchanged_pairs,
    );

    Ok(())
}
