//! `sitematch-io` — file boundary for the matching engine.
//!
//! CSV input (inventory exports, abbreviation tables, prior output) and
//! CSV/JSON output live here, along with the JSON-backed match-table
//! cache. The engine crate itself never touches the filesystem.

pub mod cache;
pub mod read;
pub mod write;

pub use cache::JsonFileCache;
pub use read::{load_abbreviations, load_prior_rows, load_records};
pub use write::{write_output_csv, write_output_csv_file, write_result_json};
