//! `sitematch-engine` — Incremental cross-site fuzzy matching engine.
//!
//! Pure engine crate: receives pre-loaded records, prior snapshot rows and
//! abbreviations, returns classified output rows. No CLI or file I/O
//! dependencies; caching is injected via [`cache::MatchCache`].

pub mod cache;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod index;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod project;
pub mod score;

pub use cache::{MatchCache, NoCache};
pub use config::MatchConfig;
pub use engine::run;
pub use error::MatchError;
pub use model::{MatchInput, MatchResult, OutputRow, PriorRow, Record, RowStatus};
