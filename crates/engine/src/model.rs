use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single inventory record from one site's export.
#[derive(Debug, Clone)]
pub struct Record {
    pub site: String,
    pub stock_code: String,
    /// Globally unique "stock & site" key.
    pub item_id: String,
    pub description: String,
    /// Optional authoritative cross-site code (e.g. an OEM code). Blank
    /// codes never participate in the exact-code pre-pass.
    pub code: Option<String>,
}

/// An ordered abbreviation expansion. Order in the table is significant:
/// expansions are applied as substring replacements in table order.
#[derive(Debug, Clone)]
pub struct Abbreviation {
    pub from: String,
    pub to: String,
}

impl Abbreviation {
    /// Both sides are lowercased once at construction so normalization
    /// never re-lowercases per call.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into().to_lowercase(),
            to: to.into().to_lowercase(),
        }
    }
}

/// Pre-loaded inputs for one matching run. The prior rows and abbreviation
/// table are loaded once and shared read-only across scoring workers.
#[derive(Debug, Default)]
pub struct MatchInput {
    pub records: Vec<Record>,
    pub prior: Vec<PriorRow>,
    pub abbreviations: Vec<Abbreviation>,
}

// ---------------------------------------------------------------------------
// Site index
// ---------------------------------------------------------------------------

/// All records of one site that share the same trimmed description text.
/// `members` is never empty.
#[derive(Debug, Clone)]
pub struct NormalizedDescription {
    pub text: String,
    pub tokens: BTreeSet<String>,
    pub members: BTreeSet<String>,
}

/// Per-site description index, built once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SiteIndex {
    /// Grouping is by exact trimmed raw text, not token-set equality.
    pub by_text: BTreeMap<String, NormalizedDescription>,
    /// Exact-code short-circuit index: code -> item ids carrying it.
    pub by_code: BTreeMap<String, BTreeSet<String>>,
    /// Reverse lookup from item id to its description text, used to turn
    /// code hits back into ranked entries.
    pub text_of: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Match sets
// ---------------------------------------------------------------------------

/// One ranked candidate: a description at the target site, its similarity
/// score, and every item id that carries that exact description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEntry {
    pub description: String,
    pub score: f64,
    pub members: BTreeSet<String>,
}

/// Ranked candidates for one (item, target site), best first.
///
/// Invariants: at most `top_n` entries, scores monotonically non-increasing.
/// Fuzzy-scored and merged sets never repeat a description; only the
/// degraded NOT FOUND set does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchSet {
    entries: Vec<MatchEntry>,
}

impl MatchSet {
    /// Wrap entries that are already ranked (score descending) and
    /// deduplicated by description.
    pub fn from_ranked(entries: Vec<MatchEntry>) -> Self {
        debug_assert!(entries
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
        Self { entries }
    }

    pub fn entries(&self) -> &[MatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Equality as sets of (description, score, members), ignoring rank
    /// order. Scores compare by exact bit pattern; output formatting is
    /// shortest-round-trip so snapshot reload preserves bits.
    pub fn same_matches(&self, other: &MatchSet) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        let key = |e: &MatchEntry| (e.description.clone(), e.score.to_bits(), e.members.clone());
        let mine: BTreeSet<_> = self.entries.iter().map(key).collect();
        let theirs: BTreeSet<_> = other.entries.iter().map(key).collect();
        mine == theirs
    }
}

// ---------------------------------------------------------------------------
// Match table
// ---------------------------------------------------------------------------

/// Composite key of the match table: one scored (item, target site) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchKey {
    pub item_id: String,
    pub target_site: String,
}

/// Working result of one run: ranked matches per (item, target site).
///
/// A keyed table rather than nested maps so the "one match set per pair"
/// invariant holds by construction.
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    map: BTreeMap<MatchKey, MatchSet>,
}

/// Cache/wire shape of a match table: item id -> target site -> entries.
pub type NestedMatches = BTreeMap<String, BTreeMap<String, Vec<MatchEntry>>>;

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: MatchKey, set: MatchSet) {
        self.map.insert(key, set);
    }

    pub fn get(&self, key: &MatchKey) -> Option<&MatchSet> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MatchKey, &MatchSet)> {
        self.map.iter()
    }

    pub fn into_iter(self) -> impl Iterator<Item = (MatchKey, MatchSet)> {
        self.map.into_iter()
    }

    pub fn to_nested(&self) -> NestedMatches {
        let mut nested: NestedMatches = BTreeMap::new();
        for (key, set) in &self.map {
            nested
                .entry(key.item_id.clone())
                .or_default()
                .insert(key.target_site.clone(), set.entries().to_vec());
        }
        nested
    }

    pub fn from_nested(nested: NestedMatches) -> Self {
        let mut table = Self::new();
        for (item_id, sites) in nested {
            for (target_site, entries) in sites {
                table.insert(
                    MatchKey {
                        item_id: item_id.clone(),
                        target_site,
                    },
                    MatchSet::from_ranked(entries),
                );
            }
        }
        table
    }
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    New,
    Superseded,
    Unchanged,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Superseded => "Superseded",
            Self::Unchanged => "Unchanged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "New" => Some(Self::New),
            "Superseded" => Some(Self::Superseded),
            "Unchanged" => Some(Self::Unchanged),
            _ => None,
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One flattened result row: rank `rank` of the matches for `item_id`
/// against `target_site`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub site: String,
    pub target_site: String,
    pub item_id: String,
    pub description: String,
    pub match_description: String,
    pub match_item_ids: Vec<String>,
    pub match_score: f64,
    pub rank: usize,
    pub matching_row_count: usize,
    pub row_status: RowStatus,
}

/// A row read back from a previous run's output, keyed by
/// (item_id, target_site).
#[derive(Debug, Clone)]
pub struct PriorRow {
    pub site: String,
    pub target_site: String,
    pub item_id: String,
    pub description: String,
    pub match_description: String,
    pub match_item_ids: BTreeSet<String>,
    pub match_score: f64,
    pub rank: usize,
    pub row_status: RowStatus,
}

// ---------------------------------------------------------------------------
// Result + Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub top_n: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub input_records: usize,
    pub prior_rows: usize,
    pub sites: usize,
    pub pairs_scored: usize,
    pub rows_emitted: usize,
    pub new_rows: usize,
    pub superseded_rows: usize,
    pub unchanged_rows: usize,
    /// (item, target site) pairs suppressed as unchanged.
    pub unchanged_pairs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub rows: Vec<OutputRow>,
}
