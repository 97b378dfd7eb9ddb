use crate::error::MatchError;
use crate::model::MatchTable;

/// Persistence seam for the computed match table.
///
/// The engine asks the cache first and only falls back to scoring when it
/// answers `Ok(None)`. Implementations live outside the engine crate; the
/// CLI provides a JSON file cache.
pub trait MatchCache: Sync {
    /// A previously saved table, or `Ok(None)` when nothing is cached.
    fn load(&self) -> Result<Option<MatchTable>, MatchError>;
    fn save(&self, table: &MatchTable) -> Result<(), MatchError>;
}

/// Cache that never has anything and discards saves.
#[derive(Debug, Default)]
pub struct NoCache;

impl MatchCache for NoCache {
    fn load(&self) -> Result<Option<MatchTable>, MatchError> {
        Ok(None)
    }

    fn save(&self, _table: &MatchTable) -> Result<(), MatchError> {
        Ok(())
    }
}
