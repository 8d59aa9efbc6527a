//! Persistence for teams, fixtures, results and the derived standings table.

use crate::{
    http::IsNetworkError,
    prelude::*,
};

pub(crate) mod memory;
pub(crate) mod postgres;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)] Sql(#[from] sqlx::Error),
    #[error("{table} row {id} has out-of-range {column}: {value}")]
    OutOfRange {
        table: &'static str,
        column: &'static str,
        id: i64,
        value: i64,
    },
}

impl IsNetworkError for Error {
    fn is_network_error(&self) -> bool {
        match self {
            Self::Sql(sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => true,
            Self::Sql(_) => false,
            Self::OutOfRange { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteStage {
    Delete,
    Insert,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Insert => write!(f, "insert"),
        }
    }
}

/// Replacing a league's standings failed. `stage` tells whether the old rows may already be gone.
#[derive(Debug, thiserror::Error)]
#[error("failed to {stage} standings rows: {source}")]
pub(crate) struct WriteError {
    pub(crate) stage: WriteStage,
    #[source] pub(crate) source: Error,
}

impl WriteError {
    pub(crate) fn new(stage: WriteStage, source: impl Into<Error>) -> Self {
        Self { stage, source: source.into() }
    }
}

impl IsNetworkError for WriteError {
    fn is_network_error(&self) -> bool {
        self.source.is_network_error()
    }
}

#[async_trait]
pub(crate) trait Store: Send + Sync {
    async fn fixture(&self, id: FixtureId) -> Result<Option<Fixture>, Error>;
    async fn teams(&self, league: &LeagueCode) -> Result<Vec<Team>, Error>;
    /// A league's fixtures, ordered by round and then by id.
    async fn fixtures(&self, league: &LeagueCode) -> Result<Vec<Fixture>, Error>;
    /// Results of exactly the given fixtures. Unplayed fixtures have no entry.
    async fn results(&self, fixtures: &[FixtureId]) -> Result<HashMap<FixtureId, Score>, Error>;
    /// Persisted standings rows in no particular order.
    async fn standings(&self, league: &LeagueCode) -> Result<Vec<StandingRow>, Error>;
    /// Deletes all standings rows of the league, then inserts `rows` as one batch.
    async fn replace_standings(&self, league: &LeagueCode, rows: &[StandingRow]) -> Result<(), WriteError>;
    async fn save_result(&self, fixture: FixtureId, score: Score) -> Result<(), Error>;
    /// Returns whether a result was recorded before.
    async fn delete_result(&self, fixture: FixtureId) -> Result<bool, Error>;
}
