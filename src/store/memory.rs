//! In-process store over a JSON snapshot of the raw tables, as written by a table backup.

use {
    tokio::sync::RwLock,
    crate::{
        prelude::*,
        store::{
            Error,
            WriteError,
        },
    },
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum LoadError {
    #[error("failed to read snapshot {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source] source: std::io::Error,
    },
    #[error("invalid snapshot {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source] source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct ResultRecord {
    pub(crate) fixture_id: FixtureId,
    #[serde(flatten)]
    pub(crate) score: Score,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    pub(crate) teams: Vec<Team>,
    #[serde(default)]
    pub(crate) fixtures: Vec<Fixture>,
    #[serde(default)]
    pub(crate) results: Vec<ResultRecord>,
    #[serde(default)]
    pub(crate) standings: Vec<StandingRow>,
}

pub(crate) struct MemoryStore {
    tables: RwLock<Snapshot>,
}

impl MemoryStore {
    pub(crate) fn new(snapshot: Snapshot) -> Self {
        Self { tables: RwLock::new(snapshot) }
    }

    pub(crate) async fn load(path: &Path) -> Result<Self, LoadError> {
        let buf = tokio::fs::read(path).await.map_err(|source| LoadError::Io { path: path.to_owned(), source })?;
        let snapshot = serde_json::from_slice(&buf).map_err(|source| LoadError::Json { path: path.to_owned(), source })?;
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fixture(&self, id: FixtureId) -> Result<Option<Fixture>, Error> {
        Ok(self.tables.read().await.fixtures.iter().find(|fixture| fixture.id == id).cloned())
    }

    async fn teams(&self, league: &LeagueCode) -> Result<Vec<Team>, Error> {
        Ok(self.tables.read().await.teams.iter()
            .filter(|team| team.league_code == *league)
            .sorted_by_key(|team| team.id)
            .cloned()
            .collect())
    }

    async fn fixtures(&self, league: &LeagueCode) -> Result<Vec<Fixture>, Error> {
        Ok(self.tables.read().await.fixtures.iter()
            .filter(|fixture| fixture.league_code == *league)
            .sorted_by_key(|fixture| (fixture.round, fixture.id))
            .cloned()
            .collect())
    }

    async fn results(&self, fixtures: &[FixtureId]) -> Result<HashMap<FixtureId, Score>, Error> {
        let fixtures = fixtures.iter().collect::<HashSet<_>>();
        Ok(self.tables.read().await.results.iter()
            .filter(|result| fixtures.contains(&result.fixture_id))
            .map(|result| (result.fixture_id, result.score))
            .collect())
    }

    async fn standings(&self, league: &LeagueCode) -> Result<Vec<StandingRow>, Error> {
        Ok(self.tables.read().await.standings.iter()
            .filter(|row| row.league_code == *league)
            .cloned()
            .collect())
    }

    async fn replace_standings(&self, league: &LeagueCode, rows: &[StandingRow]) -> Result<(), WriteError> {
        let mut tables = self.tables.write().await;
        tables.standings.retain(|row| row.league_code != *league);
        tables.standings.extend_from_slice(rows);
        Ok(())
    }

    async fn save_result(&self, fixture: FixtureId, score: Score) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        if let Some(result) = tables.results.iter_mut().find(|result| result.fixture_id == fixture) {
            result.score = score;
        } else {
            tables.results.push(ResultRecord { fixture_id: fixture, score });
        }
        Ok(())
    }

    async fn delete_result(&self, fixture: FixtureId) -> Result<bool, Error> {
        let mut tables = self.tables.write().await;
        let before = tables.results.len();
        tables.results.retain(|result| result.fixture_id != fixture);
        Ok(tables.results.len() < before)
    }
}
