//! League table recalculation.
//!
//! A league's standings are never patched: every result change recomputes the whole table from the
//! league's real teams, fixtures and results and replaces the stored rows.

use {
    std::cmp::Ordering,
    tokio::sync::{
        Mutex,
        OwnedMutexGuard,
    },
    crate::{
        http::IsNetworkError,
        prelude::*,
        store,
    },
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("fixture {0} not found")]
    NotFound(FixtureId),
    #[error("failed to load league data: {0}")]
    Read(#[from] store::Error),
    #[error(transparent)]
    Write(#[from] store::WriteError),
}

impl IsNetworkError for Error {
    fn is_network_error(&self) -> bool {
        match self {
            Self::NotFound(_) => false,
            Self::Read(e) => e.is_network_error(),
            Self::Write(e) => e.is_network_error(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Recomputed {
    pub(crate) league_code: LeagueCode,
    #[serde(rename = "teamsUpdated")]
    pub(crate) teams_updated: usize,
}

/// Serializes recomputes of the same league within this process.
#[derive(Default)]
pub(crate) struct LeagueLocks(Mutex<HashMap<LeagueCode, Arc<Mutex<()>>>>);

impl LeagueLocks {
    async fn lock(&self, league: &LeagueCode) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.0.lock().await.entry(league.clone()).or_default());
        lock.lock_owned().await
    }
}

/// Display order of a league table: points, goal difference and goals scored, all descending, then
/// team name. Team id breaks ties between identically named teams.
pub(crate) fn display_order(row1: &StandingRow, row2: &StandingRow) -> Ordering {
    row2.points.cmp(&row1.points)
        .then_with(|| row2.goal_difference.cmp(&row1.goal_difference))
        .then_with(|| row2.goals_for.cmp(&row1.goals_for))
        .then_with(|| row1.team_name.cmp(&row2.team_name))
        .then_with(|| row1.team_id.cmp(&row2.team_id))
}

pub(crate) fn sort_for_display(rows: &mut [StandingRow]) {
    rows.sort_by(display_order);
}

/// Folds results into one row per real team, returned in display order.
///
/// Fixtures are visited by round, then id. A team's group and phase come from the first such
/// fixture that has them and are never overwritten afterwards, so a team that played in two
/// differently tagged phases keeps the earlier tag.
pub(crate) fn compute(teams: &[Team], fixtures: &[Fixture], results: &HashMap<FixtureId, Score>) -> Vec<StandingRow> {
    let mut rows = teams.iter()
        .filter(|team| !team.is_placeholder)
        .map(|team| (team.id, StandingRow::new(team)))
        .collect::<HashMap<_, _>>();
    for fixture in fixtures.iter().sorted_by_key(|fixture| (fixture.round, fixture.id)) {
        let Some(score) = results.get(&fixture.id) else { continue };
        // placeholders, teams from other leagues and a team listed against itself
        if fixture.home_team_id == fixture.away_team_id { continue }
        if !rows.contains_key(&fixture.home_team_id) || !rows.contains_key(&fixture.away_team_id) { continue }
        if let Some(home) = rows.get_mut(&fixture.home_team_id) {
            home.record(score.home_goals, score.away_goals);
            home.backfill_tags(fixture);
        }
        if let Some(away) = rows.get_mut(&fixture.away_team_id) {
            away.record(score.away_goals, score.home_goals);
            away.backfill_tags(fixture);
        }
    }
    let mut rows = rows.into_values().collect_vec();
    for row in &mut rows {
        row.goal_difference = row.goals_for - row.goals_against;
    }
    sort_for_display(&mut rows);
    rows
}

/// Recomputes the table of the league the given fixture belongs to.
pub(crate) async fn recompute(store: &dyn Store, locks: &LeagueLocks, fixture_id: FixtureId) -> Result<Recomputed, Error> {
    let fixture = store.fixture(fixture_id).await?.ok_or(Error::NotFound(fixture_id))?;
    recompute_league(store, locks, &fixture.league_code).await
}

pub(crate) async fn recompute_league(store: &dyn Store, locks: &LeagueLocks, league: &LeagueCode) -> Result<Recomputed, Error> {
    let _lock = locks.lock(league).await;
    let (teams, fixtures) = tokio::try_join!(store.teams(league), store.fixtures(league))?;
    let teams = teams.into_iter().filter(|team| !team.is_placeholder).collect_vec();
    let rows = if teams.is_empty() || fixtures.is_empty() {
        log::debug!("league {league} has {} real teams and {} fixtures, clearing its standings", teams.len(), fixtures.len());
        Vec::default()
    } else {
        let results = store.results(&fixtures.iter().map(|fixture| fixture.id).collect_vec()).await?;
        compute(&teams, &fixtures, &results)
    };
    store.replace_standings(league, &rows).await?;
    log::info!("recomputed standings for league {league}: {} teams", rows.len());
    Ok(Recomputed {
        league_code: league.clone(),
        teams_updated: rows.len(),
    })
}
