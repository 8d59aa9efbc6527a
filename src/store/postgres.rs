use {
    sqlx::{
        ConnectOptions as _,
        QueryBuilder,
        postgres::{
            PgConnectOptions,
            PgPoolOptions,
        },
    },
    crate::{
        prelude::*,
        store::{
            Error,
            WriteError,
            WriteStage,
        },
    },
};

pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let mut db_options = PgConnectOptions::default()
            .username("league")
            .database(Environment::default().database_name())
            .application_name("league-table")
            .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(10));
        if let Some(ref db_config) = config.database {
            if let Some(ref host) = db_config.host {
                db_options = db_options.host(host);
            }
            if let Some(port) = db_config.port {
                db_options = db_options.port(port);
            }
            if let Some(ref username) = db_config.username {
                db_options = db_options.username(username);
            }
            if let Some(ref password) = db_config.password {
                db_options = db_options.password(password);
            }
            if let Some(ref database) = db_config.database {
                db_options = db_options.database(database);
            }
        }
        let pool = PgPoolOptions::default()
            .max_connections(config.max_connections.unwrap_or(16))
            .connect_with(db_options)
            .await?;
        Ok(Self { pool })
    }

    pub(crate) async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    fixture_id: FixtureId,
    home_goals: i32,
    away_goals: i32,
}

impl ResultRow {
    fn goals(&self, column: &'static str, value: i32) -> Result<u16, Error> {
        u16::try_from(value).map_err(|_| Error::OutOfRange {
            table: "results",
            column,
            id: self.fixture_id.get(),
            value: value.into(),
        })
    }

    fn score(&self) -> Result<Score, Error> {
        Ok(Score {
            home_goals: self.goals("home_goals", self.home_goals)?,
            away_goals: self.goals("away_goals", self.away_goals)?,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn fixture(&self, id: FixtureId) -> Result<Option<Fixture>, Error> {
        Ok(sqlx::query_as::<_, Fixture>(
            "SELECT id, league_code, round, home_team_id, away_team_id, group_tag, phase, kickoff_date, kickoff_time
             FROM fixtures WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn teams(&self, league: &LeagueCode) -> Result<Vec<Team>, Error> {
        Ok(sqlx::query_as::<_, Team>("SELECT id, league_code, name, is_placeholder FROM teams WHERE league_code = $1 ORDER BY id")
            .bind(league)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn fixtures(&self, league: &LeagueCode) -> Result<Vec<Fixture>, Error> {
        Ok(sqlx::query_as::<_, Fixture>(
            "SELECT id, league_code, round, home_team_id, away_team_id, group_tag, phase, kickoff_date, kickoff_time
             FROM fixtures WHERE league_code = $1 ORDER BY round, id"
        )
        .bind(league)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn results(&self, fixtures: &[FixtureId]) -> Result<HashMap<FixtureId, Score>, Error> {
        let ids = fixtures.iter().map(|id| id.get()).collect_vec();
        let rows = sqlx::query_as::<_, ResultRow>("SELECT fixture_id, home_goals, away_goals FROM results WHERE fixture_id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|row| row.score().map(|score| (row.fixture_id, score))).collect()
    }

    async fn standings(&self, league: &LeagueCode) -> Result<Vec<StandingRow>, Error> {
        Ok(sqlx::query_as::<_, StandingRow>(
            "SELECT s.league_code, s.team_id, t.name AS team_name, s.played, s.wins, s.draws, s.losses,
                    s.goals_for, s.goals_against, s.goal_difference, s.points, s.group_tag, s.phase
             FROM standings s JOIN teams t ON t.id = s.team_id
             WHERE s.league_code = $1"
        )
        .bind(league)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn replace_standings(&self, league: &LeagueCode, rows: &[StandingRow]) -> Result<(), WriteError> {
        let mut transaction = self.pool.begin().await.map_err(|e| WriteError::new(WriteStage::Delete, e))?;
        // serializes replacements of the same league across processes until commit
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(league)
            .execute(&mut *transaction)
            .await
            .map_err(|e| WriteError::new(WriteStage::Delete, e))?;
        sqlx::query("DELETE FROM standings WHERE league_code = $1")
            .bind(league)
            .execute(&mut *transaction)
            .await
            .map_err(|e| WriteError::new(WriteStage::Delete, e))?;
        if !rows.is_empty() {
            let mut query = QueryBuilder::<Postgres>::new(
                "INSERT INTO standings (league_code, team_id, played, wins, draws, losses, goals_for, goals_against, goal_difference, points, group_tag, phase) "
            );
            query.push_values(rows, |mut row_query, row| {
                row_query
                    .push_bind(row.league_code.clone())
                    .push_bind(row.team_id)
                    .push_bind(row.played)
                    .push_bind(row.wins)
                    .push_bind(row.draws)
                    .push_bind(row.losses)
                    .push_bind(row.goals_for)
                    .push_bind(row.goals_against)
                    .push_bind(row.goal_difference)
                    .push_bind(row.points)
                    .push_bind(row.group_tag.clone())
                    .push_bind(row.phase.clone());
            });
            query.build()
                .execute(&mut *transaction)
                .await
                .map_err(|e| WriteError::new(WriteStage::Insert, e))?;
        }
        transaction.commit().await.map_err(|e| WriteError::new(WriteStage::Insert, e))?;
        Ok(())
    }

    async fn save_result(&self, fixture: FixtureId, score: Score) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO results (fixture_id, home_goals, away_goals) VALUES ($1, $2, $3)
             ON CONFLICT (fixture_id) DO UPDATE SET home_goals = EXCLUDED.home_goals, away_goals = EXCLUDED.away_goals"
        )
        .bind(fixture)
        .bind(i32::from(score.home_goals))
        .bind(i32::from(score.away_goals))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_result(&self, fixture: FixtureId) -> Result<bool, Error> {
        let deleted = sqlx::query("DELETE FROM results WHERE fixture_id = $1")
            .bind(fixture)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}
