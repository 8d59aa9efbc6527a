use {
    std::cmp::Ordering,
    chrono::{
        NaiveDate,
        NaiveTime,
    },
    crate::prelude::*,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub(crate) struct Team {
    pub(crate) id: TeamId,
    pub(crate) league_code: LeagueCode,
    pub(crate) name: String,
    /// Bye/TBD entries used for scheduling. Never part of a league table.
    #[serde(default)]
    pub(crate) is_placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub(crate) struct Fixture {
    pub(crate) id: FixtureId,
    pub(crate) league_code: LeagueCode,
    pub(crate) round: i32,
    pub(crate) home_team_id: TeamId,
    pub(crate) away_team_id: TeamId,
    #[serde(default)]
    pub(crate) group_tag: Option<String>,
    #[serde(default)]
    pub(crate) phase: Option<String>,
    #[serde(default)]
    pub(crate) kickoff_date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) kickoff_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct Score {
    pub(crate) home_goals: u16,
    pub(crate) away_goals: u16,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.home_goals, self.away_goals)
    }
}

/// One team's line in a league table. Always derived from fixtures and results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, sqlx::FromRow)]
pub(crate) struct StandingRow {
    pub(crate) league_code: LeagueCode,
    pub(crate) team_id: TeamId,
    pub(crate) team_name: String,
    pub(crate) played: i32,
    pub(crate) wins: i32,
    pub(crate) draws: i32,
    pub(crate) losses: i32,
    pub(crate) goals_for: i32,
    pub(crate) goals_against: i32,
    pub(crate) goal_difference: i32,
    pub(crate) points: i32,
    pub(crate) group_tag: Option<String>,
    pub(crate) phase: Option<String>,
}

impl StandingRow {
    pub(crate) const POINTS_FOR_WIN: i32 = 3;
    pub(crate) const POINTS_FOR_DRAW: i32 = 1;

    pub(crate) fn new(team: &Team) -> Self {
        Self {
            league_code: team.league_code.clone(),
            team_id: team.id,
            team_name: team.name.clone(),
            played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            goal_difference: 0,
            points: 0,
            group_tag: None,
            phase: None,
        }
    }

    /// Records one played fixture from this team's point of view.
    pub(crate) fn record(&mut self, scored: u16, conceded: u16) {
        self.played += 1;
        self.goals_for += i32::from(scored);
        self.goals_against += i32::from(conceded);
        match scored.cmp(&conceded) {
            Ordering::Greater => {
                self.wins += 1;
                self.points += Self::POINTS_FOR_WIN;
            }
            Ordering::Equal => {
                self.draws += 1;
                self.points += Self::POINTS_FOR_DRAW;
            }
            Ordering::Less => self.losses += 1,
        }
    }

    /// Takes the fixture's group and phase unless this row already carries one.
    pub(crate) fn backfill_tags(&mut self, fixture: &Fixture) {
        if self.group_tag.is_none() {
            self.group_tag.clone_from(&fixture.group_tag);
        }
        if self.phase.is_none() {
            self.phase.clone_from(&fixture.phase);
        }
    }
}
