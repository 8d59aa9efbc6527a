use {
    clap::Parser as _,
    crate::{
        prelude::*,
        store::{
            memory::MemoryStore,
            postgres::PgStore,
        },
    },
};

mod config;
mod http;
mod id;
mod league;
mod prelude;
mod standings;
mod store;

#[allow(unused)] // variants only constructed under conditional compilation
#[derive(Default, Clone, Copy)]
pub(crate) enum Environment {
    #[cfg_attr(any(feature = "production", not(any(feature = "dev", feature = "local", debug_assertions))), default)]
    Production,
    #[cfg_attr(any(feature = "dev", all(debug_assertions, not(feature = "production"), not(feature = "local"))), default)]
    Dev,
    #[cfg_attr(feature = "local", default)]
    Local,
}

impl Environment {
    fn is_dev(&self) -> bool {
        match self {
            Self::Production => false,
            Self::Dev => true,
            Self::Local => true,
        }
    }

    fn database_name(&self) -> &'static str {
        if self.is_dev() { "league_table_dev" } else { "league_table" }
    }

    fn config_file_name(&self) -> &'static str {
        if self.is_dev() { "league-table-dev.json" } else { "league-table.json" }
    }

    fn default_port(&self) -> u16 {
        match self {
            Self::Production => 24820,
            Self::Dev => 24821,
            Self::Local => 24822,
        }
    }
}

fn parse_port(arg: &str) -> Result<u16, std::num::ParseIntError> {
    match arg {
        "production" => Ok(Environment::Production.default_port()),
        "dev" => Ok(Environment::Dev.default_port()),
        _ => arg.parse(),
    }
}

#[derive(clap::Subcommand)]
enum Subcommand {
    /// Recompute the league of the given fixture once and exit.
    Recompute {
        fixture: FixtureId,
    },
    /// Print a league table recomputed from a JSON snapshot, without a database.
    Table {
        #[clap(long)]
        snapshot: PathBuf,
        league: LeagueCode,
    },
}

#[derive(clap::Parser)]
#[clap(version)]
struct Args {
    #[clap(long, value_parser = parse_port)]
    port: Option<u16>,
    /// Path to the config file, instead of looking it up in the XDG config directories.
    #[clap(long)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    subcommand: Option<Subcommand>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)] Config(#[from] config::Error),
    #[error(transparent)] Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)] Rocket(#[from] rocket::Error),
    #[error(transparent)] Snapshot(#[from] store::memory::LoadError),
    #[error(transparent)] Sql(#[from] sqlx::Error),
    #[error(transparent)] Standings(#[from] standings::Error),
    #[error(transparent)] Store(#[from] store::Error),
}

fn print_table(rows: &[StandingRow]) {
    let name_width = rows.iter().map(|row| row.team_name.chars().count()).max().unwrap_or_default().max(4);
    println!("{:>3}  {:<name_width$}  {:>2} {:>2} {:>2} {:>2}  {:>3}:{:<3} {:>4}  {:>3}", "#", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts");
    for (idx, row) in rows.iter().enumerate() {
        println!(
            "{:>3}  {:<name_width$}  {:>2} {:>2} {:>2} {:>2}  {:>3}:{:<3} {:>+4}  {:>3}",
            idx + 1, row.team_name, row.played, row.wins, row.draws, row.losses, row.goals_for, row.goals_against, row.goal_difference, row.points,
        );
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    let Args { port, config, subcommand } = Args::parse();
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    match subcommand {
        Some(Subcommand::Table { snapshot, league }) => {
            let store = MemoryStore::load(&snapshot).await?;
            let outcome = standings::recompute_league(&store, &LeagueLocks::default(), &league).await?;
            let mut rows = store.standings(&league).await?;
            standings::sort_for_display(&mut rows);
            println!("{} ({} teams)", outcome.league_code, outcome.teams_updated);
            print_table(&rows);
        }
        Some(Subcommand::Recompute { fixture }) => {
            let config = Config::load(config.as_deref()).await?;
            let store = PgStore::connect(&config).await?;
            store.migrate().await?;
            let outcome = standings::recompute(&store, &LeagueLocks::default(), fixture).await?;
            println!("recomputed {}: {} teams updated", outcome.league_code, outcome.teams_updated);
        }
        None => {
            let default_panic_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                log::error!("Thread panic: {:?}", info);
                default_panic_hook(info)
            }));
            let config = Config::load(config.as_deref()).await?;
            let store = PgStore::connect(&config).await?;
            store.migrate().await?;
            let port = port.or(config.port).unwrap_or_else(|| Environment::default().default_port());
            log::info!("serving league standings on port {port}");
            http::rocket(Arc::new(store), port).launch().await?;
        }
    }
    Ok(())
}
