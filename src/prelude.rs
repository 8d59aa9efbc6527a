pub(crate) use {
    std::{
        collections::{
            HashMap,
            HashSet,
        },
        fmt,
        path::{
            Path,
            PathBuf,
        },
        str::FromStr,
        sync::Arc,
        time::Duration,
    },
    async_trait::async_trait,
    chrono::prelude::*,
    itertools::Itertools as _,
    rocket::{
        Request,
        State,
        http::Status,
        request::FromParam,
        serde::json::Json,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    sqlx::{
        PgPool,
        Postgres,
    },
    crate::{
        Environment,
        config::Config,
        id::{
            FixtureId,
            LeagueCode,
            TeamId,
        },
        league::{
            Fixture,
            Score,
            StandingRow,
            Team,
        },
        standings::LeagueLocks,
        store::Store,
    },
};
