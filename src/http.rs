use {
    rocket::{
        Build,
        Rocket,
        config::LogLevel,
        response::Responder,
    },
    crate::{
        prelude::*,
        standings::{
            self,
            Recomputed,
        },
        store,
    },
};

pub(crate) trait IsNetworkError {
    fn is_network_error(&self) -> bool;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_saved: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("missing fixture id")]
    MissingFixtureId,
    #[error("invalid fixture id: {0:?}")]
    InvalidFixtureId(String),
    #[error("invalid league code: {0:?}")]
    InvalidLeagueCode(String),
    #[error("invalid request body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("goals must be between 0 and 65535, got {0}")]
    InvalidGoals(i64),
    #[error("fixture {0} not found")]
    FixtureNotFound(FixtureId),
    #[error("failed to save result: {0}")]
    Save(#[source] store::Error),
    #[error("result saved but standings recompute failed: {0}")]
    SavedButNotRecomputed(#[source] standings::Error),
    #[error(transparent)] Standings(#[from] standings::Error),
    #[error(transparent)] Store(#[from] store::Error),
}

impl IsNetworkError for Error {
    fn is_network_error(&self) -> bool {
        match self {
            Self::MissingFixtureId => false,
            Self::InvalidFixtureId(_) => false,
            Self::InvalidLeagueCode(_) => false,
            Self::Body(_) => false,
            Self::InvalidGoals(_) => false,
            Self::FixtureNotFound(_) => false,
            Self::Save(e) => e.is_network_error(),
            Self::SavedButNotRecomputed(e) => e.is_network_error(),
            Self::Standings(e) => e.is_network_error(),
            Self::Store(e) => e.is_network_error(),
        }
    }
}

impl Error {
    fn status(&self) -> Status {
        match self {
            Self::MissingFixtureId | Self::InvalidFixtureId(_) | Self::InvalidLeagueCode(_) | Self::Body(_) | Self::InvalidGoals(_) => Status::BadRequest,
            Self::FixtureNotFound(_) | Self::Standings(standings::Error::NotFound(_)) => Status::NotFound,
            _ if self.is_network_error() => Status::BadGateway,
            _ => Status::InternalServerError,
        }
    }

    fn result_saved(&self) -> Option<bool> {
        match self {
            Self::Save(_) => Some(false),
            Self::SavedButNotRecomputed(_) => Some(true),
            _ => None,
        }
    }
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();
        if status.class().is_server_error() {
            log::error!("responding with {status} to request to {}: {self}", request.uri());
            log::debug!("{self:?}");
        } else {
            log::warn!("responding with {status} to request to {}: {self}", request.uri());
        }
        (status, Json(ErrorBody {
            result_saved: self.result_saved(),
            error: self.to_string(),
        })).respond_to(request)
    }
}

#[derive(Serialize)]
pub(crate) struct RecomputeResponse {
    ok: bool,
    #[serde(flatten)]
    recomputed: Recomputed,
}

impl From<Recomputed> for RecomputeResponse {
    fn from(recomputed: Recomputed) -> Self {
        Self { ok: true, recomputed }
    }
}

#[derive(Deserialize)]
struct RecomputeRequest {
    #[serde(default, alias = "fixtureId")]
    fixture_id: Option<serde_json::Value>,
}

fn fixture_id_from_json(value: serde_json::Value) -> Result<FixtureId, Error> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().map(FixtureId::from).ok_or_else(|| Error::InvalidFixtureId(n.to_string())),
        serde_json::Value::String(s) => s.trim().parse().map_err(|_| Error::InvalidFixtureId(s)),
        serde_json::Value::Null => Err(Error::MissingFixtureId),
        value => Err(Error::InvalidFixtureId(value.to_string())),
    }
}

#[rocket::post("/api/standings/recompute/<fixture_id>")]
pub(crate) async fn recompute_path(store: &State<Arc<dyn Store>>, locks: &State<LeagueLocks>, fixture_id: Result<FixtureId, &str>) -> Result<Json<RecomputeResponse>, Error> {
    let fixture_id = fixture_id.map_err(|id| Error::InvalidFixtureId(id.to_owned()))?;
    let recomputed = standings::recompute(store.inner().as_ref(), locks, fixture_id).await?;
    Ok(Json(recomputed.into()))
}

/// Takes the fixture id from the query string or, failing that, from a JSON body.
#[rocket::post("/api/standings/recompute?<fixture_id>", data = "<body>")]
pub(crate) async fn recompute_query_or_body(store: &State<Arc<dyn Store>>, locks: &State<LeagueLocks>, fixture_id: Option<&str>, body: String) -> Result<Json<RecomputeResponse>, Error> {
    let fixture_id = if let Some(fixture_id) = fixture_id {
        fixture_id.trim().parse().map_err(|_| Error::InvalidFixtureId(fixture_id.to_owned()))?
    } else if body.trim().is_empty() {
        return Err(Error::MissingFixtureId)
    } else {
        let RecomputeRequest { fixture_id } = serde_json::from_str(&body)?;
        fixture_id_from_json(fixture_id.ok_or(Error::MissingFixtureId)?)?
    };
    let recomputed = standings::recompute(store.inner().as_ref(), locks, fixture_id).await?;
    Ok(Json(recomputed.into()))
}

#[derive(Serialize)]
pub(crate) struct RankedRow {
    position: usize,
    #[serde(flatten)]
    row: StandingRow,
}

#[rocket::get("/api/leagues/<league_code>/standings")]
pub(crate) async fn league_standings(store: &State<Arc<dyn Store>>, league_code: Result<LeagueCode, &str>) -> Result<Json<Vec<RankedRow>>, Error> {
    let league_code = league_code.map_err(|code| Error::InvalidLeagueCode(code.to_owned()))?;
    let mut rows = store.standings(&league_code).await?;
    standings::sort_for_display(&mut rows);
    Ok(Json(rows.into_iter().enumerate().map(|(idx, row)| RankedRow { position: idx + 1, row }).collect()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultInput {
    home_goals: i64,
    away_goals: i64,
}

impl ResultInput {
    fn score(&self) -> Result<Score, Error> {
        let goals = |goals: i64| u16::try_from(goals).map_err(|_| Error::InvalidGoals(goals));
        Ok(Score {
            home_goals: goals(self.home_goals)?,
            away_goals: goals(self.away_goals)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultResponse {
    ok: bool,
    fixture_id: FixtureId,
    #[serde(skip_serializing_if = "Option::is_none")]
    removed: Option<bool>,
    #[serde(flatten)]
    recomputed: Recomputed,
}

/// Records or corrects a fixture's result, then brings the league table up to date.
#[rocket::put("/api/fixtures/<fixture_id>/result", data = "<input>")]
pub(crate) async fn save_result(store: &State<Arc<dyn Store>>, locks: &State<LeagueLocks>, fixture_id: Result<FixtureId, &str>, input: Json<ResultInput>) -> Result<Json<ResultResponse>, Error> {
    let fixture_id = fixture_id.map_err(|id| Error::InvalidFixtureId(id.to_owned()))?;
    let score = input.score()?;
    let fixture = store.fixture(fixture_id).await?.ok_or(Error::FixtureNotFound(fixture_id))?;
    store.save_result(fixture_id, score).await.map_err(Error::Save)?;
    log::info!("saved result {score} for fixture {fixture_id} in league {}", fixture.league_code);
    let recomputed = standings::recompute_league(store.inner().as_ref(), locks, &fixture.league_code).await.map_err(Error::SavedButNotRecomputed)?;
    Ok(Json(ResultResponse { ok: true, fixture_id, removed: None, recomputed }))
}

#[rocket::delete("/api/fixtures/<fixture_id>/result")]
pub(crate) async fn delete_result(store: &State<Arc<dyn Store>>, locks: &State<LeagueLocks>, fixture_id: Result<FixtureId, &str>) -> Result<Json<ResultResponse>, Error> {
    let fixture_id = fixture_id.map_err(|id| Error::InvalidFixtureId(id.to_owned()))?;
    let fixture = store.fixture(fixture_id).await?.ok_or(Error::FixtureNotFound(fixture_id))?;
    let removed = store.delete_result(fixture_id).await.map_err(Error::Save)?;
    log::info!("deleted result for fixture {fixture_id} in league {} (existed: {removed})", fixture.league_code);
    let recomputed = standings::recompute_league(store.inner().as_ref(), locks, &fixture.league_code).await.map_err(Error::SavedButNotRecomputed)?;
    Ok(Json(ResultResponse { ok: true, fixture_id, removed: Some(removed), recomputed }))
}

fn error_response(status: Status, error: impl Into<String>) -> (Status, Json<ErrorBody>) {
    (status, Json(ErrorBody { error: error.into(), result_saved: None }))
}

#[rocket::catch(400)]
fn bad_request(request: &Request<'_>) -> (Status, Json<ErrorBody>) {
    log::warn!("responding with 400 Bad Request to request {} {}", request.method(), request.uri());
    error_response(Status::BadRequest, "malformed request")
}

#[rocket::catch(404)]
fn not_found(request: &Request<'_>) -> (Status, Json<ErrorBody>) {
    error_response(Status::NotFound, format!("no route for {} {}", request.method(), request.uri()))
}

#[rocket::catch(422)]
fn unprocessable_content(request: &Request<'_>) -> (Status, Json<ErrorBody>) {
    log::warn!("responding with 422 Unprocessable Content to request {} {}", request.method(), request.uri());
    error_response(Status::UnprocessableEntity, "request body does not match the expected shape")
}

#[rocket::catch(default)]
fn fallback_catcher(status: Status, request: &Request<'_>) -> (Status, Json<ErrorBody>) {
    log::error!("responding with unexpected HTTP status code {} {} to request {} {}", status.code, status.reason_lossy(), request.method(), request.uri());
    error_response(status, status.reason_lossy())
}

pub(crate) fn rocket(store: Arc<dyn Store>, port: u16) -> Rocket<Build> {
    rocket::custom(rocket::Config::figment().merge(rocket::Config {
        log_level: LogLevel::Critical,
        ..rocket::Config::default()
    }).merge(("port", port)))
    .mount("/", rocket::routes![
        recompute_path,
        recompute_query_or_body,
        league_standings,
        save_result,
        delete_result,
    ])
    .register("/", rocket::catchers![
        bad_request,
        not_found,
        unprocessable_content,
        fallback_catcher,
    ])
    .manage(store)
    .manage(LeagueLocks::default())
}

#[cfg(test)]
mod tests {
    use {
        rocket::{
            http::ContentType,
            local::asynchronous::{
                Client,
                LocalResponse,
            },
        },
        serde_json::{
            Value,
            json,
        },
        crate::store::memory::MemoryStore,
        super::*,
    };

    const SNAPSHOT: &str = include_str!("../demos/scenario.json");

    async fn client() -> (Client, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(serde_json::from_str(SNAPSHOT).expect("invalid demo snapshot")));
        let client = Client::tracked(rocket(store.clone(), 0)).await.expect("valid rocket instance");
        (client, store)
    }

    async fn body(response: LocalResponse<'_>) -> Value {
        response.into_json::<Value>().await.expect("response body is not JSON")
    }

    fn league() -> LeagueCode {
        "U11".parse().expect("valid league code")
    }

    #[rocket::async_test]
    async fn recompute_by_path() {
        let (client, store) = client().await;
        let response = client.post("/api/standings/recompute/1").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(body(response).await, json!({ "ok": true, "league_code": "U11", "teamsUpdated": 3 }));
        assert_eq!(store.standings(&league()).await.expect("memory store is infallible").len(), 3);
    }

    #[rocket::async_test]
    async fn recompute_by_query_and_body() {
        let (client, _) = client().await;
        let response = client.post("/api/standings/recompute?fixture_id=3").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(body(response).await["teamsUpdated"], 3);
        for payload in [r#"{"fixture_id": 2}"#, r#"{"fixtureId": "2"}"#] {
            let response = client.post("/api/standings/recompute").header(ContentType::JSON).body(payload).dispatch().await;
            assert_eq!(response.status(), Status::Ok, "payload {payload}");
            assert_eq!(body(response).await["league_code"], "U11");
        }
    }

    #[rocket::async_test]
    async fn recompute_rejects_bad_ids() {
        let (client, store) = client().await;
        for (request, status) in [
            (client.post("/api/standings/recompute/abc"), Status::BadRequest),
            (client.post("/api/standings/recompute?fixture_id=1x"), Status::BadRequest),
            (client.post("/api/standings/recompute"), Status::BadRequest),
            (client.post("/api/standings/recompute").header(ContentType::JSON).body(r#"{"fixture_id": 1.5}"#), Status::BadRequest),
            (client.post("/api/standings/recompute").header(ContentType::JSON).body("{"), Status::BadRequest),
            (client.post("/api/standings/recompute/404"), Status::NotFound),
        ] {
            let response = request.dispatch().await;
            assert_eq!(response.status(), status);
            assert!(body(response).await["error"].is_string());
        }
        assert!(store.standings(&league()).await.expect("memory store is infallible").is_empty());
    }

    #[rocket::async_test]
    async fn standings_in_display_order() {
        let (client, _) = client().await;
        client.post("/api/standings/recompute/1").dispatch().await;
        let response = client.get("/api/leagues/U11/standings").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let rows = body(response).await;
        let rows = rows.as_array().expect("standings are a list");
        let summary = rows.iter()
            .map(|row| (row["position"].as_u64(), row["team_name"].as_str(), row["points"].as_i64(), row["goal_difference"].as_i64()))
            .collect_vec();
        assert_eq!(summary, [
            (Some(1), Some("A"), Some(3), Some(1)),
            (Some(2), Some("C"), Some(1), Some(0)),
            (Some(3), Some("B"), Some(1), Some(-1)),
        ]);
        let response = client.get("/api/leagues/U%2011/standings").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn result_entry_updates_table() {
        let (client, store) = client().await;
        // A–P: the placeholder never gets a row, A's record is unchanged
        let response = client.put("/api/fixtures/2/result").header(ContentType::JSON).body(r#"{"homeGoals": 7, "awayGoals": 0}"#).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(body(response).await, json!({ "ok": true, "fixtureId": 2, "league_code": "U11", "teamsUpdated": 3 }));
        let response = client.put("/api/fixtures/3/result").header(ContentType::JSON).body(r#"{"homeGoals": 2, "awayGoals": 0}"#).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let mut rows = store.standings(&league()).await.expect("memory store is infallible");
        standings::sort_for_display(&mut rows);
        assert_eq!(rows.iter().map(|row| (&*row.team_name, row.points)).collect_vec(), [("B", 3), ("A", 3), ("C", 0)]);
        let response = client.delete("/api/fixtures/3/result").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(body(response).await["removed"], true);
        let rows = store.standings(&league()).await.expect("memory store is infallible");
        assert_eq!(rows.iter().map(|row| row.played).sum::<i32>(), 2);
    }

    #[rocket::async_test]
    async fn result_entry_validation() {
        let (client, _) = client().await;
        let response = client.put("/api/fixtures/1/result").header(ContentType::JSON).body(r#"{"homeGoals": -1, "awayGoals": 0}"#).dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
        assert!(body(response).await.get("resultSaved").is_none());
        let response = client.put("/api/fixtures/99/result").header(ContentType::JSON).body(r#"{"homeGoals": 1, "awayGoals": 0}"#).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let response = client.put("/api/fixtures/1/result").header(ContentType::JSON).body(r#"{"homeGoals": "two"}"#).dispatch().await;
        assert!(response.status().class().is_client_error());
        assert!(body(response).await["error"].is_string());
    }

    #[test]
    fn error_classification() {
        let saved = Error::SavedButNotRecomputed(standings::Error::Read(sqlx::Error::PoolTimedOut.into()));
        assert_eq!(saved.status(), Status::BadGateway);
        assert_eq!(saved.result_saved(), Some(true));
        let unsaved = Error::Save(sqlx::Error::RowNotFound.into());
        assert_eq!(unsaved.status(), Status::InternalServerError);
        assert_eq!(unsaved.result_saved(), Some(false));
        assert_eq!(Error::Standings(standings::Error::NotFound(FixtureId::from(5))).status(), Status::NotFound);
    }
}
