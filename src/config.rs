use crate::prelude::*;
#[cfg(unix)] use xdg::BaseDirectories;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source] source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source] source: serde_json::Error,
    },
    #[cfg(unix)]
    #[error("missing config file")]
    Missing,
}

#[derive(Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) database: Option<ConfigDatabase>,
    /// Overridden by `--port`.
    #[serde(default)]
    pub(crate) port: Option<u16>,
    #[serde(default)]
    pub(crate) max_connections: Option<u32>,
}

impl Config {
    pub(crate) async fn load(path: Option<&Path>) -> Result<Self, Error> {
        let path = if let Some(path) = path { path.to_owned() } else { Self::default_path()? };
        let buf = tokio::fs::read(&path).await.map_err(|source| Error::Read { path: path.clone(), source })?;
        serde_json::from_slice(&buf).map_err(|source| Error::Json { path, source })
    }

    #[cfg(unix)]
    fn default_path() -> Result<PathBuf, Error> {
        BaseDirectories::new().find_config_file(Environment::default().config_file_name()).ok_or(Error::Missing)
    }

    #[cfg(windows)]
    fn default_path() -> Result<PathBuf, Error> {
        Ok(PathBuf::from("cfg").join(Environment::default().config_file_name()))
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfigDatabase {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) database: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config() {
        let config = serde_json::from_str::<Config>(r#"{
            "database": { "host": "db.internal", "password": "hunter2" },
            "maxConnections": 4
        }"#).expect("valid config");
        let database = config.database.expect("database section");
        assert_eq!(database.host.as_deref(), Some("db.internal"));
        assert_eq!(database.username, None);
        assert_eq!(config.port, None);
        assert_eq!(config.max_connections, Some(4));
    }

    #[test]
    fn empty_config_is_valid() {
        let config = serde_json::from_str::<Config>("{}").expect("valid config");
        assert!(config.database.is_none());
    }

    #[rocket::async_test]
    async fn explicit_path_must_exist() {
        let result = Config::load(Some(Path::new("does/not/exist.json"))).await;
        assert!(matches!(result, Err(Error::Read { .. })));
    }
}
