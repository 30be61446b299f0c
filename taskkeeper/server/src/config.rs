use serde::Deserialize;

/// Server configuration, read from `TASKKEEPER_*` environment variables.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Full connection string. Composed from the `db_*` parts when unset.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_db_auth")]
    pub db_auth: String,
    #[serde(default = "default_db_host")]
    pub db_host: String,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed by CORS.
    #[serde(default = "default_www_host")]
    pub www_host: String,
    /// Password of the bootstrap admin account.
    pub admin_secret: String,
    pub jwt_secret: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(config::Environment::with_prefix("TASKKEEPER"))
    }

    fn from_source(source: config::Environment) -> anyhow::Result<Self> {
        let settings = config::Config::builder().add_source(source).build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// The connection string to hand to the database driver.
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}@{}/{}",
                self.db_auth, self.db_host, self.db_name
            ),
        }
    }
}

fn default_db_auth() -> String {
    tracing::warn!("TASKKEEPER_DB_AUTH not specified, defaulting to taskkeeper:taskkeeper");
    "taskkeeper:taskkeeper".to_string()
}

fn default_db_host() -> String {
    tracing::warn!("TASKKEEPER_DB_HOST not specified, defaulting to localhost:5432");
    "localhost:5432".to_string()
}

fn default_db_name() -> String {
    tracing::warn!("TASKKEEPER_DB_NAME not specified, defaulting to taskkeeper");
    "taskkeeper".to_string()
}

fn default_port() -> u16 {
    tracing::warn!("TASKKEEPER_PORT not specified, defaulting to 8888");
    8888
}

fn default_www_host() -> String {
    tracing::warn!("TASKKEEPER_WWW_HOST not specified, defaulting to http://localhost:8889");
    "http://localhost:8889".to_string()
}
