use crate::{
    data::NameMatch,
    error::{BadEnvVarSnafu, CollegeResult, ParseNumberSnafu},
};
use dotenvy::var;
use secrecy::{ExposeSecret, SecretString};
use snafu::ResultExt;
use std::sync::Arc;

const DEFAULT_SERVER_IP: &str = "127.0.0.1:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 15;

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    db_config: Arc<DbConfig>,
    server_ip: String,
    name_match: NameMatch,
    max_connections: u32,
}

impl RuntimeConfiguration {
    pub fn new() -> CollegeResult<Self> {
        let name_match = match var("COLLEGE_NAME_MATCH") {
            Ok(provided) => provided.parse()?,
            Err(_) => NameMatch::default(),
        };
        let max_connections = match var("COLLEGE_MAX_CONNECTIONS") {
            Ok(provided) => provided.parse().context(ParseNumberSnafu {
                name: "COLLEGE_MAX_CONNECTIONS",
            })?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            db_config: Arc::new(DbConfig::new()?),
            server_ip: var("COLLEGE_SERVER_IP").unwrap_or_else(|_| DEFAULT_SERVER_IP.to_string()),
            name_match,
            max_connections,
        })
    }

    pub fn db_config(&self) -> Arc<DbConfig> {
        self.db_config.clone()
    }

    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    pub const fn name_match(&self) -> NameMatch {
        self.name_match
    }

    pub const fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

#[derive(Debug)]
pub struct DbConfig {
    user: String,
    password: SecretString,
    path: String,
    port: u16,
    database: String,
}

impl DbConfig {
    pub fn new() -> CollegeResult<Self> {
        let get_env_var = |name| var(name).context(BadEnvVarSnafu { name });

        Ok(Self {
            user: get_env_var("DB_USER")?,
            password: SecretString::from(get_env_var("DB_PASSWORD")?),
            path: get_env_var("DB_PATH")?,
            port: get_env_var("DB_PORT")?
                .parse()
                .context(ParseNumberSnafu { name: "DB_PORT" })?,
            database: get_env_var("DB_NAME")?,
        })
    }

    pub fn get_db_path(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.password.expose_secret(),
            self.path,
            self.port,
            self.database
        )
    }
}
