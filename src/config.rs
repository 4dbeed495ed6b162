use crate::errors::ConfigError;
use chrono_tz::Tz;
use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_COLLECTION: &str = "call_information";
pub const DEFAULT_DATA_PATH: &str = "data/call_information.json";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Mexico_City;

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Mongo {
        uri: String,
        database: String,
        collection: String,
    },
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub source: DataSource,
    pub timezone: Tz,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = var("PORT")
            .and_then(|value| value.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let source = match var("MONGODB_URI") {
            Some(uri) => DataSource::Mongo {
                uri,
                database: var("MONGODB_DATABASE").ok_or(ConfigError::MissingVar("MONGODB_DATABASE"))?,
                collection: var("MONGODB_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            },
            None => DataSource::File(PathBuf::from(
                var("CALLS_DATA_PATH").unwrap_or_else(|| DEFAULT_DATA_PATH.to_string()),
            )),
        };

        let timezone = match var("DASHBOARD_TIMEZONE") {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(name.clone()))?,
            None => DEFAULT_TIMEZONE,
        };

        Ok(Self {
            port,
            source,
            timezone,
        })
    }
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::Mongo {
                database,
                collection,
                ..
            } => format!("mongodb {database}.{collection}"),
            DataSource::File(path) => format!("file {}", path.display()),
        }
    }
}
