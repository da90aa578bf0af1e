//! Configuration management
//!
//! Assembled from the process environment at startup. Database settings
//! follow the libpq PG* variable names; `.env.local` is loaded into the
//! environment before this module runs.

use std::num::ParseIntError;
use thiserror::Error;

/// Service configuration
///
/// Built once at startup from environment variables. The four PG*
/// connection variables are required; both ports have defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection settings
    pub database: DatabaseConfig,

    /// HTTP listener settings
    pub http: HttpConfig,
}

/// Postgres connection settings (PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

/// HTTP listener settings (PORT)
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Port the HTTP server binds on
    pub port: u16,
}

fn default_pg_port() -> u16 {
    5432
}

fn default_http_port() -> u16 {
    8080
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {source}")]
    InvalidPort {
        var: &'static str,
        value: String,
        source: ParseIntError,
    },
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// # Errors
    /// Returns an error if a required variable is unset or a port does not
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));
        let port = |var: &'static str, default: u16| match lookup(var) {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::InvalidPort { var, value, source }),
            None => Ok(default),
        };

        Ok(Self {
            database: DatabaseConfig {
                host: require("PGHOST")?,
                port: port("PGPORT", default_pg_port())?,
                user: require("PGUSER")?,
                password: require("PGPASSWORD")?,
                dbname: require("PGDATABASE")?,
            },
            http: HttpConfig {
                port: port("PORT", default_http_port())?,
            },
        })
    }
}
