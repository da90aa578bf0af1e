//! Random-sample probe for the assessments-by-catchment database
//!
//! # Architecture
//! - **config**: environment-driven settings (PG* variables, listen port)
//! - **db**: connection pool, startup liveness probe, assessment lookup
//! - **hucs**: in-memory catchment identifier list
//! - **server**: HTTP surface (root route, count response)
//! - **logging**: tracing setup

pub mod config;
pub mod db;
pub mod hucs;
pub mod logging;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use server::AppState;

use thiserror::Error;

/// Main error type for service startup
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to load env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Db(#[from] db::DbError),

    #[error(transparent)]
    Hucs(#[from] hucs::HucError),

    #[error("{0} contains no identifiers")]
    EmptyHucList(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ProbeError>;
