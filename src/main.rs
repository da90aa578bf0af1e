//! Random-sample probe for the assessments-by-catchment database
//!
//! Startup order matters: credentials come from `.env.local`, the pool is
//! created lazily, and serving is gated on the database answering a probe
//! and on a non-empty catchment list.

use catchment_probe::config::Config;
use catchment_probe::db::{self, PgAssessmentSource};
use catchment_probe::hucs::{HucList, HUCS_FILE};
use catchment_probe::server::{self, AppState};
use catchment_probe::{logging, ProbeError, Result};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    dotenvy::from_filename(".env.local")?;
    let config = Config::from_env()?;

    // 1. Database: lazy pool, then gate on reachability
    let pool = db::connect_pool(&config.database);
    db::wait_until_ready(&pool).await?;

    // 2. Catchment list: loaded once, must be non-empty before serving
    let hucs = HucList::load(HUCS_FILE)?;
    if hucs.is_empty() {
        return Err(ProbeError::EmptyHucList(HUCS_FILE.to_string()));
    }
    tracing::info!("loaded {} catchment identifiers", hucs.len());

    // 3. Serve until SIGTERM/Ctrl-C, then release the pool
    let source = PgAssessmentSource::new(pool);
    let state = AppState {
        hucs: Arc::new(hucs),
        source: source.clone(),
    };
    server::serve(state, config.http.port).await?;

    source.close().await;
    Ok(())
}
