//! Database connectivity and assessment lookup
//!
//! Owns the bounded Postgres pool, the startup liveness probe, and the
//! single query this service issues. The pool is created lazily so the
//! probe loop decides when the database is actually reachable.

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Connection, PgPool};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on concurrently open pool connections
pub const MAX_POOL_CONNECTIONS: u32 = 50;

/// Delay between startup liveness probes
pub const PING_INTERVAL: Duration = Duration::from_secs(5);

/// Longest the startup probe loop will wait for a first success
pub const PING_DEADLINE: Duration = Duration::from_secs(30);

/// Lookup issued per request. The identifier is always bound, never
/// interpolated into the text.
const ASSESSMENTS_QUERY: &str =
    "SELECT assessmentunitidentifier FROM assessments_by_catchment WHERE huc12 = $1";

/// Startup connectivity errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database did not respond within {}s", waited.as_secs())]
    Unavailable { waited: Duration },
}

/// Per-request query errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// The driver reported the no-rows condition as an error
    #[error("no rows")]
    NoRows,

    #[error(transparent)]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => QueryError::NoRows,
            other => QueryError::Db(other),
        }
    }
}

/// Build the shared pool without connecting
///
/// Connections are opened on first use, so startup reachability is decided
/// by [`wait_until_ready`], not here. SSL is disabled to match the backing
/// database's deployment.
pub fn connect_pool(config: &DatabaseConfig) -> PgPool {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.dbname)
        .ssl_mode(PgSslMode::Disable);

    PgPoolOptions::new()
        .max_connections(MAX_POOL_CONNECTIONS)
        .connect_lazy_with(options)
}

/// Single liveness probe against the pool
async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}

/// Block startup until the database answers a probe
///
/// Probes once immediately, then retries every [`PING_INTERVAL`] until a
/// probe succeeds or [`PING_DEADLINE`] elapses.
pub async fn wait_until_ready(pool: &PgPool) -> Result<(), DbError> {
    if ping(pool).await.is_ok() {
        return Ok(());
    }
    retry_until_ready(|| ping(pool), PING_INTERVAL, PING_DEADLINE).await
}

/// Two-state probe loop: `probing` until either a probe succeeds or the
/// deadline fires, whichever comes first. The deadline wins a tie.
async fn retry_until_ready<F, Fut>(
    mut probe: F,
    interval: Duration,
    deadline: Duration,
) -> Result<(), DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), sqlx::Error>>,
{
    let timeout = tokio::time::sleep(deadline);
    tokio::pin!(timeout);

    let mut tick = tokio::time::interval(interval);
    tick.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            biased;

            _ = &mut timeout => {
                return Err(DbError::Unavailable { waited: deadline });
            }
            _ = tick.tick() => {
                match probe().await {
                    Ok(()) => return Ok(()),
                    Err(err) => tracing::warn!("no response from database, retrying: {err}"),
                }
            }
        }
    }
}

/// Read-only source of assessment unit ids for a catchment
///
/// The seam the request handler queries through; tests substitute their
/// own implementation for the Postgres-backed one.
pub trait AssessmentSource: Clone + Send + Sync + 'static {
    /// Fetch every assessment unit id recorded against `huc`
    fn assessment_ids(
        &self,
        huc: &str,
    ) -> impl Future<Output = Result<Vec<String>, QueryError>> + Send;
}

/// Postgres-backed [`AssessmentSource`]
#[derive(Clone)]
pub struct PgAssessmentSource {
    pool: PgPool,
}

impl PgAssessmentSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the underlying pool (used during graceful shutdown)
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl AssessmentSource for PgAssessmentSource {
    async fn assessment_ids(&self, huc: &str) -> Result<Vec<String>, QueryError> {
        let ids = sqlx::query_scalar(ASSESSMENTS_QUERY)
            .bind(huc)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
