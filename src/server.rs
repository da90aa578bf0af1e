//! HTTP surface
//!
//! One route: `GET /` samples a random catchment and answers with the
//! number of assessment rows recorded against it. Every other path is a
//! 404. Per-request failures never escape the request that hit them.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tower_http::trace::TraceLayer;

use crate::db::{AssessmentSource, QueryError};
use crate::hucs::HucList;
use crate::ProbeError;

/// Deadline for the per-request database call
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared application state
#[derive(Clone)]
pub struct AppState<S> {
    pub hucs: Arc<HucList>,
    pub source: S,
}

/// Per-request errors, mapped to plain-text HTTP responses
#[derive(Debug)]
enum AppError {
    NotFound,
    Timeout,
    Query(sqlx::Error),
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NoRows => AppError::NotFound,
            QueryError::Db(db) => AppError::Query(db),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            AppError::Timeout => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("query exceeded {}s deadline", QUERY_TIMEOUT.as_secs()),
            ),
            AppError::Query(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };
        (status, body).into_response()
    }
}

/// Build the router over any assessment source
pub fn router<S: AssessmentSource>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(count_assessments::<S>))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener and serve until a shutdown signal arrives
pub async fn serve<S: AssessmentSource>(state: AppState<S>, port: u16) -> crate::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(ProbeError::Io)?;
    tracing::info!("server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ProbeError::Io)?;

    Ok(())
}

/// Handler for `GET /`
///
/// Picks a random catchment, counts its assessment rows under the request
/// deadline. Exceeding the deadline drops the query future, which cancels
/// the in-flight query.
async fn count_assessments<S: AssessmentSource>(
    State(state): State<AppState<S>>,
) -> Result<String, AppError> {
    let huc = state.hucs.pick();
    tracing::debug!(huc, "counting assessments");

    let ids = timeout(QUERY_TIMEOUT, state.source.assessment_ids(huc))
        .await
        .map_err(|_| AppError::Timeout)??;

    Ok(format!("Count: {}", ids.len()))
}

/// Fallback for every path other than `/`
async fn not_found() -> AppError {
    AppError::NotFound
}

/// Resolves on SIGTERM or Ctrl-C
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Scripted reply for the stub source
    #[derive(Clone)]
    enum Reply {
        Rows(usize),
        NoRows,
        Fail,
        Stall,
    }

    /// Sets its flag when the query future is dropped before completing
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Clone)]
    struct StubSource {
        reply: Reply,
        calls: Arc<AtomicUsize>,
        cancelled: Arc<AtomicBool>,
    }

    impl StubSource {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: Arc::new(AtomicUsize::new(0)),
                cancelled: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl AssessmentSource for StubSource {
        async fn assessment_ids(&self, huc: &str) -> Result<Vec<String>, QueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Rows(n) => Ok((0..n).map(|i| format!("{huc}-unit-{i}")).collect()),
                Reply::NoRows => Err(QueryError::NoRows),
                Reply::Fail => Err(QueryError::Db(sqlx::Error::PoolTimedOut)),
                Reply::Stall => {
                    let pending = DropFlag(self.cancelled.clone());
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    std::mem::forget(pending);
                    Ok(Vec::new())
                }
            }
        }
    }

    fn app(reply: Reply) -> (Router, StubSource) {
        let source = StubSource::new(reply);
        let state = AppState {
            hucs: Arc::new(HucList::new(vec!["huc-A".into(), "huc-B".into()])),
            source: source.clone(),
        };
        (router(state), source)
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (app, source) = app(Reply::Rows(4));
        let response = app.oneshot(get("/other")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "not found");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_root_counts_rows() {
        let (app, source) = app(Reply::Rows(4));
        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body_string(response).await, "Count: 4");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_count_zero() {
        let (app, _) = app(Reply::Rows(0));
        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Count: 0");
    }

    #[tokio::test]
    async fn test_no_rows_error_is_not_found() {
        let (app, _) = app(Reply::NoRows);
        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "not found");
    }

    #[tokio::test]
    async fn test_query_failure_is_server_error() {
        let (app, _) = app(Reply::Fail);
        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_query_is_cancelled() {
        let (app, source) = app(Reply::Stall);
        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("deadline"));
        assert!(source.cancelled.load(Ordering::SeqCst));
    }
}
