//! Router assembly and server lifecycle.

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::auth;
use crate::config::Config;
use crate::db::executor::QueryService;
use crate::db::pool::PoolManager;
use crate::error::{DbError, DbResult};
use crate::http::cors::{self, CorsPolicy};
use crate::http::handlers;

/// Shared state for the request handlers and the auth middleware.
#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<dyn QueryService>,
    pub api_key: Arc<str>,
}

/// Assemble the full application router.
///
/// Layer order, outermost first: origin gate, CORS layer, then routes (the
/// certificate and debug routes additionally carry the API-key middleware).
/// Preflight OPTIONS requests are answered by the CORS layer and therefore
/// never hit the API-key check, which browsers could not satisfy.
pub fn build_router(state: AppState, policy: &CorsPolicy) -> Router {
    let protected = Router::new()
        .route("/__debug/db-ping", get(handlers::db_ping))
        .route("/certificadosAPS", get(handlers::certificados_aps))
        .route("/certificadosFONE", get(handlers::certificados_fone))
        .route("/certificadosCECAP", get(handlers::certificados_cecap))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(protected)
        .layer(policy.layer())
        .layer(middleware::from_fn_with_state(
            policy.clone(),
            cors::enforce_origin,
        ))
        .with_state(state)
}

/// HTTP server owning the listen address and the shutdown sequence.
pub struct HttpServer {
    state: AppState,
    policy: CorsPolicy,
    pools: Arc<PoolManager>,
    bind_addr: String,
}

impl HttpServer {
    pub fn new(
        config: &Config,
        state: AppState,
        policy: CorsPolicy,
        pools: Arc<PoolManager>,
    ) -> Self {
        Self {
            state,
            policy,
            pools,
            bind_addr: config.bind_addr(),
        }
    }

    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Serve until a termination signal arrives, then drain: stop accepting,
    /// wait out in-flight requests (bounded, second signal forces exit) and
    /// close the pool.
    pub async fn run(&self) -> DbResult<()> {
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);
        const POOL_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

        let app = build_router(self.state.clone(), &self.policy);

        let listener = TcpListener::bind(&self.bind_addr).await.map_err(|e| {
            DbError::internal(format!("failed to bind to {}: {e}", self.bind_addr))
        })?;
        info!(addr = %self.bind_addr, "Gateway listening");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(DbError::internal(format!("HTTP server error: {e}")));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        info!("Closing connection pool");
        if tokio::time::timeout(POOL_CLOSE_TIMEOUT, self.pools.close())
            .await
            .is_err()
        {
            warn!(
                timeout_secs = POOL_CLOSE_TIMEOUT.as_secs(),
                "Pool close timed out, exiting anyway"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::RowMap;
    use async_trait::async_trait;
    use clap::Parser;

    struct NoQueries;

    #[async_trait]
    impl QueryService for NoQueries {
        async fn fetch(&self, _sql: &str) -> DbResult<Vec<RowMap>> {
            Ok(Vec::new())
        }
    }

    fn test_state() -> AppState {
        AppState {
            queries: Arc::new(NoQueries),
            api_key: "supersecreto".into(),
        }
    }

    #[tokio::test]
    async fn test_server_bind_addr() {
        let config = Config::parse_from(["certificados-gateway", "--http-host", "127.0.0.1", "--port", "8080"]);
        let pools = Arc::new(PoolManager::new(config.db_config()));
        let server = HttpServer::new(
            &config,
            test_state(),
            CorsPolicy::new(config.allowed_origins.clone()),
            pools,
        );
        assert_eq!(server.bind_addr(), "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_router_builds_with_empty_origin_list() {
        let policy = CorsPolicy::new(Vec::new());
        let _router = build_router(test_state(), &policy);
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
