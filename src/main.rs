//! Certificados gateway - main entry point.
//!
//! Wires configuration, the pooled MySQL layer, the keep-alive prober and the
//! HTTP server together, then serves until SIGINT/SIGTERM.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use certificados_gateway::config::Config;
use certificados_gateway::db::{
    KeepAliveProber, PoolManager, QueryExecutor, TransientErrorClassifier,
};
use certificados_gateway::http::{AppState, CorsPolicy, HttpServer};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    init_tracing(&config);

    info!(
        addr = %config.bind_addr(),
        "Starting certificados gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pools = Arc::new(PoolManager::new(config.db_config()));
    let classifier = TransientErrorClassifier::with_extra_states(&config.transient_sql_states);
    let executor = Arc::new(QueryExecutor::new(
        pools.clone(),
        classifier,
        config.query_timeout_duration(),
    ));

    // Boot-time reachability check; a failure is reported but does not stop
    // the gateway (the database may come up later).
    match executor.execute("SELECT 1 AS ok", &[]).await {
        Ok(_) => info!("Connected to MySQL (pool active)"),
        Err(err) => error!(
            code = ?err.sql_state(),
            error = %err.message(),
            "MySQL unreachable at startup"
        ),
    }

    KeepAliveProber::new(executor.clone(), config.keepalive_interval_duration()).spawn();

    let state = AppState {
        queries: executor,
        api_key: config.api_key.as_str().into(),
    };
    let policy = CorsPolicy::new(config.allowed_origins.clone());

    let server = HttpServer::new(&config, state, policy, pools);
    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
