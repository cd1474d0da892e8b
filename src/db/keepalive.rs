//! Periodic keep-alive probe.
//!
//! Cloud network layers tear down TCP connections that sit idle for a few
//! minutes, so a trivial query is pushed through the pool on a fixed cadence.
//! The probe goes through the query executor: a probe that lands on a dead
//! connection triggers the executor's own pool replacement, turning a silent
//! idle death into an immediate recovery. Probe failures are logged and
//! otherwise ignored.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::db::executor::QueryExecutor;

const PROBE_SQL: &str = "SELECT 1";

pub struct KeepAliveProber {
    executor: Arc<QueryExecutor>,
    interval: Duration,
}

impl KeepAliveProber {
    pub fn new(executor: Arc<QueryExecutor>, interval: Duration) -> Self {
        Self { executor, interval }
    }

    /// Start the probe loop as a detached background task.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting keep-alive prober"
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; startup reachability is
            // reported by the boot-time ping, so skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.executor.execute(PROBE_SQL, &[]).await {
                    Ok(_) => debug!("Keep-alive probe ok"),
                    Err(err) => warn!(
                        code = ?err.sql_state(),
                        error = %err.message(),
                        "Keep-alive probe failed"
                    ),
                }
            }
        })
    }
}
