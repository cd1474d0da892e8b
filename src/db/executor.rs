//! Query execution with single-retry connection recovery.
//!
//! Every statement runs against the pool lifecycle manager's current pool.
//! When an attempt fails with a dead-connection classification the executor
//! replaces the pool exactly once and reissues the identical statement exactly
//! once; the second outcome is final either way, bounding the worst case to
//! two round trips. Non-transient failures surface immediately so broken SQL
//! is never hidden behind a retry.

use async_trait::async_trait;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlArguments;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::db::classify::{FailureClass, TransientErrorClassifier};
use crate::db::params::QueryParam;
use crate::db::pool::PoolManager;
use crate::db::types::{RowMap, RowToJson};
use crate::error::{DbError, DbResult};

/// Seam between the HTTP layer and the database. The handlers only ever run
/// fixed parameter-less statements.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn fetch(&self, sql: &str) -> DbResult<Vec<RowMap>>;
}

/// Query executor bound to the process-wide pool manager.
pub struct QueryExecutor {
    pools: Arc<PoolManager>,
    classifier: TransientErrorClassifier,
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(
        pools: Arc<PoolManager>,
        classifier: TransientErrorClassifier,
        query_timeout: Duration,
    ) -> Self {
        Self {
            pools,
            classifier,
            query_timeout,
        }
    }

    /// Execute a statement, retrying once through a fresh pool if the current
    /// connection is classified as dead.
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<Vec<RowMap>> {
        let pool = self.pools.current().await;
        match self.attempt(&pool, sql, params).await {
            Ok(rows) => Ok(rows),
            Err(err) => match self.classifier.classify(&err) {
                FailureClass::Other => Err(err),
                FailureClass::ConnectionDead => {
                    warn!(
                        error = %err,
                        "Connection looks dead, replacing pool and retrying once"
                    );
                    let pool = self.pools.replace().await;
                    // Final outcome, success or the retry's own error.
                    self.attempt(&pool, sql, params).await
                }
            },
        }
    }

    async fn attempt(
        &self,
        pool: &MySqlPool,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<Vec<RowMap>> {
        debug!(sql = %sql, params = params.len(), "Executing query");

        // Parameter-less statements run unprepared; bound statements go
        // through the prepared-statement path.
        let fetched = if params.is_empty() {
            use sqlx::Executor;
            timeout(self.query_timeout, pool.fetch_all(sql)).await
        } else {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            timeout(self.query_timeout, query.fetch_all(pool)).await
        };

        let rows = match fetched {
            Ok(result) => result.map_err(DbError::from)?,
            Err(_) => {
                return Err(DbError::timeout(
                    "query execution",
                    self.query_timeout.as_secs(),
                ));
            }
        };

        Ok(rows.iter().map(RowToJson::to_json_map).collect())
    }
}

#[async_trait]
impl QueryService for QueryExecutor {
    async fn fetch(&self, sql: &str) -> DbResult<Vec<RowMap>> {
        self.execute(sql, &[]).await
    }
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
    }
}
