//! Connection pool lifecycle management.
//!
//! A single MySQL pool is live at any time. The manager owns it behind an
//! atomically swappable handle: readers clone the current pool, and only
//! [`PoolManager::replace`] may swap it, when the executor reports the
//! underlying link as dead. Pools are built lazily so the process starts (and
//! pool replacement succeeds) even while the database is unreachable.

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{Executor, MySqlPool};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Settings for building each pool instance.
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Applied via `SET SESSION wait_timeout` / `interactive_timeout` on each
    /// new physical connection.
    pub session_timeout_secs: u64,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("session_timeout_secs", &self.session_timeout_secs)
            .finish()
    }
}

/// Owner of the process-wide active connection pool.
#[derive(Debug)]
pub struct PoolManager {
    config: DbConfig,
    current: RwLock<MySqlPool>,
    replacements: AtomicU64,
}

impl PoolManager {
    /// Create the manager and its first (lazy) pool.
    pub fn new(config: DbConfig) -> Self {
        let pool = Self::build_pool(&config);
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "Created connection pool"
        );
        Self {
            config,
            current: RwLock::new(pool),
            replacements: AtomicU64::new(0),
        }
    }

    fn build_pool(config: &DbConfig) -> MySqlPool {
        let mut connect = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .charset("utf8mb4");
        if !config.password.is_empty() {
            connect = connect.password(&config.password);
        }
        if !config.database.is_empty() {
            connect = connect.database(&config.database);
        }

        let session_timeout = config.session_timeout_secs;
        MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .after_connect(move |conn, _meta| {
                // One-time per-physical-connection side effect: extend the
                // server-side session timeouts so idle pooled connections are
                // not dropped by the server first.
                Box::pin(async move {
                    let stmt = format!("SET SESSION wait_timeout = {session_timeout}");
                    conn.execute(stmt.as_str()).await?;
                    let stmt = format!("SET SESSION interactive_timeout = {session_timeout}");
                    conn.execute(stmt.as_str()).await?;
                    Ok(())
                })
            })
            .connect_lazy_with(connect)
    }

    /// The active pool. Cheap handle clone; concurrent in-flight queries on a
    /// previously returned handle are unaffected by a later swap.
    pub async fn current(&self) -> MySqlPool {
        self.current.read().await.clone()
    }

    /// Swap in a freshly built pool and return it. The old pool is drained on
    /// a detached task so a hanging close can never delay the swap.
    pub async fn replace(&self) -> MySqlPool {
        let fresh = Self::build_pool(&self.config);
        let old = {
            let mut current = self.current.write().await;
            std::mem::replace(&mut *current, fresh.clone())
        };
        let replacements = self.replacements.fetch_add(1, Ordering::Relaxed) + 1;
        info!(replacements, "Replaced connection pool");

        tokio::spawn(async move {
            old.close().await;
            debug!("Old connection pool drained");
        });

        fresh
    }

    /// Number of pool replacements since startup.
    pub fn replacement_count(&self) -> u64 {
        self.replacements.load(Ordering::Relaxed)
    }

    /// Gracefully drain the active pool at shutdown. Callers bound this with
    /// a timeout.
    pub async fn close(&self) {
        let pool = self.current.read().await.clone();
        pool.close().await;
        info!("Connection pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_config() -> DbConfig {
        DbConfig {
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: "certificados".to_string(),
            max_connections: 2,
            acquire_timeout: Duration::from_secs(1),
            session_timeout_secs: 28800,
        }
    }

    #[tokio::test]
    async fn test_manager_starts_with_zero_replacements() {
        let manager = PoolManager::new(lazy_config());
        assert_eq!(manager.replacement_count(), 0);
    }

    #[tokio::test]
    async fn test_replace_increments_counter_and_swaps() {
        let manager = PoolManager::new(lazy_config());
        let before = manager.current().await;

        manager.replace().await;
        assert_eq!(manager.replacement_count(), 1);

        manager.replace().await;
        assert_eq!(manager.replacement_count(), 2);

        // The pre-swap handle still exists independently of the new pool.
        assert!(!manager.current().await.is_closed());
        drop(before);
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = lazy_config();
        config.password = "hunter2".to_string();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
