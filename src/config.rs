//! Configuration handling for the certificados gateway.
//!
//! Every knob is available both as a CLI flag and as an environment variable,
//! with defaults suitable for local development against a MySQL on localhost.

use clap::Parser;
use std::time::Duration;

use crate::db::pool::DbConfig;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_USER: &str = "root";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_API_KEY: &str = "supersecreto";

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
/// Session-level wait/interactive timeout applied to each new physical
/// connection (8 hours).
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 28800;

pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
/// Probe cadence shorter than the idle-teardown window of common cloud
/// network layers (5-15 minutes).
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 240;

/// Origins allowed to call the gateway from a browser.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,https://capacitacionsn.cruzrojamexicana.org.mx,https://capacitacion.cruzrojamexicana.org.mx";

/// Configuration for the certificados gateway.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "certificados-gateway",
    about = "Read-only HTTP gateway for certificate lookups backed by MySQL",
    version
)]
pub struct Config {
    /// MySQL server host
    #[arg(long, env = "DB_HOST", default_value = DEFAULT_DB_HOST)]
    pub db_host: String,

    /// MySQL user
    #[arg(long, env = "DB_USER", default_value = DEFAULT_DB_USER)]
    pub db_user: String,

    /// MySQL password
    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    /// Database to query
    #[arg(long, env = "DB_NAME", default_value = "")]
    pub db_name: String,

    /// MySQL server port
    #[arg(long, env = "DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    pub db_port: u16,

    /// API key callers must present in the x-api-key header
    #[arg(long, env = "API_KEY", default_value = DEFAULT_API_KEY, hide_env_values = true)]
    pub api_key: String,

    /// HTTP port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// HTTP host to bind to
    #[arg(long, env = "HTTP_HOST", default_value = DEFAULT_HTTP_HOST)]
    pub http_host: String,

    /// Origins allowed by the CORS policy, comma separated
    #[arg(
        long = "allowed-origin",
        value_name = "ORIGIN",
        env = "ALLOWED_ORIGINS",
        default_value = DEFAULT_ALLOWED_ORIGINS,
        value_delimiter = ','
    )]
    pub allowed_origins: Vec<String>,

    /// Maximum connections in the pool
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub db_max_connections: u32,

    /// Connection acquire timeout in seconds
    #[arg(long, env = "DB_ACQUIRE_TIMEOUT", default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS)]
    pub db_acquire_timeout: u64,

    /// Session wait/interactive timeout (seconds) set on each new connection
    #[arg(long, env = "DB_SESSION_TIMEOUT", default_value_t = DEFAULT_SESSION_TIMEOUT_SECS)]
    pub db_session_timeout: u64,

    /// Query execution timeout in seconds
    #[arg(long, env = "QUERY_TIMEOUT", default_value_t = DEFAULT_QUERY_TIMEOUT_SECS)]
    pub query_timeout: u64,

    /// Keep-alive probe interval in seconds
    #[arg(long, env = "KEEPALIVE_INTERVAL", default_value_t = DEFAULT_KEEPALIVE_INTERVAL_SECS)]
    pub keepalive_interval: u64,

    /// Extra SQLSTATEs to treat as dead-connection failures, comma separated
    #[arg(
        long = "transient-sql-state",
        value_name = "SQLSTATE",
        env = "DB_TRANSIENT_SQLSTATES",
        value_delimiter = ','
    )]
    pub transient_sql_states: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Database settings consumed by the pool lifecycle manager.
    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
            max_connections: self.db_max_connections,
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout),
            session_timeout_secs: self.db_session_timeout,
        }
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.port)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the keep-alive probe interval as a Duration.
    pub fn keepalive_interval_duration(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Config {
        Config::parse_from(["certificados-gateway"])
    }

    #[test]
    fn test_default_config() {
        let config = defaults();
        assert_eq!(config.db_host, DEFAULT_DB_HOST);
        assert_eq!(config.db_port, DEFAULT_DB_PORT);
        assert_eq!(config.db_user, DEFAULT_DB_USER);
        assert_eq!(config.db_password, "");
        assert_eq!(config.port, DEFAULT_HTTP_PORT);
        assert_eq!(config.api_key, DEFAULT_API_KEY);
        assert_eq!(config.keepalive_interval, 240);
        assert!(config.transient_sql_states.is_empty());
    }

    #[test]
    fn test_default_allowed_origins() {
        let config = defaults();
        assert_eq!(config.allowed_origins.len(), 3);
        assert_eq!(config.allowed_origins[0], "http://localhost:3000");
    }

    #[test]
    fn test_bind_addr() {
        let config = defaults();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_db_config_mapping() {
        let config = Config::parse_from([
            "certificados-gateway",
            "--db-host",
            "db.internal",
            "--db-port",
            "3307",
            "--db-max-connections",
            "4",
        ]);
        let db = config.db_config();
        assert_eq!(db.host, "db.internal");
        assert_eq!(db.port, 3307);
        assert_eq!(db.max_connections, 4);
        assert_eq!(db.session_timeout_secs, DEFAULT_SESSION_TIMEOUT_SECS);
    }

    #[test]
    fn test_transient_sql_states_delimited() {
        let config = Config::parse_from([
            "certificados-gateway",
            "--transient-sql-state",
            "HY001,S1000",
        ]);
        assert_eq!(config.transient_sql_states, vec!["HY001", "S1000"]);
    }

    #[test]
    fn test_durations() {
        let config = defaults();
        assert_eq!(config.query_timeout_duration(), Duration::from_secs(30));
        assert_eq!(
            config.keepalive_interval_duration(),
            Duration::from_secs(240)
        );
    }
}
