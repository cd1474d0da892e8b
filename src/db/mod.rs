//! Database access layer.
//!
//! This module provides:
//! - Pool lifecycle management (single active pool, atomic replacement)
//! - Query execution with single-retry connection recovery
//! - Dead-connection classification
//! - The periodic keep-alive probe
//! - Row to JSON conversion

pub mod classify;
pub mod executor;
pub mod keepalive;
pub mod params;
pub mod pool;
pub mod types;

pub use classify::{DEFAULT_TRANSIENT_SQL_STATES, FailureClass, TransientErrorClassifier};
pub use executor::{QueryExecutor, QueryService};
pub use keepalive::KeepAliveProber;
pub use params::QueryParam;
pub use pool::{DbConfig, PoolManager};
pub use types::{RowMap, RowToJson};
