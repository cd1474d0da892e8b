//! Certificados gateway library.
//!
//! A read-only HTTP gateway that serves precomputed certificate records from
//! MySQL, with a self-healing connection pool: dead connections are detected,
//! the pool is replaced, and the failing query is retried exactly once.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;

pub use config::Config;
pub use error::{DbError, DbResult};
