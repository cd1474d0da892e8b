//! HTTP surface: router, handlers, origin allow-listing.

pub mod cors;
pub mod handlers;
pub mod server;

pub use cors::CorsPolicy;
pub use server::{AppState, HttpServer, build_router};
