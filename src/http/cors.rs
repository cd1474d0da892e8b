//! Origin allow-listing.
//!
//! Two pieces cooperate: an origin gate that rejects requests from origins
//! outside the allow-list before they reach any handler, and a tower-http
//! `CorsLayer` that answers preflights and stamps the CORS response headers
//! for the origins that pass the gate. Requests without an `Origin` header
//! (curl, server-to-server) bypass both.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::warn;

/// The fixed set of origins allowed to call the gateway from a browser.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(origins: Vec<String>) -> Self {
        Self { origins }
    }

    /// Whether a request-supplied Origin header value is on the allow-list.
    pub fn is_allowed(&self, origin: &HeaderValue) -> bool {
        self.origins
            .iter()
            .any(|allowed| allowed.as_bytes() == origin.as_bytes())
    }

    pub fn origin_count(&self) -> usize {
        self.origins.len()
    }

    /// Build the CORS layer for allowed origins: GET only, content-type and
    /// x-api-key request headers, credentials permitted.
    pub fn layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET])
            .allow_headers([
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-api-key"),
            ])
            .allow_credentials(true)
    }
}

/// Gate middleware: a request carrying a disallowed Origin never reaches a
/// handler. Absent Origin is always allowed.
pub async fn enforce_origin(
    State(policy): State<CorsPolicy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !policy.is_allowed(origin) {
            warn!(origin = ?origin, "Blocked request from disallowed origin");
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "No permitido por CORS" })),
            )
                .into_response();
        }
    }
    next.run(request).await
}
