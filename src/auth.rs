//! API-key authentication middleware.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::http::server::AppState;

const API_KEY_HEADER: &str = "x-api-key";

/// Reject any request whose `x-api-key` header does not exactly match the
/// configured secret. Applied to every route except the health check.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if verify_key(key, &state.api_key) => next.run(request).await,
        Some(key) => {
            warn!(key_prefix = %mask_key(key), "Rejected request: invalid API key");
            forbidden_response()
        }
        None => {
            warn!("Rejected request: missing x-api-key header");
            forbidden_response()
        }
    }
}

fn verify_key(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        return false;
    }
    provided.ct_eq(expected).into()
}

fn mask_key(key: &str) -> String {
    if key.len() <= 3 {
        "***".to_string()
    } else {
        format!("{}***", &key[..3])
    }
}

fn forbidden_response() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Acceso no autorizado" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_key_exact_match() {
        assert!(verify_key("supersecreto", "supersecreto"));
    }

    #[test]
    fn test_verify_key_rejects_mismatch() {
        assert!(!verify_key("supersecret0", "supersecreto"));
        assert!(!verify_key("", "supersecreto"));
    }

    #[test]
    fn test_verify_key_rejects_prefix() {
        assert!(!verify_key("supersecret", "supersecreto"));
        assert!(!verify_key("supersecretox", "supersecreto"));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("supersecreto"), "sup***");
        assert_eq!(mask_key("ab"), "***");
    }
}
