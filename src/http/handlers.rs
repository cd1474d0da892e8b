//! Endpoint handlers.
//!
//! Each certificate route maps to one fixed SELECT-all statement; rows are
//! returned verbatim as a JSON array. Database failures become 500 responses
//! carrying the driver-reported code and message.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::error::DbError;
use crate::http::server::AppState;

const QUERY_APS: &str = "SELECT * FROM `certificadosAPS`";
const QUERY_FONE: &str = "SELECT * FROM `certificadosFONE`";
const QUERY_CECAP: &str = "SELECT * FROM `certificadosCECAP`";
const QUERY_PING: &str = "SELECT 1 AS ok";

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    code: Option<String>,
    message: String,
}

/// Liveness check, no auth.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Round-trip to the database for operator debugging.
pub async fn db_ping(State(state): State<AppState>) -> Response {
    match state.queries.fetch(QUERY_PING).await {
        Ok(rows) => Json(json!({ "ok": true, "rows": rows })).into_response(),
        Err(err) => {
            error!(code = ?err.sql_state(), error = %err.message(), "DB ping failed");
            query_error_response("DB_CONN_ERROR", &err)
        }
    }
}

pub async fn certificados_aps(State(state): State<AppState>) -> Response {
    fetch_table(&state, "certificadosAPS", QUERY_APS).await
}

pub async fn certificados_fone(State(state): State<AppState>) -> Response {
    fetch_table(&state, "certificadosFONE", QUERY_FONE).await
}

pub async fn certificados_cecap(State(state): State<AppState>) -> Response {
    fetch_table(&state, "certificadosCECAP", QUERY_CECAP).await
}

async fn fetch_table(state: &AppState, table: &'static str, sql: &'static str) -> Response {
    match state.queries.fetch(sql).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => {
            error!(
                table,
                code = ?err.sql_state(),
                error = %err.message(),
                "Table query failed"
            );
            query_error_response("Error en la consulta", &err)
        }
    }
}

fn query_error_response(label: &'static str, err: &DbError) -> Response {
    let body = ErrorBody {
        error: label,
        code: err.sql_state().map(str::to_owned),
        message: err.message(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
