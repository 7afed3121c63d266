// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // Any failure reported by the query executor (connectivity, syntax, pool timeout).
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    #[error("Column '{column}' has unsupported type {type_name}")]
    UnsupportedColumn { column: String, type_name: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(ref what) => {
                tracing::debug!("Not found: {}", what);
                (StatusCode::NOT_FOUND, "Not found")
            }

            // Everything else is a 500. The detail goes to the log, never to the client.
            ref e => {
                tracing::error!("Internal server error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database Server Error")
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_failures_do_not_leak_the_cause() {
        let err = AppError::QueryFailed(sqlx::Error::Protocol("syntax error at 'FROM'".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError::NotFound("SalesOrder 000123".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
