//! Maps the `Error` taxonomy to HTTP status codes per the documented table:
//! Auth->401, BadRequest->400, NotFound->404, Transient->503,
//! Invariant/Database/Configuration/Io/Sql/Other->500, Capacity->503,
//! Serialization->400, Reqwest->502.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::Error;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Serialization(_) => StatusCode::BAD_REQUEST,
            Error::Reqwest(_) => StatusCode::BAD_GATEWAY,
            Error::Invariant(_) | Error::Database(_) | Error::Configuration(_) | Error::Io(_) | Error::Sql(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "internal error, try again later".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
