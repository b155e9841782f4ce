//! Maps [`OmsError`] onto HTTP responses carrying an [`ApiError`] body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use oms_domain::OmsError;

use crate::api_types::ApiError;

#[derive(Debug)]
pub struct ApiFailure {
    pub error: OmsError,
    pub path: String,
}

impl ApiFailure {
    pub fn new(error: OmsError, path: impl Into<String>) -> Self {
        Self {
            error,
            path: path.into(),
        }
    }

    /// `map_err` adapter bound to the request path.
    pub fn at(path: &str) -> impl Fn(OmsError) -> ApiFailure + '_ {
        move |error| ApiFailure::new(error, path)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(path = %self.path, error = %self.error, "request failed");
        } else {
            tracing::debug!(path = %self.path, status = status.as_u16(), error = %self.error, "request rejected");
        }
        let body = ApiError {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: self.error.message().to_string(),
            path: self.path,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_phrase_follows_status() {
        let f = ApiFailure::new(OmsError::NotCancellable("x".into()), "/p");
        assert_eq!(f.status(), StatusCode::CONFLICT);
        assert_eq!(f.status().canonical_reason(), Some("Conflict"));

        let f = ApiFailure::new(OmsError::InsufficientFunds("x".into()), "/p");
        assert_eq!(f.status(), StatusCode::BAD_REQUEST);
    }
}
