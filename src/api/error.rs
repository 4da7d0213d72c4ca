use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::ShopError;

impl ShopError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::Validation(fields) => json!(fields),
            Self::Store(e) => {
                tracing::error!(error = ?e, "store failure");
                json!({"detail": "internal server error"})
            }
            other => json!({"detail": other.to_string()}),
        };
        (self.status(), Json(body)).into_response()
    }
}
