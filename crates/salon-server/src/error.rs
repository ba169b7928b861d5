use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use salon_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Chat service is not running")]
    ServiceUnavailable,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ServerError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
