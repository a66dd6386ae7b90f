//! Error Conversion
//!
//! `IntoResponse` for [`ApiError`] so handlers can return it directly.
//! Responses are JSON: `{"error": <message>, "status": <code>}`.

use crate::backend::error::types::ApiError;
use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("[Error] {} -> {}", message, status);
        } else {
            tracing::debug!("[Error] {} -> {}", message, status);
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap_or_else(|_| {
                format!(r#"{{"error":"{}","status":{}}}"#, message, status.as_u16())
            })))
            .unwrap_or_else(|_| {
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Body::from("Internal Server Error"))
                    .unwrap()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::TripError;

    #[test]
    fn response_carries_status_from_error() {
        let err: ApiError = TripError::CapacityExceeded { capacity: 4 }.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn response_is_json() {
        let err: ApiError = TripError::denied("t1", "mallory").into();
        let response = err.into_response();
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }
}
