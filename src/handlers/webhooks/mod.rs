pub mod reconcile;
pub mod stripe;

pub use stripe::handle_stripe_webhook;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;

use crate::db::AppState;

/// Response to the payment provider. Not wrapped in the API envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookResponse {
    /// Event id already fully processed.
    Duplicate,
    /// Event accepted; `true` if it changed a lead.
    Handled(bool),
    Error(StatusCode, String),
}

impl WebhookResponse {
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        WebhookResponse::Error(status, message.into())
    }
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        match self {
            WebhookResponse::Duplicate => {
                (StatusCode::OK, Json(json!({"received": true, "duplicate": true}))).into_response()
            }
            WebhookResponse::Handled(handled) => {
                (StatusCode::OK, Json(json!({"received": true, "handled": handled}))).into_response()
            }
            WebhookResponse::Error(status, message) => {
                (status, Json(json!({"error": message}))).into_response()
            }
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/payment-webhook", post(handle_stripe_webhook))
}
