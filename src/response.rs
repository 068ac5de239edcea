//! JSON envelope shared by every operator and public API response.
//!
//! Success: `{"success": true, "data": <T>, "error": null}`
//! Failure: `{"success": false, "data": null, "error": "<message>"}`
//!
//! The payment webhook does not use this envelope; its caller is the payment
//! provider, not our own client.

use axum::Json;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Wrap `data` in a success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(data))
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>>;
