use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Error messages shared between handlers and tests.
pub mod msg {
    pub const UNAUTHORIZED: &str = "Unauthorized";
    pub const LEAD_NOT_FOUND: &str = "Lead not found";
    pub const INVALID_LEAD_ID: &str = "Invalid lead ID";
    pub const LEAD_ID_REQUIRED: &str = "lead_id is required";
    pub const LEAD_NOT_APPROVED: &str = "Lead must be approved first";
    pub const PROPOSAL_ALREADY_SENT: &str = "Proposal already sent";
    pub const NAME_REQUIRED: &str = "Name is required (min 2 chars)";
    pub const VALID_EMAIL_REQUIRED: &str = "Valid email is required";
    pub const TOO_MANY_SUBMISSIONS: &str = "Too many submissions. Please try again later.";
    pub const TOO_MANY_PROPOSALS: &str = "Too many proposal sends. Please try again later.";
    pub const MISSING_SIGNATURE_HEADER: &str = "Missing stripe-signature header";
    pub const MISSING_TIMESTAMP_OR_SIGNATURE: &str = "Missing timestamp or signature in header";
    pub const INVALID_TIMESTAMP: &str = "Invalid timestamp in signature header";
    pub const TIMESTAMP_IN_FUTURE: &str = "Timestamp is in the future";
    pub const SIGNATURE_MISMATCH: &str = "Signature mismatch";
    pub const WEBHOOK_SECRET_NOT_CONFIGURED: &str = "Webhook secret not configured";
    pub const INVALID_JSON: &str = "Invalid JSON";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    TooManyRequests(String),

    /// An upstream send that was the point of the request failed.
    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Operator-only system: internal messages are returned as-is.
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {}", e),
            AppError::Pool(e) => tracing::error!("Pool error: {}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::BadGateway(msg) => tracing::warn!("Upstream failure: {}", msg),
            AppError::Unavailable(msg) => tracing::warn!("{}", msg),
            _ => {}
        }

        let body: ApiResponse<()> = ApiResponse::error(self.to_string());
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
