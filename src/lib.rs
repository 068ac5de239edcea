//! Leadpay - lead intake, operator review, proposals, and payment reconciliation
//!
//! Inbound contacts become leads, operators approve them, approved leads get a
//! proposal email with a payment link, and signed payment webhooks close the loop.

pub mod activity;
pub mod background;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod payments;
pub mod rate_limit;
pub mod response;
pub mod templates;
pub mod util;

use axum::Router;
use tower_http::trace::TraceLayer;

use config::RateLimitConfig;
use db::AppState;

/// The full application with request tracing and state attached.
pub fn app(state: AppState, limits: RateLimitConfig) -> Router {
    handlers::router(state.clone(), limits)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
