pub mod operators;
pub mod public;
pub mod webhooks;

use axum::Router;

use crate::config::RateLimitConfig;
use crate::db::AppState;

/// Every route the service exposes, without outer layers or state.
pub fn router(state: AppState, limits: RateLimitConfig) -> Router<AppState> {
    Router::new()
        .merge(public::router(limits))
        .merge(webhooks::router())
        .merge(operators::router(state))
}
