mod contact;
mod health;

pub use contact::*;
pub use health::*;

use axum::{
    Router,
    routing::{get, post},
};

use crate::config::RateLimitConfig;
use crate::db::AppState;
use crate::rate_limit;

/// Public endpoints. The contact form gets a per-IP limit when `contact_rpm > 0`.
pub fn router(limits: RateLimitConfig) -> Router<AppState> {
    let contact = Router::new().route("/contact", post(submit_contact));
    let contact = if limits.contact_rpm > 0 {
        contact.layer(rate_limit::contact_layer(limits.contact_rpm))
    } else {
        contact
    };

    Router::new().route("/health", get(health)).merge(contact)
}
