mod follow_up;
mod leads;
mod proposals;

pub use follow_up::*;
pub use leads::*;
pub use proposals::*;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::db::AppState;
use crate::middleware::operator_auth;

/// Operator endpoints, all behind the bearer-secret check.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/leads", get(list_leads))
        .route("/leads/{id}", patch(review_lead))
        .route("/proposals/send", post(send_proposal_handler))
        .route("/follow-up", post(run_follow_up))
        .layer(middleware::from_fn_with_state(state, operator_auth))
}
