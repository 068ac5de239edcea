//! Best-effort audit trail of domain events.

use rusqlite::Connection;
use serde_json::Value;

use crate::db::queries;
use crate::models::ActivityAction;

/// Append an entry to the activity log. A failed write is logged and swallowed.
pub fn log_activity(conn: &Connection, action: ActivityAction, details: &str, metadata: Option<Value>) {
    if let Err(e) = queries::create_activity(conn, action.as_ref(), details, metadata.as_ref()) {
        tracing::warn!(action = action.as_ref(), error = %e, "Failed to write activity log");
    }
}
