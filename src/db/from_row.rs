//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! Models implement `FromRow` to define how they are built from a row
//! selected with the matching `*_COLS` constant.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
///
/// Bad enum text in the database surfaces as a query error instead of a panic.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const LEAD_COLS: &str = "id, business_name, email, category, message, score, stage, review_status, review_notes, reviewed_at, proposal_sent_at, proposal_message_id, payment_status, payment_amount_cents, follow_up_sent_at, follow_up_message_id, closed_at, send_error, created_at, updated_at";

pub const CONTACT_COLS: &str = "id, name, email, message, source, created_at";

pub const PAYMENT_LINK_COLS: &str = "id, tier, link_type, stripe_product_id, stripe_price_id, stripe_link_id, stripe_url, price_cents, active, created_at";

pub const PAYMENT_COLS: &str = "id, lead_id, stripe_event_id, payment_link_id, tier, link_type, amount_cents, customer_email, created_at";

pub const WEBHOOK_EVENT_COLS: &str = "id, stripe_event_id, event_type, processed, created_at";

pub const PROPOSAL_COLS: &str = "id, lead_id, tier, payment_url, message_id, sent_at";

pub const FOLLOW_UP_COLS: &str = "id, lead_id, message_id, sent_at";

pub const ACTIVITY_COLS: &str = "id, action, details, metadata, created_at";

// ============ FromRow Implementations ============

impl FromRow for Lead {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Lead {
            id: row.get(0)?,
            business_name: row.get(1)?,
            email: row.get(2)?,
            category: row.get(3)?,
            message: row.get(4)?,
            score: row.get(5)?,
            stage: parse_enum(row, 6, "stage")?,
            review_status: parse_enum(row, 7, "review_status")?,
            review_notes: row.get(8)?,
            reviewed_at: row.get(9)?,
            proposal_sent_at: row.get(10)?,
            proposal_message_id: row.get(11)?,
            payment_status: parse_enum(row, 12, "payment_status")?,
            payment_amount_cents: row.get(13)?,
            follow_up_sent_at: row.get(14)?,
            follow_up_message_id: row.get(15)?,
            closed_at: row.get(16)?,
            send_error: row.get(17)?,
            created_at: row.get(18)?,
            updated_at: row.get(19)?,
        })
    }
}

impl FromRow for Contact {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Contact {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            message: row.get(3)?,
            source: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for PaymentLink {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PaymentLink {
            id: row.get(0)?,
            tier: row.get(1)?,
            link_type: parse_enum(row, 2, "link_type")?,
            stripe_product_id: row.get(3)?,
            stripe_price_id: row.get(4)?,
            stripe_link_id: row.get(5)?,
            stripe_url: row.get(6)?,
            price_cents: row.get(7)?,
            active: row.get::<_, i32>(8)? != 0,
            created_at: row.get(9)?,
        })
    }
}

impl FromRow for Payment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Payment {
            id: row.get(0)?,
            lead_id: row.get(1)?,
            stripe_event_id: row.get(2)?,
            payment_link_id: row.get(3)?,
            tier: row.get(4)?,
            link_type: parse_enum(row, 5, "link_type")?,
            amount_cents: row.get(6)?,
            customer_email: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl FromRow for WebhookEventRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(WebhookEventRecord {
            id: row.get(0)?,
            stripe_event_id: row.get(1)?,
            event_type: row.get(2)?,
            processed: row.get::<_, i32>(3)? != 0,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for Proposal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Proposal {
            id: row.get(0)?,
            lead_id: row.get(1)?,
            tier: row.get(2)?,
            payment_url: row.get(3)?,
            message_id: row.get(4)?,
            sent_at: row.get(5)?,
        })
    }
}

impl FromRow for FollowUp {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(FollowUp {
            id: row.get(0)?,
            lead_id: row.get(1)?,
            message_id: row.get(2)?,
            sent_at: row.get(3)?,
        })
    }
}

impl FromRow for ActivityLog {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // Unparseable metadata is dropped rather than failing the whole listing
        let metadata: Option<String> = row.get(3)?;
        Ok(ActivityLog {
            id: row.get(0)?,
            action: row.get(1)?,
            details: row.get(2)?,
            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            created_at: row.get(4)?,
        })
    }
}
