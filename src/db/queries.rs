use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, ToSql, params, types::Value};

use crate::error::Result;
use crate::models::*;

use super::from_row::{
    ACTIVITY_COLS, CONTACT_COLS, FOLLOW_UP_COLS, FromRow, LEAD_COLS, PAYMENT_COLS,
    PAYMENT_LINK_COLS, PROPOSAL_COLS, WEBHOOK_EVENT_COLS, query_all, query_one,
};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: i64,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: i64) -> Self {
        Self {
            table,
            id,
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    /// Set a column to an explicit value (including NULL).
    fn set_nullable<V: Into<Value>>(mut self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.fields.push((column, v.into())),
            None => self.fields.push((column, Value::Null)),
        }
        self
    }

    fn into_sql(mut self) -> Option<(String, Vec<Value>)> {
        if self.fields.is_empty() {
            return None;
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        Some((sql, values))
    }

    fn execute(self, conn: &Connection) -> Result<bool> {
        let Some((sql, values)) = self.into_sql() else {
            return Ok(false);
        };
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }

    /// Execute the update and return the updated row using RETURNING.
    /// Returns None if no row matched.
    fn execute_returning<T: FromRow>(self, conn: &Connection, returning_cols: &str) -> Result<Option<T>> {
        let Some((sql, values)) = self.into_sql() else {
            return Ok(None);
        };
        let sql = format!("{} RETURNING {}", sql, returning_cols);
        conn.query_row(&sql, rusqlite::params_from_iter(values), T::from_row)
            .optional()
            .map_err(Into::into)
    }
}

// ============ Contacts ============

pub fn create_contact(
    conn: &Connection,
    name: &str,
    email: &str,
    message: Option<&str>,
) -> Result<Contact> {
    let now = now();
    conn.execute(
        "INSERT INTO contacts (name, email, message, source, created_at)
         VALUES (?1, ?2, ?3, 'website', ?4)",
        params![name, email, message, now],
    )?;
    Ok(Contact {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        email: email.to_string(),
        message: message.map(String::from),
        source: "website".to_string(),
        created_at: now,
    })
}

pub fn list_contacts(conn: &Connection, limit: i64) -> Result<Vec<Contact>> {
    query_all(
        conn,
        &format!("SELECT {} FROM contacts ORDER BY id DESC LIMIT ?1", CONTACT_COLS),
        &[&limit],
    )
}

// ============ Leads ============

pub fn create_lead(conn: &Connection, input: &CreateLead) -> Result<Lead> {
    let now = now();
    conn.execute(
        "INSERT INTO leads (business_name, email, category, message, score, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            input.business_name,
            input.email,
            input.category,
            input.message,
            input.score,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_lead_by_id(conn, id)?.ok_or_else(|| {
        crate::error::AppError::Internal(format!("lead {} vanished after insert", id))
    })
}

pub fn get_lead_by_id(conn: &Connection, id: i64) -> Result<Option<Lead>> {
    query_one(
        conn,
        &format!("SELECT {} FROM leads WHERE id = ?1", LEAD_COLS),
        &[&id],
    )
}

/// Newest lead for `email` created at or after `since`. Used for contact dedup.
pub fn find_recent_lead_by_email(conn: &Connection, email: &str, since: i64) -> Result<Option<Lead>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM leads WHERE email = ?1 COLLATE NOCASE AND created_at >= ?2
             ORDER BY created_at DESC, id DESC LIMIT 1",
            LEAD_COLS
        ),
        &[&email, &since],
    )
}

/// Most recently created lead for `email`, compared case-insensitively.
pub fn get_latest_lead_by_email(conn: &Connection, email: &str) -> Result<Option<Lead>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM leads WHERE email = ?1 COLLATE NOCASE
             ORDER BY created_at DESC, id DESC LIMIT 1",
            LEAD_COLS
        ),
        &[&email],
    )
}

pub fn update_lead_message(conn: &Connection, id: i64, message: Option<&str>) -> Result<bool> {
    UpdateBuilder::new("leads", id)
        .with_updated_at()
        .set_nullable("message", message.map(String::from))
        .execute(conn)
}

/// List leads newest first, optionally filtered by stage and review status.
pub fn list_leads(conn: &Connection, filter: &LeadFilter, limit: i64) -> Result<Vec<Lead>> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut values: Vec<&dyn ToSql> = Vec::new();

    if let Some(stage) = filter.stage.as_ref().filter(|s| !s.is_empty()) {
        conditions.push("stage = ?");
        values.push(stage);
    }
    if let Some(status) = filter.review_status.as_ref().filter(|s| !s.is_empty()) {
        conditions.push("review_status = ?");
        values.push(status);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    values.push(&limit);

    query_all(
        conn,
        &format!(
            "SELECT {} FROM leads{} ORDER BY created_at DESC, id DESC LIMIT ?",
            LEAD_COLS, where_clause
        ),
        &values,
    )
}

/// Record an operator review decision. Returns the updated lead, or None if missing.
pub fn update_lead_review(
    conn: &Connection,
    id: i64,
    status: ReviewStatus,
    notes: Option<&str>,
) -> Result<Option<Lead>> {
    UpdateBuilder::new("leads", id)
        .with_updated_at()
        .set("review_status", status.as_ref().to_string())
        .set_nullable("review_notes", notes.map(String::from))
        .set("reviewed_at", now())
        .execute_returning(conn, LEAD_COLS)
}

pub fn set_lead_send_error(conn: &Connection, id: i64, error: &str) -> Result<bool> {
    UpdateBuilder::new("leads", id)
        .with_updated_at()
        .set("send_error", error.to_string())
        .execute(conn)
}

/// Stamp a successful proposal send and move the lead into the payment flow.
pub fn mark_proposal_sent(conn: &Connection, id: i64, message_id: Option<&str>) -> Result<bool> {
    UpdateBuilder::new("leads", id)
        .with_updated_at()
        .set("proposal_sent_at", now())
        .set_nullable("proposal_message_id", message_id.map(String::from))
        .set("payment_status", PaymentStatus::Pending.as_ref().to_string())
        .set("stage", Stage::Contacted.as_ref().to_string())
        .set_nullable::<String>("send_error", None)
        .execute(conn)
}

/// Leads whose proposal went out before `sent_before`, still awaiting payment,
/// never nudged and not closed. Oldest proposal first.
pub fn list_follow_up_candidates(conn: &Connection, sent_before: i64, limit: i64) -> Result<Vec<Lead>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM leads
             WHERE proposal_sent_at IS NOT NULL
               AND proposal_sent_at < ?1
               AND payment_status = 'pending'
               AND follow_up_sent_at IS NULL
               AND stage NOT IN ('closed_won', 'closed_lost')
             ORDER BY proposal_sent_at ASC
             LIMIT ?2",
            LEAD_COLS
        ),
        &[&sent_before, &limit],
    )
}

pub fn mark_follow_up_sent(conn: &Connection, id: i64, message_id: Option<&str>) -> Result<bool> {
    UpdateBuilder::new("leads", id)
        .with_updated_at()
        .set("follow_up_sent_at", now())
        .set_nullable("follow_up_message_id", message_id.map(String::from))
        .execute(conn)
}

pub fn count_leads(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))
        .map_err(Into::into)
}

/// Write the payment fields of a lead. Only the reconciliation step calls this.
pub fn apply_lead_payment(
    conn: &Connection,
    id: i64,
    payment_status: PaymentStatus,
    stage: Stage,
    payment_amount_cents: i64,
    closed_at: Option<i64>,
) -> Result<bool> {
    let mut builder = UpdateBuilder::new("leads", id)
        .with_updated_at()
        .set("payment_status", payment_status.as_ref().to_string())
        .set("stage", stage.as_ref().to_string())
        .set("payment_amount_cents", payment_amount_cents);
    if let Some(closed_at) = closed_at {
        builder = builder.set("closed_at", closed_at);
    }
    builder.execute(conn)
}

// ============ Payment links ============

pub fn create_payment_link(conn: &Connection, input: &CreatePaymentLink) -> Result<PaymentLink> {
    let now = now();
    conn.execute(
        "INSERT INTO payment_links
            (tier, link_type, stripe_product_id, stripe_price_id, stripe_link_id, stripe_url, price_cents, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
        params![
            input.tier,
            input.link_type.as_ref(),
            input.stripe_product_id,
            input.stripe_price_id,
            input.stripe_link_id,
            input.stripe_url,
            input.price_cents,
            now
        ],
    )?;
    Ok(PaymentLink {
        id: conn.last_insert_rowid(),
        tier: input.tier.clone(),
        link_type: input.link_type,
        stripe_product_id: input.stripe_product_id.clone(),
        stripe_price_id: input.stripe_price_id.clone(),
        stripe_link_id: input.stripe_link_id.clone(),
        stripe_url: input.stripe_url.clone(),
        price_cents: input.price_cents,
        active: true,
        created_at: now,
    })
}

pub fn deactivate_payment_link(conn: &Connection, id: i64) -> Result<bool> {
    UpdateBuilder::new("payment_links", id)
        .set("active", 0)
        .execute(conn)
}

pub fn get_active_payment_link_by_stripe_id(
    conn: &Connection,
    stripe_link_id: &str,
) -> Result<Option<PaymentLink>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payment_links WHERE stripe_link_id = ?1 AND active = 1",
            PAYMENT_LINK_COLS
        ),
        &[&stripe_link_id],
    )
}

pub fn get_active_payment_link(
    conn: &Connection,
    tier: &str,
    link_type: LinkType,
) -> Result<Option<PaymentLink>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payment_links WHERE tier = ?1 AND link_type = ?2 AND active = 1",
            PAYMENT_LINK_COLS
        ),
        &[&tier, &link_type.as_ref()],
    )
}

pub fn list_payment_links(conn: &Connection) -> Result<Vec<PaymentLink>> {
    query_all(
        conn,
        &format!("SELECT {} FROM payment_links ORDER BY tier, link_type", PAYMENT_LINK_COLS),
        &[],
    )
}

// ============ Payments ============

/// Insert a payment unless one already exists for the event.
/// Returns false when the event was already applied.
pub fn try_create_payment(conn: &Connection, input: &CreatePayment) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO payments
            (lead_id, stripe_event_id, payment_link_id, tier, link_type, amount_cents, customer_email, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(stripe_event_id) DO NOTHING",
        params![
            input.lead_id,
            input.stripe_event_id,
            input.payment_link_id,
            input.tier,
            input.link_type.as_ref(),
            input.amount_cents,
            input.customer_email,
            now()
        ],
    )?;
    Ok(inserted > 0)
}

pub fn list_payments_for_lead(conn: &Connection, lead_id: i64) -> Result<Vec<Payment>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM payments WHERE lead_id = ?1 ORDER BY id",
            PAYMENT_COLS
        ),
        &[&lead_id],
    )
}

pub fn count_payments(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))
        .map_err(Into::into)
}

// ============ Webhook events ============

/// Record a delivery in the ledger and classify it.
pub fn record_webhook_event(conn: &Connection, event_id: &str, event_type: &str) -> Result<LedgerEntry> {
    let inserted = conn.execute(
        "INSERT INTO webhook_events (stripe_event_id, event_type, processed, created_at)
         VALUES (?1, ?2, 0, ?3)
         ON CONFLICT(stripe_event_id) DO NOTHING",
        params![event_id, event_type, now()],
    )?;
    if inserted > 0 {
        return Ok(LedgerEntry::New);
    }

    let processed: bool = conn.query_row(
        "SELECT processed FROM webhook_events WHERE stripe_event_id = ?1",
        params![event_id],
        |row| Ok(row.get::<_, i32>(0)? != 0),
    )?;
    Ok(if processed {
        LedgerEntry::Duplicate
    } else {
        LedgerEntry::Unfinished
    })
}

pub fn mark_webhook_event_processed(conn: &Connection, event_id: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE webhook_events SET processed = 1 WHERE stripe_event_id = ?1",
        params![event_id],
    )?;
    Ok(updated > 0)
}

pub fn get_webhook_event(conn: &Connection, event_id: &str) -> Result<Option<WebhookEventRecord>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM webhook_events WHERE stripe_event_id = ?1",
            WEBHOOK_EVENT_COLS
        ),
        &[&event_id],
    )
}

pub fn count_webhook_events(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM webhook_events", [], |row| row.get(0))
        .map_err(Into::into)
}

// ============ Proposals and follow-ups ============

pub fn create_proposal(
    conn: &Connection,
    lead_id: i64,
    tier: &str,
    payment_url: &str,
    message_id: Option<&str>,
) -> Result<Proposal> {
    let now = now();
    conn.execute(
        "INSERT INTO proposals (lead_id, tier, payment_url, message_id, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![lead_id, tier, payment_url, message_id, now],
    )?;
    Ok(Proposal {
        id: conn.last_insert_rowid(),
        lead_id,
        tier: tier.to_string(),
        payment_url: payment_url.to_string(),
        message_id: message_id.map(String::from),
        sent_at: now,
    })
}

pub fn list_proposals_for_lead(conn: &Connection, lead_id: i64) -> Result<Vec<Proposal>> {
    query_all(
        conn,
        &format!("SELECT {} FROM proposals WHERE lead_id = ?1 ORDER BY id", PROPOSAL_COLS),
        &[&lead_id],
    )
}

pub fn create_follow_up(conn: &Connection, lead_id: i64, message_id: Option<&str>) -> Result<FollowUp> {
    let now = now();
    conn.execute(
        "INSERT INTO follow_ups (lead_id, message_id, sent_at) VALUES (?1, ?2, ?3)",
        params![lead_id, message_id, now],
    )?;
    Ok(FollowUp {
        id: conn.last_insert_rowid(),
        lead_id,
        message_id: message_id.map(String::from),
        sent_at: now,
    })
}

pub fn list_follow_ups_for_lead(conn: &Connection, lead_id: i64) -> Result<Vec<FollowUp>> {
    query_all(
        conn,
        &format!("SELECT {} FROM follow_ups WHERE lead_id = ?1 ORDER BY id", FOLLOW_UP_COLS),
        &[&lead_id],
    )
}

// ============ Activity log ============

pub fn create_activity(
    conn: &Connection,
    action: &str,
    details: &str,
    metadata: Option<&serde_json::Value>,
) -> Result<i64> {
    let metadata = metadata.map(serde_json::to_string).transpose()?;
    conn.execute(
        "INSERT INTO activity_log (action, details, metadata, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![action, details, metadata, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Newest entries first, optionally filtered to one action.
pub fn list_activity(conn: &Connection, action: Option<&str>, limit: i64) -> Result<Vec<ActivityLog>> {
    match action {
        Some(action) => query_all(
            conn,
            &format!(
                "SELECT {} FROM activity_log WHERE action = ?1 ORDER BY id DESC LIMIT ?2",
                ACTIVITY_COLS
            ),
            &[&action, &limit],
        ),
        None => query_all(
            conn,
            &format!("SELECT {} FROM activity_log ORDER BY id DESC LIMIT ?1", ACTIVITY_COLS),
            &[&limit],
        ),
    }
}
