//! Payment reconciliation: turn a verified provider event into at most one
//! lead mutation.
//!
//! The event id is recorded in the ledger first. Duplicate deliveries stop
//! there. For checkout completions, the payment row, the lead update and the
//! ledger's `processed` flag are written in a single IMMEDIATE transaction;
//! `payments.stripe_event_id` is UNIQUE, so a replay that slips past the
//! ledger (an unfinished earlier attempt) still applies the money once.

use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;

use crate::activity::log_activity;
use crate::db::queries;
use crate::error::Result;
use crate::models::{
    ActivityAction, CreatePayment, Lead, LedgerEntry, PaymentLink, PaymentStatus, Stage,
};
use crate::payments::{CHECKOUT_SESSION_COMPLETED, StripeCheckoutSession, StripeWebhookEvent};
use crate::util::format_dollars;

/// New payment fields for a lead after one payment through `link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentTransition {
    pub payment_status: PaymentStatus,
    pub stage: Stage,
    /// Cumulative, including this payment.
    pub amount_cents: i64,
    /// Set when the payment settles the engagement.
    pub closed_at: Option<i64>,
}

impl PaymentTransition {
    pub fn resolve(lead: &Lead, link: &PaymentLink, now: i64) -> Self {
        let amount_cents = lead.payment_amount_cents + link.price_cents;
        if link.link_type.is_complete() {
            PaymentTransition {
                payment_status: PaymentStatus::FullyPaid,
                stage: Stage::ClosedWon,
                amount_cents,
                closed_at: Some(now),
            }
        } else {
            PaymentTransition {
                payment_status: PaymentStatus::DepositPaid,
                stage: Stage::Contracted,
                amount_cents,
                closed_at: None,
            }
        }
    }
}

/// A payment that was just committed. Carried out of the transaction for notifications.
#[derive(Debug, Clone)]
pub struct AppliedPayment {
    pub event_id: String,
    pub lead: Lead,
    pub link: PaymentLink,
    pub transition: PaymentTransition,
}

#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// Ledger says this event was already processed.
    Duplicate,
    /// Recorded and acknowledged without touching any lead.
    NotHandled,
    /// The payment row already existed; nothing changed.
    AlreadyApplied,
    Applied(Box<AppliedPayment>),
}

/// Record `event` in the ledger and apply it if it is a matching checkout.
pub fn reconcile_event(conn: &mut Connection, event: &StripeWebhookEvent) -> Result<ReconcileOutcome> {
    match queries::record_webhook_event(conn, &event.id, &event.event_type)? {
        LedgerEntry::Duplicate => {
            tracing::info!(event_id = %event.id, "Duplicate webhook delivery");
            return Ok(ReconcileOutcome::Duplicate);
        }
        LedgerEntry::Unfinished => {
            tracing::warn!(event_id = %event.id, "Resuming unfinished webhook event");
        }
        LedgerEntry::New => {}
    }

    if event.event_type != CHECKOUT_SESSION_COMPLETED {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring webhook event type");
        queries::mark_webhook_event_processed(conn, &event.id)?;
        return Ok(ReconcileOutcome::NotHandled);
    }

    // Non-object payloads are treated like sessions with no usable fields
    let session: StripeCheckoutSession =
        serde_json::from_value(event.data.object.clone()).unwrap_or_default();
    let payment_link_id = session.payment_link();
    let email = session.email();

    let (Some(payment_link_id), Some(email)) = (payment_link_id, email.as_deref()) else {
        log_activity(
            conn,
            ActivityAction::WebhookNoMatch,
            "Missing payment_link or email",
            Some(json!({
                "event_id": event.id,
                "payment_link": payment_link_id,
                "email": email,
            })),
        );
        queries::mark_webhook_event_processed(conn, &event.id)?;
        return Ok(ReconcileOutcome::NotHandled);
    };

    let Some(link) = queries::get_active_payment_link_by_stripe_id(conn, payment_link_id)? else {
        tracing::info!(event_id = %event.id, payment_link = %payment_link_id, "Payment link is not ours or inactive");
        queries::mark_webhook_event_processed(conn, &event.id)?;
        return Ok(ReconcileOutcome::NotHandled);
    };

    let outcome = apply_checkout(conn, &event.id, &link, email)?;

    if let ReconcileOutcome::Applied(applied) = &outcome {
        log_activity(
            conn,
            ActivityAction::PaymentReceived,
            &format!(
                "{}: {} ({}/{})",
                applied.lead.business_name,
                format_dollars(link.price_cents),
                link.tier,
                link.link_type.as_ref()
            ),
            Some(json!({
                "lead_id": applied.lead.id,
                "tier": link.tier,
                "link_type": link.link_type,
                "amount_cents": link.price_cents,
                "charged_cents": session.amount_total,
                "total_paid_cents": applied.transition.amount_cents,
                "payment_status": applied.transition.payment_status,
            })),
        );
    }

    Ok(outcome)
}

/// Find the paying lead and apply the transition in one transaction.
fn apply_checkout(
    conn: &mut Connection,
    event_id: &str,
    link: &PaymentLink,
    email: &str,
) -> Result<ReconcileOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(lead) = queries::get_latest_lead_by_email(&tx, email)? else {
        log_activity(
            &tx,
            ActivityAction::WebhookLeadNotFound,
            &format!("Payment from {} but no matching lead", email),
            Some(json!({
                "event_id": event_id,
                "tier": link.tier,
                "link_type": link.link_type,
            })),
        );
        queries::mark_webhook_event_processed(&tx, event_id)?;
        tx.commit()?;
        return Ok(ReconcileOutcome::NotHandled);
    };

    let transition = PaymentTransition::resolve(&lead, link, queries::now());

    let inserted = queries::try_create_payment(
        &tx,
        &CreatePayment {
            lead_id: lead.id,
            stripe_event_id: event_id,
            payment_link_id: link.id,
            tier: &link.tier,
            link_type: link.link_type,
            amount_cents: link.price_cents,
            customer_email: email,
        },
    )?;
    if !inserted {
        tracing::info!(event_id = %event_id, lead_id = lead.id, "Payment already applied for event");
        queries::mark_webhook_event_processed(&tx, event_id)?;
        tx.commit()?;
        return Ok(ReconcileOutcome::AlreadyApplied);
    }

    queries::apply_lead_payment(
        &tx,
        lead.id,
        transition.payment_status,
        transition.stage,
        transition.amount_cents,
        transition.closed_at,
    )?;
    queries::mark_webhook_event_processed(&tx, event_id)?;
    tx.commit()?;

    tracing::info!(
        event_id = %event_id,
        lead_id = lead.id,
        tier = %link.tier,
        link_type = link.link_type.as_ref(),
        amount_cents = link.price_cents,
        total_paid_cents = transition.amount_cents,
        payment_status = transition.payment_status.as_ref(),
        "Payment applied"
    );

    Ok(ReconcileOutcome::Applied(Box::new(AppliedPayment {
        event_id: event_id.to_string(),
        lead,
        link: link.clone(),
        transition,
    })))
}
