use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::background::spawn_detached;
use crate::db::AppState;
use crate::error::msg;
use crate::notify::{Embed, color};
use crate::payments::{SIGNATURE_HEADER, StripeWebhookEvent, verify_webhook_signature};
use crate::templates::payment_confirmation_email;
use crate::util::format_dollars;

use super::WebhookResponse;
use super::reconcile::{AppliedPayment, ReconcileOutcome, reconcile_event};

/// Check the signature header and decode the event.
fn verify_and_parse(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<StripeWebhookEvent, WebhookResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebhookResponse::error(StatusCode::BAD_REQUEST, msg::MISSING_SIGNATURE_HEADER))?;

    if state.stripe_webhook_secret.is_empty() {
        tracing::error!("STRIPE_WEBHOOK_SECRET not configured, rejecting webhook");
        return Err(WebhookResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            msg::WEBHOOK_SECRET_NOT_CONFIGURED,
        ));
    }

    let verdict = verify_webhook_signature(body, signature, &state.stripe_webhook_secret);
    if !verdict.valid {
        let reason = verdict.reason.unwrap_or_else(|| msg::SIGNATURE_MISMATCH.to_string());
        tracing::warn!(reason = %reason, "Stripe webhook signature verification failed");
        return Err(WebhookResponse::Error(StatusCode::UNAUTHORIZED, reason));
    }

    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Stripe webhook body is not a valid event");
        WebhookResponse::error(StatusCode::BAD_REQUEST, msg::INVALID_JSON)
    })
}

/// Runs the database part of the webhook. Holds the connection only for its own duration.
fn reconcile(state: &AppState, event: &StripeWebhookEvent) -> crate::error::Result<ReconcileOutcome> {
    let mut conn = state.db.get()?;
    reconcile_event(&mut conn, event)
}

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResponse {
    let event = match verify_and_parse(&state, &headers, &body) {
        Ok(event) => event,
        Err(response) => return response,
    };

    match reconcile(&state, &event) {
        Ok(ReconcileOutcome::Duplicate) | Ok(ReconcileOutcome::AlreadyApplied) => {
            WebhookResponse::Duplicate
        }
        Ok(ReconcileOutcome::NotHandled) => WebhookResponse::Handled(false),
        Ok(ReconcileOutcome::Applied(applied)) => {
            spawn_payment_notifications(&state, *applied);
            WebhookResponse::Handled(true)
        }
        Err(e) => {
            // Ledger row stays unprocessed, so the provider's retry resumes the work
            tracing::error!(event_id = %event.id, error = %e, "Stripe webhook processing failed");
            WebhookResponse::Error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Confirmation email and chat message for a committed payment.
fn spawn_payment_notifications(state: &AppState, applied: AppliedPayment) {
    let state = state.clone();
    spawn_detached("payment_notifications", async move {
        let AppliedPayment {
            event_id,
            lead,
            link,
            transition,
        } = applied;

        let is_deposit = !link.link_type.is_complete();
        let message = payment_confirmation_email(&lead.business_name, is_deposit, &state.brand_name);
        if let Err(e) = state.email.send(&lead.email, &message).await {
            tracing::warn!(lead_id = lead.id, error = %e, "Payment confirmation email failed");
        }

        let embed = Embed::new("\u{1F4B0} Payment Received", color::SUCCESS)
            .inline_field("Lead", lead.business_name.as_str())
            .inline_field("Tier", link.tier.as_str())
            .inline_field("Amount", format_dollars(link.price_cents))
            .inline_field("Type", link.link_type.as_ref())
            .inline_field("Status", transition.payment_status.as_ref())
            .inline_field("Stage", transition.stage.as_ref())
            .footer(format!("Lead #{} | {}", lead.id, event_id));
        state.chat.send(embed).await;
    });
}
