use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::activity::log_activity;
use crate::background::spawn_detached;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::models::{ActivityAction, Lead, LinkType, PaymentLink, ReviewStatus};
use crate::notify::{Embed, color};
use crate::rate_limit::{PROPOSAL_KEY, PROPOSAL_MAX_SENDS, PROPOSAL_WINDOW};
use crate::response::{ApiResult, ok};
use crate::templates::proposal_email;

#[derive(Debug, Deserialize)]
pub struct SendProposalRequest {
    /// Accepts a number or a numeric string.
    #[serde(default)]
    pub lead_id: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProposalSent {
    pub sent: bool,
    pub lead_id: i64,
    pub tier: String,
    pub message_id: Option<String>,
}

fn parse_lead_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0)
}

/// Load the lead and check it may receive a proposal. Returns the tier and its link.
fn prepare_proposal(state: &AppState, lead_id: i64) -> Result<(Lead, String, PaymentLink)> {
    let conn = state.db.get()?;

    let lead = queries::get_lead_by_id(&conn, lead_id)?
        .ok_or_else(|| AppError::NotFound(msg::LEAD_NOT_FOUND.into()))?;
    if lead.review_status != ReviewStatus::Approved {
        return Err(AppError::BadRequest(msg::LEAD_NOT_APPROVED.into()));
    }
    if lead.proposal_sent_at.is_some() {
        return Err(AppError::BadRequest(msg::PROPOSAL_ALREADY_SENT.into()));
    }

    let tier = lead.tier();
    let link_type = LinkType::for_tier(&tier);
    let link = queries::get_active_payment_link(&conn, &tier, link_type)?.ok_or_else(|| {
        AppError::BadRequest(format!(
            "No payment link found for {}/{}. Run setup first.",
            tier,
            link_type.as_ref()
        ))
    })?;

    Ok((lead, tier, link))
}

/// Email the proposal for an approved lead and move it to `contacted`.
///
/// Shared by the operator endpoint and the approval hook on `PATCH /leads/{id}`.
/// A failed send is stored on the lead as `send_error` and returned as 502.
pub async fn send_proposal(state: &AppState, lead_id: i64) -> Result<ProposalSent> {
    let (lead, tier, link) = prepare_proposal(state, lead_id)?;

    let message = proposal_email(&lead.business_name, &tier, &link.stripe_url, &state.brand_name);
    let message_id = match state.email.send(&lead.email, &message).await {
        Ok(id) => id,
        Err(e) => {
            let error = e.to_string();
            let conn = state.db.get()?;
            queries::set_lead_send_error(&conn, lead.id, &error)?;
            return Err(AppError::BadGateway(format!("Email send failed: {}", error)));
        }
    };

    {
        let conn = state.db.get()?;
        queries::mark_proposal_sent(&conn, lead.id, message_id.as_deref())?;
        queries::create_proposal(&conn, lead.id, &tier, &link.stripe_url, message_id.as_deref())?;
        log_activity(
            &conn,
            ActivityAction::ProposalSent,
            &format!("Proposal sent to {} ({})", lead.business_name, tier),
            Some(json!({
                "lead_id": lead.id,
                "tier": tier,
                "payment_url": link.stripe_url,
            })),
        );
    }

    tracing::info!(lead_id = lead.id, tier = %tier, message_id = ?message_id, "Proposal sent");

    let chat = state.chat.clone();
    let embed = Embed::new("\u{1F4E7} Proposal Sent", color::SUCCESS)
        .inline_field("Lead", lead.business_name.as_str())
        .inline_field("Tier", tier.as_str())
        .inline_field("Email", lead.email.as_str())
        .footer(format!("Lead #{}", lead.id));
    spawn_detached("proposal_chat_notification", async move {
        chat.send(embed).await;
    });

    Ok(ProposalSent {
        sent: true,
        lead_id: lead.id,
        tier,
        message_id,
    })
}

pub async fn send_proposal_handler(
    State(state): State<AppState>,
    Json(req): Json<SendProposalRequest>,
) -> ApiResult<ProposalSent> {
    let lead_id = parse_lead_id(req.lead_id.as_ref())
        .ok_or_else(|| AppError::BadRequest(msg::LEAD_ID_REQUIRED.into()))?;

    if !state
        .rate_limiter
        .check(PROPOSAL_KEY, PROPOSAL_MAX_SENDS, PROPOSAL_WINDOW)
    {
        return Err(AppError::TooManyRequests(msg::TOO_MANY_PROPOSALS.into()));
    }

    Ok(ok(send_proposal(&state, lead_id).await?))
}
