use axum::extract::State;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;

use crate::activity::log_activity;
use crate::db::{AppState, queries};
use crate::error::Result;
use crate::models::{ActivityAction, Lead, LinkType};
use crate::response::{ApiResult, ok};
use crate::templates::follow_up_email;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FollowUpSummary {
    pub eligible: usize,
    pub sent: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Proposals sent before this instant are due. Out-of-range windows match nothing.
fn follow_up_cutoff(now: DateTime<Utc>, after_hours: i64) -> i64 {
    Duration::try_hours(after_hours)
        .and_then(|window| now.checked_sub_signed(window))
        .map(|cutoff| cutoff.timestamp())
        .unwrap_or(i64::MIN)
}

fn load_candidates(state: &AppState) -> Result<Vec<Lead>> {
    let conn = state.db.get()?;
    let cutoff = follow_up_cutoff(Utc::now(), state.follow_up_after_hours);
    queries::list_follow_up_candidates(&conn, cutoff, state.follow_up_cap as i64)
}

fn payment_url_for(state: &AppState, tier: &str) -> Result<Option<String>> {
    let conn = state.db.get()?;
    let link = queries::get_active_payment_link(&conn, tier, LinkType::for_tier(tier))?;
    Ok(link.map(|l| l.stripe_url))
}

fn record_follow_up(state: &AppState, lead_id: i64, message_id: Option<&str>) -> Result<()> {
    let conn = state.db.get()?;
    queries::mark_follow_up_sent(&conn, lead_id, message_id)?;
    queries::create_follow_up(&conn, lead_id, message_id)?;
    Ok(())
}

/// Send one nudge to every lead whose proposal has gone unpaid too long.
///
/// Leads without an active payment link for their tier are skipped and
/// counted as neither sent nor failed.
pub async fn run_follow_up_sweep(state: &AppState) -> Result<FollowUpSummary> {
    let candidates = load_candidates(state)?;
    if candidates.is_empty() {
        return Ok(FollowUpSummary {
            message: Some("No follow-ups needed"),
            ..Default::default()
        });
    }

    let mut summary = FollowUpSummary {
        eligible: candidates.len(),
        ..Default::default()
    };

    for lead in &candidates {
        let tier = lead.tier();
        let Some(payment_url) = payment_url_for(state, &tier)? else {
            tracing::warn!(lead_id = lead.id, tier = %tier, "No payment link for tier, skipping follow-up");
            continue;
        };

        let message = follow_up_email(&lead.business_name, &tier, &payment_url, &state.brand_name);
        match state.email.send(&lead.email, &message).await {
            Ok(message_id) => {
                record_follow_up(state, lead.id, message_id.as_deref())?;
                summary.sent += 1;
            }
            Err(e) => {
                tracing::error!(lead_id = lead.id, error = %e, "Follow-up email failed");
                summary.failed += 1;
            }
        }
    }

    {
        let conn = state.db.get()?;
        log_activity(
            &conn,
            ActivityAction::FollowUpRun,
            &format!("Follow-up: {} sent, {} failed", summary.sent, summary.failed),
            Some(json!({
                "eligible": summary.eligible,
                "sent": summary.sent,
                "failed": summary.failed,
            })),
        );
    }

    tracing::info!(
        eligible = summary.eligible,
        sent = summary.sent,
        failed = summary.failed,
        "Follow-up sweep finished"
    );
    Ok(summary)
}

pub async fn run_follow_up(State(state): State<AppState>) -> ApiResult<FollowUpSummary> {
    Ok(ok(run_follow_up_sweep(&state).await?))
}
