use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::activity::log_activity;
use crate::background::spawn_detached;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result, msg};
use crate::extractors::{Json, Path, Query};
use crate::models::{ActivityAction, Lead, LeadFilter, ReviewStatus};
use crate::response::{ApiResult, ok};

use super::proposals::send_proposal;

/// Most leads returned by a single listing.
const LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ReviewLeadRequest {
    #[serde(default)]
    pub review_status: Option<String>,
    #[serde(default)]
    pub review_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub lead: Lead,
}

#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
    pub count: usize,
}

pub async fn list_leads(
    State(state): State<AppState>,
    Query(filter): Query<LeadFilter>,
) -> ApiResult<LeadListResponse> {
    let conn = state.db.get()?;
    let leads = queries::list_leads(&conn, &filter, LIST_LIMIT)?;
    Ok(ok(LeadListResponse {
        count: leads.len(),
        leads,
    }))
}

fn apply_review(
    state: &AppState,
    lead_id: i64,
    status: ReviewStatus,
    notes: Option<&str>,
) -> Result<Lead> {
    let conn = state.db.get()?;

    let existing = queries::get_lead_by_id(&conn, lead_id)?
        .ok_or_else(|| AppError::NotFound(msg::LEAD_NOT_FOUND.into()))?;
    let updated = queries::update_lead_review(&conn, lead_id, status, notes)?
        .ok_or_else(|| AppError::NotFound(msg::LEAD_NOT_FOUND.into()))?;

    log_activity(
        &conn,
        ActivityAction::LeadReviewed,
        &format!("Lead #{} -> {}", lead_id, status.as_ref()),
        Some(json!({
            "lead_id": lead_id,
            "old_status": existing.review_status,
            "new_status": status,
        })),
    );

    Ok(updated)
}

pub async fn review_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReviewLeadRequest>,
) -> ApiResult<LeadResponse> {
    let lead_id: i64 = id
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(msg::INVALID_LEAD_ID.into()))?;

    let status: ReviewStatus = req
        .review_status
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| {
            AppError::BadRequest(format!(
                "Invalid status. Must be one of: {}",
                ReviewStatus::valid_values()
            ))
        })?;

    let notes = req.review_notes.as_deref().filter(|n| !n.is_empty());
    let lead = apply_review(&state, lead_id, status, notes)?;
    tracing::info!(lead_id, status = status.as_ref(), "Lead reviewed");

    if status == ReviewStatus::Approved {
        let state = state.clone();
        spawn_detached("proposal_after_approval", async move {
            match send_proposal(&state, lead_id).await {
                Ok(sent) => {
                    tracing::info!(lead_id, tier = %sent.tier, "Proposal sent after approval")
                }
                Err(e) => tracing::warn!(lead_id, error = %e, "Proposal after approval failed"),
            }
        });
    }

    Ok(ok(LeadResponse { lead }))
}
