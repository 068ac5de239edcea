use axum::extract::State;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::activity::log_activity;
use crate::background::spawn_detached;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::models::{ActivityAction, CreateLead, Tier};
use crate::notify::{Embed, color};
use crate::rate_limit::{CONTACT_MAX_PER_EMAIL, CONTACT_WINDOW};
use crate::response::{ApiResult, ok};
use crate::templates::contact_confirmation_email;
use crate::util::{is_valid_email, sanitize_input};

/// Score assigned to inbound website leads.
pub const INBOUND_LEAD_SCORE: i64 = 85;

/// A repeat submission within this window updates the existing lead.
pub const DEDUP_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub lead_id: i64,
    pub deduped: bool,
}

/// Validated, sanitized submission.
struct ContactSubmission {
    name: String,
    email: String,
    message: Option<String>,
    category: String,
}

impl ContactSubmission {
    fn from_request(req: ContactRequest) -> Result<Self> {
        let name = sanitize_input(req.name.as_deref().unwrap_or_default());
        let email = req.email.unwrap_or_default().trim().to_lowercase();
        let message = sanitize_input(req.message.as_deref().unwrap_or_default());
        let category = req
            .category
            .as_deref()
            .map(sanitize_input)
            .unwrap_or_else(|| Tier::Pro.as_ref().to_string());

        if name.chars().count() < 2 {
            return Err(AppError::BadRequest(msg::NAME_REQUIRED.into()));
        }
        if !is_valid_email(&email) {
            return Err(AppError::BadRequest(msg::VALID_EMAIL_REQUIRED.into()));
        }

        Ok(Self {
            name,
            email,
            message: Some(message).filter(|m| !m.is_empty()),
            category,
        })
    }
}

/// Store the contact and create or refresh the lead. Returns (lead_id, deduped).
fn record_contact(state: &AppState, submission: &ContactSubmission) -> Result<(i64, bool)> {
    let conn = state.db.get()?;

    queries::create_contact(
        &conn,
        &submission.name,
        &submission.email,
        submission.message.as_deref(),
    )?;

    let since = (chrono::Utc::now() - Duration::days(DEDUP_WINDOW_DAYS)).timestamp();
    let (lead_id, deduped) =
        match queries::find_recent_lead_by_email(&conn, &submission.email, since)? {
            Some(existing) => {
                queries::update_lead_message(&conn, existing.id, submission.message.as_deref())?;
                (existing.id, true)
            }
            None => {
                let lead = queries::create_lead(
                    &conn,
                    &CreateLead {
                        business_name: submission.name.clone(),
                        email: submission.email.clone(),
                        category: Some(submission.category.clone()).filter(|c| !c.is_empty()),
                        message: submission.message.clone(),
                        score: INBOUND_LEAD_SCORE,
                    },
                )?;
                (lead.id, false)
            }
        };

    log_activity(
        &conn,
        ActivityAction::InboundContact,
        &format!("Contact from {} ({})", submission.name, submission.email),
        Some(json!({
            "lead_id": lead_id,
            "deduped": deduped,
            "category": submission.category,
        })),
    );

    Ok((lead_id, deduped))
}

pub async fn submit_contact(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> ApiResult<ContactResponse> {
    let submission = ContactSubmission::from_request(req)?;

    let key = format!("contact:{}", submission.email);
    if !state
        .rate_limiter
        .check(&key, CONTACT_MAX_PER_EMAIL, CONTACT_WINDOW)
    {
        tracing::info!(email = %submission.email, "Contact submission rate limited");
        return Err(AppError::TooManyRequests(msg::TOO_MANY_SUBMISSIONS.into()));
    }

    let (lead_id, deduped) = record_contact(&state, &submission)?;
    tracing::info!(lead_id, deduped, "Inbound contact recorded");

    spawn_contact_notifications(&state, submission, lead_id, deduped);

    Ok(ok(ContactResponse { lead_id, deduped }))
}

fn spawn_contact_notifications(
    state: &AppState,
    submission: ContactSubmission,
    lead_id: i64,
    deduped: bool,
) {
    let state = state.clone();
    spawn_detached("contact_notifications", async move {
        let (title, embed_color, tag) = if deduped {
            ("\u{1F504} Contact (Updated)", color::WARNING, "(deduped)")
        } else {
            ("\u{1F4E8} New Contact", color::INFO, "(new)")
        };
        let preview: String = submission
            .message
            .as_deref()
            .unwrap_or("(none)")
            .chars()
            .take(200)
            .collect();

        let embed = Embed::new(title, embed_color)
            .inline_field("Name", submission.name.as_str())
            .inline_field("Email", submission.email.as_str())
            .inline_field("Category", submission.category.as_str())
            .field("Message", preview)
            .footer(format!("Lead #{} {}", lead_id, tag));
        state.chat.send(embed).await;

        if !deduped {
            let message = contact_confirmation_email(&submission.name, &state.brand_name);
            if let Err(e) = state.email.send(&submission.email, &message).await {
                tracing::warn!(lead_id, error = %e, "Contact confirmation email failed");
            }
        }
    });
}
