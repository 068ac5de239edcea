use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use super::Tier;

/// Operator review decision for a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewStatus {
    PendingReview,
    Approved,
    Rejected,
    EditNeeded,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 4] = [
        ReviewStatus::PendingReview,
        ReviewStatus::Approved,
        ReviewStatus::Rejected,
        ReviewStatus::EditNeeded,
    ];

    /// Comma-separated list used in validation errors.
    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Sales pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    New,
    Contacted,
    Contracted,
    ClosedWon,
    ClosedLost,
}

impl Stage {
    pub fn is_closed(&self) -> bool {
        matches!(self, Stage::ClosedWon | Stage::ClosedLost)
    }
}

/// Where the lead is in the payment flow. `Unpaid` is stored as `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    Unpaid,
    Pending,
    DepositPaid,
    FullyPaid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub business_name: String,
    pub email: String,
    /// Requested tier. Free text from the contact form; see [`Lead::tier`].
    pub category: Option<String>,
    pub message: Option<String>,
    pub score: i64,
    pub stage: Stage,
    pub review_status: ReviewStatus,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<i64>,
    pub proposal_sent_at: Option<i64>,
    pub proposal_message_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_amount_cents: i64,
    pub follow_up_sent_at: Option<i64>,
    pub follow_up_message_id: Option<String>,
    pub closed_at: Option<i64>,
    pub send_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Lead {
    /// Tier name used for payment-link lookup. Defaults to `pro`.
    pub fn tier(&self) -> String {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(Tier::Pro.as_ref())
            .to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct CreateLead {
    pub business_name: String,
    pub email: String,
    pub category: Option<String>,
    pub message: Option<String>,
    pub score: i64,
}

/// Optional filters for the operator lead listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    pub stage: Option<String>,
    pub review_status: Option<String>,
}
