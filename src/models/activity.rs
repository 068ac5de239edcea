use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
    InboundContact,
    LeadReviewed,
    ProposalSent,
    FollowUpRun,
    PaymentReceived,
    WebhookNoMatch,
    WebhookLeadNotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityLog {
    pub id: i64,
    pub action: String,
    pub details: String,
    /// JSON object, stored as text.
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
}
