use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Proposal {
    pub id: i64,
    pub lead_id: i64,
    pub tier: String,
    pub payment_url: String,
    pub message_id: Option<String>,
    pub sent_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowUp {
    pub id: i64,
    pub lead_id: i64,
    pub message_id: Option<String>,
    pub sent_at: i64,
}
