use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct WebhookEventRecord {
    pub id: i64,
    pub stripe_event_id: String,
    pub event_type: String,
    pub processed: bool,
    pub created_at: i64,
}

/// Outcome of recording an inbound event id in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntry {
    /// First delivery.
    New,
    /// Seen before but never finished (an earlier attempt failed). Safe to resume.
    Unfinished,
    /// Seen and fully processed.
    Duplicate,
}
