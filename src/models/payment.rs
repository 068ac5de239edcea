use serde::{Deserialize, Serialize};

use super::LinkType;

/// One applied payment. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub lead_id: i64,
    pub stripe_event_id: String,
    pub payment_link_id: i64,
    pub tier: String,
    pub link_type: LinkType,
    pub amount_cents: i64,
    pub customer_email: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct CreatePayment<'a> {
    pub lead_id: i64,
    pub stripe_event_id: &'a str,
    pub payment_link_id: i64,
    pub tier: &'a str,
    pub link_type: LinkType,
    pub amount_cents: i64,
    pub customer_email: &'a str,
}
