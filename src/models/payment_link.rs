use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Service tier sold through payment links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    Starter,
    Pro,
    Business,
}

/// Which part of the price a link collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkType {
    Full,
    Deposit,
    Final,
}

impl LinkType {
    /// Paying through this link settles the engagement.
    pub fn is_complete(&self) -> bool {
        matches!(self, LinkType::Full | LinkType::Final)
    }

    /// Link a proposal for `tier` points at: starter is paid up front,
    /// everything else starts with a deposit.
    pub fn for_tier(tier: &str) -> Self {
        if tier.eq_ignore_ascii_case(Tier::Starter.as_ref()) {
            LinkType::Full
        } else {
            LinkType::Deposit
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: i64,
    pub tier: String,
    pub link_type: LinkType,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_link_id: String,
    pub stripe_url: String,
    pub price_cents: i64,
    pub active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct CreatePaymentLink {
    pub tier: String,
    pub link_type: LinkType,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub stripe_link_id: String,
    pub stripe_url: String,
    pub price_cents: i64,
}
