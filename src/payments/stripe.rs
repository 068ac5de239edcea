use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};

use crate::error::msg;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a webhook timestamp before it's rejected (in seconds).
pub const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Clock skew allowed for timestamps ahead of our clock (in seconds).
pub const WEBHOOK_MAX_FUTURE_SKEW_SECS: i64 = 60;

/// Name of the header carrying `t=<unix>,v1=<hex>[,v1=<hex>...]`.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Result of checking a webhook signature. `reason` is set when invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureVerdict {
    pub valid: bool,
    pub reason: Option<String>,
}

impl SignatureVerdict {
    fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Parsed signature header. Unknown keys are ignored; a repeated `t` keeps the last value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SignatureHeader<'a> {
    pub timestamp: Option<&'a str>,
    pub signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    pub fn parse(header: &'a str) -> Self {
        let mut parsed = SignatureHeader::default();
        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key {
                "t" => parsed.timestamp = Some(value).filter(|v| !v.is_empty()),
                "v1" => parsed.signatures.push(value),
                _ => {}
            }
        }
        parsed
    }
}

/// Verify a webhook signature against the current clock.
pub fn verify_webhook_signature(payload: &[u8], header: &str, secret: &str) -> SignatureVerdict {
    verify_webhook_signature_at(payload, header, secret, chrono::Utc::now().timestamp())
}

/// Verify a webhook signature as of `now` (unix seconds).
///
/// The signed payload is `"{t}.{body}"` with `t` exactly as it appeared in the
/// header and the body bytes untouched. Any `v1` candidate may match.
pub fn verify_webhook_signature_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> SignatureVerdict {
    let parsed = SignatureHeader::parse(header);

    let Some(timestamp_str) = parsed.timestamp else {
        return SignatureVerdict::invalid(msg::MISSING_TIMESTAMP_OR_SIGNATURE);
    };
    if parsed.signatures.is_empty() {
        return SignatureVerdict::invalid(msg::MISSING_TIMESTAMP_OR_SIGNATURE);
    }

    let Ok(timestamp) = timestamp_str.parse::<i64>() else {
        return SignatureVerdict::invalid(msg::INVALID_TIMESTAMP);
    };

    let Some(age) = now.checked_sub(timestamp) else {
        return SignatureVerdict::invalid(msg::INVALID_TIMESTAMP);
    };
    if age < -WEBHOOK_MAX_FUTURE_SKEW_SECS {
        tracing::warn!(age, "Stripe webhook rejected: timestamp in the future");
        return SignatureVerdict::invalid(msg::TIMESTAMP_IN_FUTURE);
    }
    if age > WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
        tracing::warn!(
            age,
            max = WEBHOOK_TIMESTAMP_TOLERANCE_SECS,
            "Stripe webhook rejected: timestamp too old"
        );
        return SignatureVerdict::invalid(format!(
            "Timestamp too old ({}s > {}s)",
            age, WEBHOOK_TIMESTAMP_TOLERANCE_SECS
        ));
    }

    let expected = compute_signature(secret, timestamp_str, payload);
    let expected_bytes = expected.as_bytes();

    // Fold over every candidate so timing doesn't reveal which one matched.
    let matched = parsed
        .signatures
        .iter()
        .fold(Choice::from(0u8), |acc, candidate| {
            let candidate = candidate.as_bytes();
            // Length is not secret: always 64 hex chars for SHA-256
            let eq = if candidate.len() == expected_bytes.len() {
                candidate.ct_eq(expected_bytes)
            } else {
                Choice::from(0u8)
            };
            acc | eq
        });

    if bool::from(matched) {
        SignatureVerdict::valid()
    } else {
        SignatureVerdict::invalid(msg::SIGNATURE_MISMATCH)
    }
}

/// Lowercase hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(secret: &str, timestamp: &str, payload: &[u8]) -> String {
    // HMAC accepts keys of any length; an empty digest never matches a candidate
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

// ============ Event payloads ============

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeCheckoutSession {
    /// Payment link the session was created from.
    pub payment_link: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
    /// Older API versions put the address here instead.
    pub customer_email: Option<String>,
    /// Amount actually charged, in cents. Recorded for audit only.
    pub amount_total: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
}

impl StripeCheckoutSession {
    /// Customer email, trimmed and lowercased. Prefers `customer_details.email`.
    pub fn email(&self) -> Option<String> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    pub fn payment_link(&self) -> Option<&str> {
        self.payment_link.as_deref().filter(|l| !l.is_empty())
    }
}
