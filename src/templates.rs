//! Plain-text email copy for proposals, follow-ups and confirmations.

use crate::email::EmailMessage;
use crate::models::Tier;

/// Customer-facing description of a service tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierDetails {
    pub name: &'static str,
    /// Whole dollars.
    pub price: u32,
    pub price_cents: i64,
    pub upfront: &'static str,
    pub timeline: &'static str,
    pub revisions: &'static str,
    pub outcomes: &'static [&'static str],
}

const STARTER: TierDetails = TierDetails {
    name: "Starter",
    price: 500,
    price_cents: 50_000,
    upfront: "100% upfront",
    timeline: "3-5 business days",
    revisions: "1 revision round",
    outcomes: &[
        "Professional website audit & redesign recommendations",
        "Core SEO setup (meta tags, schema, sitemap)",
        "Mobile-responsive optimization",
        "Performance baseline report",
    ],
};

const PRO: TierDetails = TierDetails {
    name: "Pro",
    price: 1500,
    price_cents: 150_000,
    upfront: "50% deposit ($750)",
    timeline: "7-14 business days",
    revisions: "2 revision rounds",
    outcomes: &[
        "Full website redesign or build",
        "Advanced SEO + local search optimization",
        "Contact form + lead capture setup",
        "Analytics dashboard integration",
        "Social media profile optimization",
    ],
};

const BUSINESS: TierDetails = TierDetails {
    name: "Business",
    price: 3000,
    price_cents: 300_000,
    upfront: "50% deposit ($1,500)",
    timeline: "14-21 business days",
    revisions: "3 revision rounds + priority support",
    outcomes: &[
        "Complete digital presence overhaul",
        "Custom website build with CMS",
        "Full SEO campaign (on-page + technical + local)",
        "Email marketing setup + automation",
        "Social media strategy + content calendar",
        "Monthly performance reporting (3 months)",
    ],
};

impl TierDetails {
    pub fn for_tier(tier: Tier) -> &'static TierDetails {
        match tier {
            Tier::Starter => &STARTER,
            Tier::Pro => &PRO,
            Tier::Business => &BUSINESS,
        }
    }
}

/// Details for a free-text tier name. Unknown names fall back to Pro.
pub fn tier_details(tier: &str) -> &'static TierDetails {
    let tier = tier.trim().to_lowercase().parse().unwrap_or(Tier::Pro);
    TierDetails::for_tier(tier)
}

pub fn proposal_email(business_name: &str, tier: &str, payment_url: &str, brand: &str) -> EmailMessage {
    let details = tier_details(tier);
    let outcomes = details
        .outcomes
        .iter()
        .map(|o| format!("  - {}", o))
        .collect::<Vec<_>>()
        .join("\n");

    EmailMessage {
        subject: format!("Your {} Package - {}", details.name, brand),
        body: format!(
            "Hi {business_name},\n\n\
             Thanks for reaching out to {brand}. Based on what you shared, here's what we can deliver:\n\n\
             {name} Package - ${price}\n\
             {rule}\n\n\
             What's included:\n\
             {outcomes}\n\n\
             Timeline: {timeline}\n\
             Revisions: {revisions}\n\
             Investment: ${price} ({upfront})\n\n\
             Ready to get started? Lock in your spot here:\n\
             {payment_url}\n\n\
             Once payment is confirmed, we'll send you an onboarding form within 24 hours to kick things off.\n\n\
             Questions? Just reply to this email.\n\n\
             - {brand}",
            name = details.name,
            price = details.price,
            rule = "-".repeat(40),
            timeline = details.timeline,
            revisions = details.revisions,
            upfront = details.upfront,
        ),
    }
}

pub fn follow_up_email(business_name: &str, tier: &str, payment_url: &str, brand: &str) -> EmailMessage {
    let details = tier_details(tier);

    EmailMessage {
        subject: format!("Quick follow-up - {} Package", details.name),
        body: format!(
            "Hi {business_name},\n\n\
             Just following up on the {name} Package proposal we sent yesterday.\n\n\
             We're currently taking on a limited number of projects this month, and I wanted to make sure your spot is still available.\n\n\
             Here's the link to get started:\n\
             {payment_url}\n\n\
             If you have any questions or want to adjust the scope, just reply here. Happy to chat.\n\n\
             - {brand}",
            name = details.name,
        ),
    }
}

pub fn payment_confirmation_email(business_name: &str, is_deposit: bool, brand: &str) -> EmailMessage {
    let (subject, next_steps) = if is_deposit {
        (
            "Deposit received - you're locked in!",
            "Your deposit has been received. Here's what happens next:\n\n\
             \x20 1. You'll receive an onboarding form within 24 hours\n\
             \x20 2. We'll schedule a kickoff call\n\
             \x20 3. Work begins immediately after onboarding\n\n\
             The remaining balance will be due upon project completion.",
        )
    } else {
        (
            "Payment confirmed - let's get started!",
            "Your payment has been confirmed. Here's what happens next:\n\n\
             \x20 1. You'll receive an onboarding form within 24 hours\n\
             \x20 2. We'll schedule a kickoff call\n\
             \x20 3. Work begins immediately after onboarding",
        )
    };

    EmailMessage {
        subject: subject.to_string(),
        body: format!(
            "Hi {business_name},\n\n\
             {next_steps}\n\n\
             We're excited to work with you. If you have any questions in the meantime, just reply to this email.\n\n\
             - {brand}"
        ),
    }
}

/// Acknowledgement for a brand-new contact.
pub fn contact_confirmation_email(name: &str, brand: &str) -> EmailMessage {
    EmailMessage {
        subject: format!("We got your message - {}", brand),
        body: format!(
            "Hi {name},\n\n\
             Thanks for reaching out to {brand}! We've received your inquiry and will follow up within 24 hours with a personalized proposal.\n\n\
             In the meantime, if you have any questions, just reply to this email.\n\n\
             - {brand}"
        ),
    }
}
