use std::env;

/// Per-IP rate limit applied to the public contact form (requests per minute).
/// The per-email submission limit is separate and lives in `rate_limit`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// 0 disables the per-IP layer.
    pub contact_rpm: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { contact_rpm: 10 }
    }
}

/// Follow-up sweep settings.
#[derive(Debug, Clone, Copy)]
pub struct FollowUpConfig {
    /// Proposals older than this without payment get a nudge.
    pub after_hours: i64,
    /// Maximum nudges sent per sweep.
    pub cap: usize,
    /// How often the in-process sweep runs. 0 disables it.
    pub interval_hours: u64,
}

impl FollowUpConfig {
    /// Upper bound for `after_hours`: ten years.
    pub const MAX_AFTER_HOURS: i64 = 24 * 365 * 10;
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            after_hours: 24,
            cap: 20,
            interval_hours: 6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Shared bearer secret for operator endpoints.
    pub api_secret: Option<String>,
    pub stripe_webhook_secret: String,
    pub sendgrid_api_key: Option<String>,
    pub email_from: String,
    pub brand_name: String,
    pub discord_webhook_url: Option<String>,
    pub rate_limit: RateLimitConfig,
    pub follow_up: FollowUpConfig,
    pub dev_mode: bool,
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("LEADPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env_parse("PORT", 3000);

        let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default();
        if stripe_webhook_secret.is_empty() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set - payment webhooks will be rejected");
        }

        let api_secret = env_opt("API_SECRET");
        if api_secret.is_none() {
            tracing::warn!("API_SECRET not set - operator endpoints will reject all requests");
        }

        let defaults = FollowUpConfig::default();

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "leadpay.db".to_string()),
            api_secret,
            stripe_webhook_secret,
            sendgrid_api_key: env_opt("SENDGRID_API_KEY"),
            email_from: env::var("EMAIL_FROM").unwrap_or_else(|_| "hello@leadpay.local".to_string()),
            brand_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Leadpay Labs".to_string()),
            discord_webhook_url: env_opt("DISCORD_WEBHOOK_URL"),
            rate_limit: RateLimitConfig {
                contact_rpm: env_parse("RATE_LIMIT_CONTACT_RPM", RateLimitConfig::default().contact_rpm),
            },
            follow_up: FollowUpConfig {
                after_hours: env_parse("FOLLOW_UP_AFTER_HOURS", defaults.after_hours)
                    .clamp(0, FollowUpConfig::MAX_AFTER_HOURS),
                cap: env_parse("FOLLOW_UP_CAP", defaults.cap),
                interval_hours: env_parse("FOLLOW_UP_INTERVAL_HOURS", defaults.interval_hours),
            },
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
