use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::sync::Arc;
use std::time::Duration;

use leadpay::config::Config;
use leadpay::db::{AppState, create_pool, init_db, queries};
use leadpay::email::EmailService;
use leadpay::handlers::operators::run_follow_up_sweep;
use leadpay::models::{CreatePaymentLink, LinkType, Tier};
use leadpay::notify::ChatNotifier;
use leadpay::rate_limit::{CONTACT_WINDOW, PROPOSAL_WINDOW, SlidingWindowLimiter};

#[derive(Parser, Debug)]
#[command(name = "leadpay")]
#[command(about = "Lead intake, proposals, and payment reconciliation")]
struct Cli {
    /// Seed placeholder payment links for every tier (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Run a single follow-up sweep and exit instead of serving
    #[arg(long)]
    follow_up_once: bool,
}

/// Placeholder catalogue: (tier, link type, price in cents).
const SEED_LINKS: [(Tier, LinkType, i64); 5] = [
    (Tier::Starter, LinkType::Full, 50_000),
    (Tier::Pro, LinkType::Deposit, 75_000),
    (Tier::Pro, LinkType::Final, 75_000),
    (Tier::Business, LinkType::Deposit, 150_000),
    (Tier::Business, LinkType::Final, 150_000),
];

/// Seeds placeholder payment links. Skipped when any link already exists.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing = queries::list_payment_links(&conn).expect("Failed to list payment links");
    if !existing.is_empty() {
        tracing::info!("Payment links already exist, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV PAYMENT LINKS");
    tracing::info!("============================================");

    for (tier, link_type, price_cents) in SEED_LINKS {
        let slug = format!("{}_{}", tier.as_ref(), link_type.as_ref());
        let link = queries::create_payment_link(
            &conn,
            &CreatePaymentLink {
                tier: tier.as_ref().to_string(),
                link_type,
                stripe_product_id: None,
                stripe_price_id: None,
                stripe_link_id: format!("plink_dev_{}", slug),
                stripe_url: format!("https://buy.stripe.com/test_{}", slug),
                price_cents,
            },
        )
        .expect("Failed to create dev payment link");

        tracing::info!(
            "{}/{}: {} ({})",
            link.tier,
            link.link_type.as_ref(),
            link.stripe_link_id,
            link.stripe_url
        );
    }

    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED SUCCESSFULLY");
    tracing::info!("============================================");
}

/// Runs the follow-up sweep every `interval_hours`. The first run waits a full interval.
fn spawn_follow_up_task(state: AppState, interval_hours: u64) {
    if interval_hours == 0 {
        tracing::info!("Follow-up task disabled (FOLLOW_UP_INTERVAL_HOURS=0)");
        return;
    }

    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_hours * 60 * 60);

        loop {
            tokio::time::sleep(interval).await;

            if let Err(e) = run_follow_up_sweep(&state).await {
                tracing::warn!("Follow-up sweep failed: {}", e);
            }
        }
    });

    tracing::info!(
        "Background follow-up task started (runs every {} hours)",
        interval_hours
    );
}

/// Drops idle rate-limit keys every 10 minutes.
fn spawn_limiter_sweep_task(limiter: Arc<SlidingWindowLimiter>) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(10 * 60);
        let window = CONTACT_WINDOW.max(PROPOSAL_WINDOW);

        loop {
            tokio::time::sleep(interval).await;
            limiter.sweep(window);
        }
    });
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadpay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let email = EmailService::new(
        config.sendgrid_api_key.clone(),
        config.email_from.clone(),
        config.brand_name.clone(),
    );
    if !email.is_configured() {
        tracing::warn!("SENDGRID_API_KEY not set - outbound email will fail");
    }

    let limiter = Arc::new(SlidingWindowLimiter::new());

    let state = AppState {
        db: db_pool,
        api_secret: config.api_secret.clone(),
        stripe_webhook_secret: config.stripe_webhook_secret.clone(),
        email: Arc::new(email),
        chat: Arc::new(ChatNotifier::new(config.discord_webhook_url.clone())),
        rate_limiter: limiter.clone(),
        follow_up_after_hours: config.follow_up.after_hours,
        follow_up_cap: config.follow_up.cap,
        brand_name: config.brand_name.clone(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set LEADPAY_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    if cli.follow_up_once {
        match run_follow_up_sweep(&state).await {
            Ok(summary) => println!(
                "Follow-up: {} eligible, {} sent, {} failed",
                summary.eligible, summary.sent, summary.failed
            ),
            Err(e) => {
                eprintln!("Follow-up sweep failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    spawn_follow_up_task(state.clone(), config.follow_up.interval_hours);
    spawn_limiter_sweep_task(limiter);

    let app = leadpay::app(state, config.rate_limit);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Leadpay server listening on {}", addr);

    // Connect info feeds the per-IP limiter on /contact
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
