mod from_row;
mod schema;
pub mod queries;

pub use from_row::FromRow;
pub use schema::init_db;

use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::email::EmailService;
use crate::notify::ChatNotifier;
use crate::rate_limit::RateLimiter;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every handler and background task.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Bearer secret for operator endpoints. None rejects every operator request.
    pub api_secret: Option<String>,
    /// Shared secret for payment webhook signatures. Empty rejects every delivery.
    pub stripe_webhook_secret: String,
    pub email: Arc<EmailService>,
    pub chat: Arc<ChatNotifier>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Proposals unpaid for this long are eligible for a follow-up.
    pub follow_up_after_hours: i64,
    pub follow_up_cap: usize,
    /// Name used in email copy and signatures.
    pub brand_name: String,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;",
        )?;
        conn.busy_timeout(Duration::from_secs(5))
    });
    Pool::builder().max_size(10).build(manager)
}
