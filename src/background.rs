//! Fire-and-forget task spawning.
//!
//! Detached work (notifications, confirmation emails, proposal sends after
//! approval) never affects the response that triggered it. Failures are the
//! task's own business to log; panics are caught and logged here.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;

/// Spawn `fut` on the runtime, logging a panic instead of losing it silently.
pub fn spawn_detached<F>(task_name: &'static str, fut: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(AssertUnwindSafe(fut).catch_unwind().map(move |result| {
        if let Err(panic) = result {
            let panic_msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(task = task_name, "Background task panicked: {}", panic_msg);
        }
    }))
}
