//! Best-effort user notifications

pub mod queue;
pub mod telegram;

pub use queue::*;
pub use telegram::*;

use async_trait::async_trait;
use tracing::info;

use crate::errors::GridResult;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, text: &str) -> GridResult<()>;
}

/// Writes notifications to the log when no chat sink is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: i64, text: &str) -> GridResult<()> {
        info!(user_id, "[Notify] {}", text);
        Ok(())
    }
}
