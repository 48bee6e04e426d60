use async_trait::async_trait;

use crate::error::NotifyError;

/// Outbound notification sink (chat webhook and the like).
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}
