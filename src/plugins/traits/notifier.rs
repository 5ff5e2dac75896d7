use async_trait::async_trait;

use crate::models::ChangeRecord;
use crate::utils::error::AppError;

/// Delivery side of the watcher: subscriber change messages and operator alerts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Tell the subscriber of `change.item` that the final price moved.
    async fn notify_change(&self, change: &ChangeRecord) -> Result<(), AppError>;

    /// Report something an operator should look at, e.g. a failing listing.
    async fn notify_operator(&self, message: &str) -> Result<(), AppError>;
}
