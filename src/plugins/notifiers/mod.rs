// Notifier plugin implementations
pub mod discord;

pub use discord::DiscordNotifier;

use async_trait::async_trait;

use crate::models::ChangeRecord;
use crate::plugins::traits::Notifier;
use crate::utils::error::AppError;

/// Writes changes and operator messages to the log. Used when no webhook is set.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify_change(&self, change: &ChangeRecord) -> Result<(), AppError> {
        tracing::info!(
            owner = %change.item.owner_id,
            target = %change.item.delivery_target,
            "{} ({}): {} -> {}",
            change.new.display_name(),
            change.external_id(),
            change.old.final_formatted(),
            change.new.final_formatted()
        );
        Ok(())
    }

    async fn notify_operator(&self, message: &str) -> Result<(), AppError> {
        tracing::warn!("Operator: {}", message);
        Ok(())
    }
}
