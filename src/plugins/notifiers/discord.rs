use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::DiscordConfig;
use crate::models::{ChangeRecord, ChangeType};
use crate::plugins::traits::Notifier;
use crate::utils::error::AppError;

const NOTIFIER_NAME: &str = "discord";

/// Posts change embeds and operator messages through Discord webhooks.
///
/// A delivery target that is itself a webhook URL is posted to directly;
/// any other target falls back to the configured default webhook.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    operator_webhook_url: Option<String>,
    username: String,
    store_base_url: String,
}

impl DiscordNotifier {
    pub fn new(config: &DiscordConfig, store_base_url: &str) -> Result<Self, AppError> {
        let webhook_url = config
            .webhook_url
            .clone()
            .ok_or_else(|| AppError::Validation("Discord webhook_url is not configured".to_string()))?;

        Ok(DiscordNotifier {
            client: Client::new(),
            webhook_url,
            operator_webhook_url: config.operator_webhook_url.clone(),
            username: config.username.clone(),
            store_base_url: store_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_embed_color(&self, change_type: ChangeType) -> u32 {
        match change_type {
            ChangeType::Decreased => 0x00ff00, // Green for price drops
            ChangeType::Increased => 0xff9900, // Orange for price increases
            ChangeType::Unchanged => 0x0099ff,
        }
    }

    fn create_embed(&self, change: &ChangeRecord) -> serde_json::Value {
        let name = change.new.display_name();
        let description = if change.new.on_sale() {
            format!(
                "{} is on sale!\n\n{} -> {} (-{}%)",
                name,
                change.old.final_formatted(),
                change.new.final_formatted(),
                change.new.discount_percent()
            )
        } else {
            format!(
                "{} changed price:\n\n{} -> {}",
                name,
                change.old.final_formatted(),
                change.new.final_formatted()
            )
        };

        json!({
            "title": name,
            "url": change.item.kind.store_url(&self.store_base_url, change.external_id()),
            "description": description,
            "color": self.get_embed_color(change.change_type()),
            "timestamp": change.new.fetched_at().to_rfc3339(),
            "footer": { "text": self.username },
        })
    }

    fn create_webhook_payload(&self, change: &ChangeRecord) -> serde_json::Value {
        json!({
            "username": self.username,
            "content": format!("<@{}>", change.item.owner_id),
            "embeds": [self.create_embed(change)],
        })
    }

    fn webhook_for<'a>(&'a self, delivery_target: &'a str) -> &'a str {
        if delivery_target.starts_with("https://") || delivery_target.starts_with("http://") {
            delivery_target
        } else {
            &self.webhook_url
        }
    }

    async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<(), AppError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| notifier_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(notifier_error(format!("webhook returned {}", status)));
        }
        Ok(())
    }
}

fn notifier_error(message: String) -> AppError {
    AppError::Notifier {
        notifier: NOTIFIER_NAME.to_string(),
        message,
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        NOTIFIER_NAME
    }

    async fn notify_change(&self, change: &ChangeRecord) -> Result<(), AppError> {
        let url = self.webhook_for(&change.item.delivery_target);
        self.post(url, &self.create_webhook_payload(change)).await?;
        tracing::debug!("Posted change for {} to Discord", change.external_id());
        Ok(())
    }

    async fn notify_operator(&self, message: &str) -> Result<(), AppError> {
        let url = self.operator_webhook_url.as_deref().unwrap_or(&self.webhook_url);
        let payload = json!({
            "username": self.username,
            "content": message,
        });
        self.post(url, &payload).await
    }
}
