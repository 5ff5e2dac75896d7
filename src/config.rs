use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storefront: StorefrontConfig,
    pub registry: RegistryConfig,
    pub sync: SyncConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationsConfig,
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    pub base_url: String,
    /// Two-letter region code passed as `cc`; decides the currency returned.
    pub country_code: Option<String>,
    pub language: Option<String>,
    pub request_timeout: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub max_concurrent_fetches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub initial_delay_secs: u64,
    pub fault_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub operator_webhook_url: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files. Stdout only when unset.
    pub directory: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_dir(Path::new("config"))
    }

    pub fn from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let source = |name: &str| File::from(config_dir.join(name)).required(false);

        let s = Self::with_defaults(Config::builder())?
            .add_source(source("default"))
            // Add environment-specific config
            .add_source(source(&run_mode))
            // Add local config (ignored by git)
            .add_source(source("local"))
            // Add environment variables with prefix "WATCHER_"
            .add_source(Environment::with_prefix("WATCHER").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("storefront.base_url", "https://store.steampowered.com")?
            .set_default("storefront.request_timeout", 15)?
            .set_default("storefront.user_agent", "SteamWatcher/0.1")?
            .set_default("registry.path", "added_games.json")?
            .set_default("sync.max_concurrent_fetches", 8)?
            .set_default("scheduler.interval_secs", 60)?
            .set_default("scheduler.initial_delay_secs", 5)?
            .set_default("scheduler.fault_backoff_secs", 5)?
            .set_default("notifications.discord.username", "Steam Watcher")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.port", 9001)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.storefront.base_url).is_err() {
            return Err(ConfigError::Message("Invalid storefront base URL format".into()));
        }

        if self.storefront.request_timeout == 0 {
            return Err(ConfigError::Message("Storefront request_timeout must be greater than 0".into()));
        }

        if let Some(cc) = &self.storefront.country_code {
            if cc.len() != 2 || !cc.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::Message("Storefront country_code must be a two-letter code".into()));
            }
        }

        if self.registry.path.trim().is_empty() {
            return Err(ConfigError::Message("Registry path must not be empty".into()));
        }

        if self.sync.max_concurrent_fetches == 0 {
            return Err(ConfigError::Message("Sync max_concurrent_fetches must be greater than 0".into()));
        }

        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Message("Scheduler interval_secs must be greater than 0".into()));
        }

        if self.scheduler.fault_backoff_secs >= self.scheduler.interval_secs {
            return Err(ConfigError::Message(
                "Scheduler fault_backoff_secs must be shorter than interval_secs".into(),
            ));
        }

        for webhook in [
            &self.notifications.discord.webhook_url,
            &self.notifications.discord.operator_webhook_url,
        ]
        .into_iter()
        .flatten()
        {
            if Url::parse(webhook).is_err() {
                return Err(ConfigError::Message("Invalid Discord webhook URL".into()));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}
