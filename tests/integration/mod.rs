// Integration tests for Steam Watcher
// These tests verify that all components work together correctly

pub mod scheduler_tests;
pub mod sync_tests;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use steam_watcher::{
    AppConfig, AppError, ListingManager, Scheduler, SyncEngine,
    config::{
        DiscordConfig, LoggingConfig, MetricsConfig, NotificationsConfig, RegistryConfig, SchedulerConfig,
        StorefrontConfig, SyncConfig,
    },
    models::{ChangeRecord, ListingKind, NewListing, PriceSnapshot},
    plugins::{ListingFetcher, Notifier},
    registry::Registry,
    utils::error::FetchError,
};
use tempfile::TempDir;

/// Test configuration for integration tests
pub fn get_test_config(base_url: &str, registry_path: &Path) -> AppConfig {
    AppConfig {
        storefront: StorefrontConfig {
            base_url: base_url.to_string(),
            country_code: Some("kr".to_string()),
            language: None,
            request_timeout: 5,
            user_agent: "SteamWatcher-Test/1.0".to_string(),
        },
        registry: RegistryConfig {
            path: registry_path.display().to_string(),
        },
        sync: SyncConfig {
            max_concurrent_fetches: 2,
        },
        scheduler: SchedulerConfig {
            interval_secs: 60,
            initial_delay_secs: 5,
            fault_backoff_secs: 5,
        },
        notifications: NotificationsConfig {
            discord: DiscordConfig {
                webhook_url: None,
                operator_webhook_url: None,
                username: "Steam Watcher Test".to_string(),
            },
        },
        metrics: MetricsConfig {
            enabled: false,
            port: 9001,
        },
        logging: LoggingConfig::default(),
    }
}

#[derive(Clone, Copy)]
enum Scripted {
    Price { initial: i64, final_price: i64, discount: i64 },
    Failing,
}

/// A storefront stand-in whose prices the test sets between passes.
///
/// Ids that were never scripted fail like a timed-out request.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<HashMap<String, Scripted>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn set_price(&self, external_id: &str, final_price: i64) {
        self.set_sale(external_id, final_price, final_price, 0);
    }

    pub fn set_sale(&self, external_id: &str, initial: i64, final_price: i64, discount: i64) {
        self.script.lock().unwrap().insert(
            external_id.to_string(),
            Scripted::Price {
                initial,
                final_price,
                discount,
            },
        );
    }

    pub fn fail(&self, external_id: &str) {
        self.script.lock().unwrap().insert(external_id.to_string(), Scripted::Failing);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingFetcher for ScriptedFetcher {
    async fn fetch(&self, external_id: &str, kind: ListingKind) -> Result<PriceSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().get(external_id).copied();
        match scripted {
            Some(Scripted::Price {
                initial,
                final_price,
                discount,
            }) => Ok(PriceSnapshot::new(
                format!("{} {}", kind, external_id),
                initial,
                final_price,
                format!("₩ {}", initial / 100),
                format!("₩ {}", final_price / 100),
                discount,
            )),
            Some(Scripted::Failing) | None => Err(FetchError::Timeout { seconds: 5 }),
        }
    }
}

/// Keeps everything it is asked to deliver.
#[derive(Default)]
pub struct RecordingNotifier {
    pub changes: Mutex<Vec<ChangeRecord>>,
    pub operator_messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn changed_ids(&self) -> Vec<String> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.external_id().to_string())
            .collect()
    }

    pub fn operator_count(&self) -> usize {
        self.operator_messages.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify_change(&self, change: &ChangeRecord) -> Result<(), AppError> {
        self.changes.lock().unwrap().push(change.clone());
        Ok(())
    }

    async fn notify_operator(&self, message: &str) -> Result<(), AppError> {
        self.operator_messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// A fully wired watcher over a scripted storefront and a temp registry.
pub struct TestApp {
    pub dir: TempDir,
    pub fetcher: Arc<ScriptedFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: Arc<SyncEngine>,
    pub scheduler: Arc<Scheduler>,
    pub manager: ListingManager,
}

impl TestApp {
    pub fn registry_path(&self) -> std::path::PathBuf {
        self.dir.path().join("added_games.json")
    }

    /// Rebuild every component from the registry on disk, as after a restart.
    pub async fn restart(self) -> anyhow::Result<TestApp> {
        let TestApp { dir, fetcher, .. } = self;
        wire(dir, fetcher).await
    }
}

pub async fn create_test_app() -> anyhow::Result<TestApp> {
    wire(tempfile::tempdir()?, Arc::new(ScriptedFetcher::default())).await
}

async fn wire(dir: TempDir, fetcher: Arc<ScriptedFetcher>) -> anyhow::Result<TestApp> {
    let config = get_test_config("https://store.steampowered.com", &dir.path().join("added_games.json"));
    let registry = Registry::load(&config.registry.path).await?;
    let notifier = Arc::new(RecordingNotifier::default());

    let engine = Arc::new(SyncEngine::new(
        registry,
        fetcher.clone(),
        notifier.clone(),
        config.sync.max_concurrent_fetches,
    ));
    let scheduler = Arc::new(Scheduler::new(engine.clone(), notifier.clone(), config.scheduler.clone()));
    let manager = ListingManager::new(engine.clone(), scheduler.clone());

    Ok(TestApp {
        dir,
        fetcher,
        notifier,
        engine,
        scheduler,
        manager,
    })
}

/// Helper to create a registration request
pub fn create_test_listing(external_id: &str, kind: ListingKind, owner_id: &str) -> NewListing {
    NewListing {
        external_id: external_id.to_string(),
        kind,
        owner_id: owner_id.to_string(),
        delivery_target: "channel-1".to_string(),
        scope_id: Some("guild-1".to_string()),
    }
}
