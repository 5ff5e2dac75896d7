use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use steam_watcher::config::{AppConfig, LoggingConfig};
use steam_watcher::plugins::{DiscordNotifier, LogNotifier, Notifier, StorefrontFetcher};
use steam_watcher::registry::Registry;
use steam_watcher::{Scheduler, SyncEngine};

#[derive(Parser, Debug)]
#[command(name = "steam-watcher", version, about = "Watches store listings and reports price changes")]
struct Args {
    /// Directory holding the default, per-mode and local config files
    #[arg(long, default_value = "config")]
    config: PathBuf,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = AppConfig::from_dir(&args.config).context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    info!("Starting Steam Watcher...");

    if config.metrics.enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics.port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install metrics exporter")?;
        info!("Serving metrics on {}", addr);
    }

    let registry = Registry::load(&config.registry.path)
        .await
        .with_context(|| format!("Failed to load registry {}", config.registry.path))?;

    let fetcher = Arc::new(StorefrontFetcher::new(config.storefront.clone())?);
    let notifier: Arc<dyn Notifier> = if config.notifications.discord.webhook_url.is_some() {
        Arc::new(DiscordNotifier::new(&config.notifications.discord, &config.storefront.base_url)?)
    } else {
        warn!("No Discord webhook configured, changes will only be logged");
        Arc::new(LogNotifier)
    };

    let engine = Arc::new(SyncEngine::new(
        registry,
        fetcher,
        Arc::clone(&notifier),
        config.sync.max_concurrent_fetches,
    ));
    let scheduler = Arc::new(Scheduler::new(engine, notifier, config.scheduler.clone()));

    if args.once {
        let report = scheduler.sync_now().await?;
        info!(
            "Single pass done: {} checked, {} failed, {} changed",
            report.checked,
            report.failed,
            report.changes.len()
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let scheduler_task = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    cancel.cancel();
    scheduler_task.await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("steam_watcher=info"));
    let subscriber = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "steam-watcher.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            subscriber
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            subscriber.try_init()?;
            Ok(None)
        }
    }
}
