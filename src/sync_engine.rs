use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::Instrument;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::models::{ChangeRecord, PriceSnapshot, TrackedItem};
use crate::plugins::{ListingFetcher, Notifier};
use crate::registry::Registry;
use crate::utils::error::{AppError, FetchError, RegistryError};

/// Outcome of one synchronization pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass_id: Uuid,
    /// Detected changes, in registry order.
    pub changes: Vec<ChangeRecord>,
    pub checked: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Per-item results of a batch removal. The outer error is a failed write.
pub type RemovalResults = Result<Vec<Result<TrackedItem, RegistryError>>, RegistryError>;

/// Owns the registry and the catalog and keeps them in step.
///
/// The registry mutex is the coarse lock: it serializes subscription changes
/// against the id snapshot a pass takes, and is never held while a request is
/// in flight. When both locks are needed the registry is taken first.
pub struct SyncEngine {
    registry: Mutex<Registry>,
    catalog: RwLock<Catalog>,
    fetcher: Arc<dyn ListingFetcher>,
    notifier: Arc<dyn Notifier>,
    max_concurrent: usize,
}

impl SyncEngine {
    pub fn new(
        registry: Registry,
        fetcher: Arc<dyn ListingFetcher>,
        notifier: Arc<dyn Notifier>,
        max_concurrent: usize,
    ) -> Self {
        let mut catalog = Catalog::new();
        for item in registry.list(|_| true) {
            catalog.insert_absent(&item.external_id);
        }

        Self {
            registry: Mutex::new(registry),
            catalog: RwLock::new(catalog),
            fetcher,
            notifier,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetch every tracked listing once and fold the results into the catalog.
    pub async fn run_pass(&self) -> Result<PassReport, AppError> {
        let pass_id = Uuid::new_v4();
        let span = tracing::info_span!("sync_pass", %pass_id);
        self.run_pass_inner(pass_id).instrument(span).await
    }

    /// The changes-only view of [`run_pass`](Self::run_pass).
    pub async fn sync_all(&self) -> Result<Vec<ChangeRecord>, AppError> {
        Ok(self.run_pass().await?.changes)
    }

    async fn run_pass_inner(&self, pass_id: Uuid) -> Result<PassReport, AppError> {
        let started = Instant::now();
        let items = self.registry.lock().await.list(|_| true);
        tracing::debug!("Checking {} tracked listings", items.len());

        let fetcher = &self.fetcher;
        let outcomes: Vec<(TrackedItem, Result<PriceSnapshot, FetchError>)> = stream::iter(items)
            .map(|item| async move {
                let outcome = fetcher.fetch(&item.external_id, item.kind).await;
                (item, outcome)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let checked = outcomes.len();
        let mut changes = Vec::new();
        let mut failures = Vec::new();
        {
            let mut catalog = self.catalog.write().await;
            for (item, outcome) in outcomes {
                match outcome {
                    Ok(snapshot) => {
                        tracing::debug!(
                            "{} {} at {}",
                            item.kind,
                            item.external_id,
                            snapshot.final_formatted()
                        );
                        if let Some(change) = catalog.merge(&item, Ok(snapshot)) {
                            changes.push(change);
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Failed to fetch {} {}: {}", item.kind, item.external_id, err);
                        catalog.merge(&item, Err(&err));
                        failures.push((item, err));
                    }
                }
            }
        }

        for (item, err) in &failures {
            let message = format!(
                "Failed to fetch {} {}: {}",
                item.kind, item.external_id, err
            );
            if let Err(e) = self.notifier.notify_operator(&message).await {
                tracing::error!("Could not escalate fetch failure for {}: {}", item.external_id, e);
            }
        }

        let elapsed = started.elapsed();
        metrics::counter!("watcher_passes_total").increment(1);
        metrics::counter!("watcher_fetch_failures_total").increment(failures.len() as u64);
        metrics::counter!("watcher_changes_total").increment(changes.len() as u64);
        metrics::histogram!("watcher_pass_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            "Pass finished: {} checked, {} failed, {} changed in {:?}",
            checked,
            failures.len(),
            changes.len(),
            elapsed
        );

        Ok(PassReport {
            pass_id,
            changes,
            checked,
            failed: failures.len(),
            elapsed,
        })
    }

    /// One-shot lookup outside of any pass. Leaves the catalog alone.
    pub async fn fetch_one(&self, item: &TrackedItem) -> Result<PriceSnapshot, FetchError> {
        self.fetcher.fetch(&item.external_id, item.kind).await
    }

    /// Start tracking `item`. Its first pass only records a baseline.
    pub async fn track(&self, item: TrackedItem) -> Result<(), RegistryError> {
        let mut registry = self.registry.lock().await;
        let external_id = item.external_id.clone();
        registry.add(item).await?;
        self.catalog.write().await.insert_absent(&external_id);
        tracing::info!("Now tracking {}", external_id);
        Ok(())
    }

    pub async fn untrack(&self, external_id: &str) -> Result<TrackedItem, RegistryError> {
        let mut registry = self.registry.lock().await;
        let item = registry.remove(external_id).await?;
        self.catalog.write().await.remove(external_id);
        tracing::info!("Stopped tracking {}", external_id);
        Ok(item)
    }

    pub async fn untrack_many(&self, external_ids: &[String]) -> RemovalResults {
        let mut registry = self.registry.lock().await;
        self.remove_locked(&mut registry, external_ids).await
    }

    /// Remove by position among the items matching `predicate`.
    ///
    /// Positions are 0-based and resolved under the same lock as the removal,
    /// so a concurrent change cannot shift them. A position past the end is
    /// `NotFound`.
    pub async fn untrack_positions<F>(&self, predicate: F, positions: &[usize]) -> RemovalResults
    where
        F: Fn(&TrackedItem) -> bool,
    {
        let mut registry = self.registry.lock().await;
        let listing = registry.list(predicate);

        let mut ids = Vec::new();
        let mut out_of_range = Vec::new();
        for (slot, position) in positions.iter().enumerate() {
            match listing.get(*position) {
                Some(item) => ids.push((slot, item.external_id.clone())),
                None => out_of_range.push(slot),
            }
        }

        let just_ids: Vec<String> = ids.iter().map(|(_, id)| id.clone()).collect();
        let removed = self.remove_locked(&mut registry, &just_ids).await?;

        let mut results: Vec<Option<Result<TrackedItem, RegistryError>>> =
            positions.iter().map(|_| None).collect();
        for ((slot, _), outcome) in ids.into_iter().zip(removed) {
            results[slot] = Some(outcome);
        }
        for slot in out_of_range {
            results[slot] = Some(Err(RegistryError::not_found(format!(
                "listing #{}",
                positions[slot]
            ))));
        }

        Ok(results.into_iter().flatten().collect())
    }

    async fn remove_locked(&self, registry: &mut Registry, external_ids: &[String]) -> RemovalResults {
        let outcomes = registry.remove_many(external_ids).await?;

        let mut catalog = self.catalog.write().await;
        for item in outcomes.iter().flatten() {
            catalog.remove(&item.external_id);
            tracing::info!("Stopped tracking {}", item.external_id);
        }
        Ok(outcomes)
    }

    pub async fn tracked<F>(&self, predicate: F) -> Vec<TrackedItem>
    where
        F: Fn(&TrackedItem) -> bool,
    {
        self.registry.lock().await.list(predicate)
    }

    pub async fn tracked_item(&self, external_id: &str) -> Option<TrackedItem> {
        self.registry.lock().await.get(external_id).cloned()
    }

    /// Matching items with their last known snapshot, in registry order.
    pub async fn tracked_with_snapshots<F>(&self, predicate: F) -> Vec<(TrackedItem, Option<PriceSnapshot>)>
    where
        F: Fn(&TrackedItem) -> bool,
    {
        let registry = self.registry.lock().await;
        let catalog = self.catalog.read().await;
        registry
            .list(predicate)
            .into_iter()
            .map(|item| {
                let snapshot = catalog.snapshot(&item.external_id).cloned();
                (item, snapshot)
            })
            .collect()
    }

    pub async fn snapshot_of(&self, external_id: &str) -> Option<PriceSnapshot> {
        self.catalog.read().await.snapshot(external_id).cloned()
    }

    pub async fn failure_count(&self, external_id: &str) -> u32 {
        self.catalog.read().await.failure_count(external_id)
    }
}
