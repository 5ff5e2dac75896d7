use std::sync::Arc;
use validator::Validate;

use crate::models::{ListingRef, NewListing, PriceSnapshot, TrackedItem};
use crate::plugins::ListingResolver;
use crate::scheduler::Scheduler;
use crate::sync_engine::SyncEngine;
use crate::utils::error::{AppError, FetchError, RegistryError};

/// One entry per requested index, in request order.
pub type Removed = Vec<Result<TrackedItem, RegistryError>>;

/// What happened to a registration request.
#[derive(Debug)]
pub enum AddOutcome {
    /// Tracked from now on. `snapshot` is the lookup that confirmed the listing.
    Added { item: TrackedItem, snapshot: PriceSnapshot },
    /// Someone already tracks this listing; their subscription is unchanged.
    AlreadyTracked { existing: TrackedItem },
    /// The listing could not be looked up, so nothing was registered.
    Unavailable { error: FetchError },
}

/// Entry point for a command front end.
pub struct ListingManager {
    engine: Arc<SyncEngine>,
    scheduler: Arc<Scheduler>,
    resolver: Option<Arc<dyn ListingResolver>>,
}

impl ListingManager {
    pub fn new(engine: Arc<SyncEngine>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            engine,
            scheduler,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ListingResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Validate, confirm the listing exists with one lookup, then track it.
    ///
    /// The confirming lookup is returned to the caller but not recorded, so
    /// the first scheduled pass still only sets a baseline.
    pub async fn register_listing(&self, request: NewListing) -> crate::Result<AddOutcome> {
        request.validate()?;
        let item = request.into_item();

        if let Some(existing) = self.engine.tracked_item(&item.external_id).await {
            return Ok(AddOutcome::AlreadyTracked { existing });
        }

        let snapshot = match self.engine.fetch_one(&item).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::info!("Not registering {} {}: {}", item.kind, item.external_id, error);
                return Ok(AddOutcome::Unavailable { error });
            }
        };

        match self.engine.track(item.clone()).await {
            Ok(()) => Ok(AddOutcome::Added { item, snapshot }),
            // Lost a race with another registration of the same listing.
            Err(RegistryError::AlreadyTracked { external_id }) => match self.engine.tracked_item(&external_id).await {
                Some(existing) => Ok(AddOutcome::AlreadyTracked { existing }),
                None => Err(RegistryError::AlreadyTracked { external_id }.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Register from a store link or a free-text query.
    ///
    /// Links are parsed directly. Anything else goes through the resolver and
    /// the first candidate is used.
    pub async fn resolve_and_register(
        &self,
        query: &str,
        owner_id: &str,
        delivery_target: &str,
        scope_id: Option<&str>,
    ) -> crate::Result<AddOutcome> {
        let listing = match ListingRef::from_store_url(query) {
            Some(listing) => listing,
            None => self.resolve_first(query).await?,
        };

        self.register_listing(NewListing {
            external_id: listing.external_id,
            kind: listing.kind,
            owner_id: owner_id.to_string(),
            delivery_target: delivery_target.to_string(),
            scope_id: scope_id.map(str::to_string),
        })
        .await
    }

    async fn resolve_first(&self, query: &str) -> crate::Result<ListingRef> {
        let resolver = self
            .resolver
            .as_ref()
            .ok_or_else(|| AppError::Validation(format!("'{}' is not a store link and no resolver is configured", query)))?;

        let candidate = resolver
            .resolve(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::not_found(format!("listing matching '{}'", query)))?;

        tracing::debug!("Resolved '{}' to {}", query, candidate.title);
        Ok(candidate.listing)
    }

    /// Remove by 0-based position in the owner's listing, across all scopes.
    pub async fn unregister_listings(&self, owner_id: &str, indices: &[usize]) -> crate::Result<Removed> {
        let removed = self
            .engine
            .untrack_positions(|item| item.is_owned_by(owner_id), indices)
            .await?;
        Ok(removed)
    }

    /// Administrator removal by 0-based position in the whole registry.
    pub async fn unregister_any(&self, indices: &[usize]) -> crate::Result<Removed> {
        Ok(self.engine.untrack_positions(|_| true, indices).await?)
    }

    /// The owner's listings with prices from a fresh pass.
    ///
    /// If the pass fails the last known prices are returned instead.
    pub async fn list_tracked(&self, owner_id: &str, scope_id: Option<&str>) -> Vec<(TrackedItem, Option<PriceSnapshot>)> {
        self.refresh().await;
        self.engine
            .tracked_with_snapshots(|item| item.is_owned_by(owner_id) && item.in_scope(scope_id))
            .await
    }

    pub async fn list_all(&self, scope_id: Option<&str>) -> Vec<(TrackedItem, Option<PriceSnapshot>)> {
        self.refresh().await;
        self.engine
            .tracked_with_snapshots(|item| item.in_scope(scope_id))
            .await
    }

    async fn refresh(&self) {
        if let Err(e) = self.scheduler.sync_now().await {
            tracing::warn!("Listing with stale prices, refresh failed: {}", e);
        }
    }
}
