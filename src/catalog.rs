use std::collections::HashMap;

use crate::models::{ChangeRecord, PriceSnapshot, TrackedItem};
use crate::utils::error::FetchError;

#[derive(Debug, Clone, Default)]
struct CatalogEntry {
    snapshot: Option<PriceSnapshot>,
    consecutive_failures: u32,
}

/// Last known price of every tracked listing.
///
/// Keys mirror the registry: an id is present here exactly when it is
/// tracked. A present key with no snapshot means the listing has not been
/// observed successfully yet.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `external_id` with no observation yet.
    pub fn insert_absent(&mut self, external_id: &str) {
        self.entries.entry(external_id.to_string()).or_default();
    }

    pub fn remove(&mut self, external_id: &str) -> Option<PriceSnapshot> {
        self.entries.remove(external_id).and_then(|entry| entry.snapshot)
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.entries.contains_key(external_id)
    }

    pub fn snapshot(&self, external_id: &str) -> Option<&PriceSnapshot> {
        self.entries.get(external_id).and_then(|entry| entry.snapshot.as_ref())
    }

    pub fn failure_count(&self, external_id: &str) -> u32 {
        self.entries
            .get(external_id)
            .map(|entry| entry.consecutive_failures)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold one fetch outcome into the catalog.
    ///
    /// Returns a record only when a previous snapshot existed and the final
    /// price moved. The first observation is a baseline. A failure keeps the
    /// previous snapshot as is. Outcomes for ids that are no longer tracked
    /// are dropped.
    pub fn merge(
        &mut self,
        item: &TrackedItem,
        outcome: Result<PriceSnapshot, &FetchError>,
    ) -> Option<ChangeRecord> {
        let entry = self.entries.get_mut(&item.external_id)?;

        let new = match outcome {
            Ok(snapshot) => snapshot,
            Err(_) => {
                entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
                return None;
            }
        };

        entry.consecutive_failures = 0;
        match entry.snapshot.replace(new.clone()) {
            Some(old) if old.price_differs(&new) => Some(ChangeRecord {
                item: item.clone(),
                old,
                new,
            }),
            _ => None,
        }
    }
}
