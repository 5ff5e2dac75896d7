use async_trait::async_trait;

use crate::models::{ListingKind, PriceSnapshot};
use crate::utils::error::FetchError;

/// Source of current pricing for a single listing.
///
/// Implementations return a complete snapshot or a typed failure, never a
/// partially filled snapshot, and never retry on their own.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    async fn fetch(&self, external_id: &str, kind: ListingKind) -> Result<PriceSnapshot, FetchError>;
}
