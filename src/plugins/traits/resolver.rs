use async_trait::async_trait;

use crate::models::CandidateListing;
use crate::utils::error::AppError;

/// Turns a free-text query into candidate listings, best match first.
///
/// The search-page heuristics live with the front end; the watcher only
/// consumes the result.
#[async_trait]
pub trait ListingResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Vec<CandidateListing>, AppError>;
}
