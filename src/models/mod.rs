use serde::{Deserialize, Serialize};
use std::fmt;

pub mod change;
pub mod listing;
pub mod snapshot;
pub mod tracked_item;

// Re-exports for convenience
pub use change::*;
pub use listing::*;
pub use snapshot::*;
pub use tracked_item::*;

/// The storefront's listing flavours. Each has its own lookup path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ListingKind {
    /// A single product, the storefront's "app".
    #[serde(rename = "app")]
    Single,
    /// A fixed package of products, the storefront's "sub".
    #[serde(rename = "package", alias = "sub")]
    Package,
    /// A discounted bundle of products. Only available as an HTML page.
    #[serde(rename = "bundle")]
    Bundle,
}

impl ListingKind {
    /// Path segment used by store page URLs.
    pub fn store_segment(&self) -> &'static str {
        match self {
            ListingKind::Single => "app",
            ListingKind::Package => "sub",
            ListingKind::Bundle => "bundle",
        }
    }

    pub fn from_store_segment(segment: &str) -> Option<Self> {
        match segment {
            "app" => Some(ListingKind::Single),
            "sub" | "package" => Some(ListingKind::Package),
            "bundle" => Some(ListingKind::Bundle),
            _ => None,
        }
    }

    /// Public store page for a listing, e.g. `https://store.steampowered.com/app/620`.
    pub fn store_url(&self, base_url: &str, external_id: &str) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.store_segment(),
            external_id
        )
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ListingKind::Single => "single",
            ListingKind::Package => "package",
            ListingKind::Bundle => "bundle",
        };
        f.write_str(label)
    }
}
