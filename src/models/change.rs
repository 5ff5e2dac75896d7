use serde::Serialize;

use crate::models::{PriceSnapshot, TrackedItem};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ChangeType {
    Increased,
    Decreased,
    Unchanged,
}

/// A detected final-price change for one tracked listing.
///
/// The subscription travels with the record so a notifier knows where to
/// deliver it and whom to mention.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub item: TrackedItem,
    pub old: PriceSnapshot,
    pub new: PriceSnapshot,
}

impl ChangeRecord {
    pub fn external_id(&self) -> &str {
        &self.item.external_id
    }

    pub fn change_type(&self) -> ChangeType {
        use std::cmp::Ordering;
        match self.new.final_price_minor().cmp(&self.old.final_price_minor()) {
            Ordering::Greater => ChangeType::Increased,
            Ordering::Less => ChangeType::Decreased,
            Ordering::Equal => ChangeType::Unchanged,
        }
    }
}
