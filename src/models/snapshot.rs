use chrono::{DateTime, Utc};
use serde::Serialize;

/// Price state of a listing at one observation.
///
/// Snapshots are immutable once built; a new fetch replaces the whole value.
/// `on_sale` is derived from the discount so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSnapshot {
    display_name: String,
    initial_price_minor: i64,
    final_price_minor: i64,
    initial_formatted: String,
    final_formatted: String,
    on_sale: bool,
    discount_percent: u8,
    fetched_at: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn new(
        display_name: impl Into<String>,
        initial_price_minor: i64,
        final_price_minor: i64,
        initial_formatted: impl Into<String>,
        final_formatted: impl Into<String>,
        discount_percent: i64,
    ) -> Self {
        let discount_percent = discount_percent.clamp(0, 100) as u8;
        Self {
            display_name: display_name.into(),
            initial_price_minor,
            final_price_minor,
            initial_formatted: initial_formatted.into(),
            final_formatted: final_formatted.into(),
            on_sale: discount_percent > 0,
            discount_percent,
            fetched_at: Utc::now(),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn initial_price_minor(&self) -> i64 {
        self.initial_price_minor
    }

    pub fn final_price_minor(&self) -> i64 {
        self.final_price_minor
    }

    pub fn initial_formatted(&self) -> &str {
        &self.initial_formatted
    }

    pub fn final_formatted(&self) -> &str {
        &self.final_formatted
    }

    pub fn on_sale(&self) -> bool {
        self.on_sale
    }

    pub fn discount_percent(&self) -> u8 {
        self.discount_percent
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Whether two observations differ in the value that drives notifications.
    pub fn price_differs(&self, other: &PriceSnapshot) -> bool {
        self.final_price_minor != other.final_price_minor
    }
}
