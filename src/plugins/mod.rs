pub mod fetchers;
pub mod notifiers;
pub mod traits;

pub use fetchers::StorefrontFetcher;
pub use notifiers::{DiscordNotifier, LogNotifier};
pub use traits::{ListingFetcher, ListingResolver, Notifier};
