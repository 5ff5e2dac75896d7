pub mod fetcher;
pub mod notifier;
pub mod resolver;

pub use fetcher::ListingFetcher;
pub use notifier::Notifier;
pub use resolver::ListingResolver;
