pub mod bundle;
pub mod storefront;

pub use storefront::StorefrontFetcher;
