pub mod catalog;
pub mod config;
pub mod listing_manager;
pub mod models;
pub mod plugins;
pub mod registry;
pub mod scheduler;
pub mod sync_engine;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use listing_manager::{AddOutcome, ListingManager};
pub use scheduler::{Scheduler, SchedulerState};
pub use sync_engine::{PassReport, SyncEngine};
pub use utils::error::{AppError, Result};
