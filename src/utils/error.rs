use thiserror::Error;

/// Why a single listing lookup produced no snapshot.
///
/// These are per-item and recoverable: the engine keeps the previous
/// snapshot and reports the failure to the operator.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Unexpected HTTP status: {status}")]
    Status { status: u16 },

    #[error("Unexpected response shape: {0}")]
    Shape(String),

    #[error("Listing {external_id} is not currently for sale")]
    NotForSale { external_id: String },

    #[error("Parsing error: {message}")]
    Parse { message: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FetchError::Status { status: status.as_u16() }
        } else if err.is_decode() {
            FetchError::Shape(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Listing {external_id} is already tracked")]
    AlreadyTracked { external_id: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Registry store {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },

    #[error("Registry IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        RegistryError::NotFound { resource: resource.into() }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Notifier error: {notifier}: {message}")]
    Notifier { notifier: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Engine fault: {0}")]
    Engine(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
