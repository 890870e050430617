//! Listing crawler
//!
//! Harvests listing links from paginated real-estate search results, visits
//! each listing with a headless browser and appends the extracted attributes
//! to a CSV table. Output can be mirrored to a storage bucket at the end of
//! a run.

pub mod address;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod scrapers;
pub mod storage;
pub mod sync;

use thiserror::Error;

/// Errors raised while driving the browser or persisting scraped data
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("timed out waiting for {what} on {url}")]
    Timeout { url: String, what: String },

    #[error("no price or address found on {url}")]
    EmptyRecord { url: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: ::url::ParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ScrapeError {
    /// Whether the detail extractor should retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::Navigation { .. }
                | ScrapeError::Timeout { .. }
                | ScrapeError::EmptyRecord { .. }
                | ScrapeError::Browser(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown target '{0}'")]
    UnknownTarget(String),
}

/// Result type alias for scraping operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

pub use address::parse_address;
pub use config::Config;
pub use models::{AddressComponents, ListingRecord, SearchTarget};
