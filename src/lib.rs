//! Placecrawl: a geo-partitioned business listing crawler
//!
//! This crate turns loosely specified areas (district or city names) into bounded
//! search regions, pages through a places API for a business category, enriches
//! each hit with a detail lookup, and persists deduplicated results so a run can
//! be interrupted and resumed.

pub mod config;
pub mod crawler;
pub mod geo;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Placecrawl operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No geocoding result for '{query}'")]
    NotFound { query: String },

    #[error("Region '{region}' has a degenerate viewport (radius {radius_meters} m)")]
    InvalidGeometry { region: String, radius_meters: f64 },

    #[error("HTTP error for {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("Upstream returned HTTP {status} for {endpoint}")]
    Upstream { endpoint: String, status: u16 },

    #[error("Upstream status {status} for {endpoint}: {message}")]
    ApiStatus {
        endpoint: String,
        status: crawler::ApiStatus,
        message: String,
    },

    #[error("API quota exhausted at {endpoint}")]
    QuotaExhausted { endpoint: String },

    #[error("JSON decode error for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid pager transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PagerState,
        to: state::PagerState,
    },

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("No region produced output ({attempted} attempted)")]
    NoRegionsProduced { attempted: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// True for conditions that end the whole run rather than one region
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::QuotaExhausted { .. } | Self::Cancelled | Self::Config(_)
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

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),
}

/// Result type alias for Placecrawl operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use crawler::DiscoveryCrawler;
pub use geo::{haversine_distance, LatLng, Region, Viewport};
pub use storage::{BusinessRecord, JsonResultStore, ResultStore};
