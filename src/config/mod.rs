//! Configuration module for Placecrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving API credentials from the environment once at startup.
//!
//! # Example
//!
//! ```no_run
//! use placecrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("placecrawl.toml")).unwrap();
//! println!("Crawling '{}' in {}", config.crawler.category, config.crawler.country);
//! ```

mod credentials;
mod parser;
mod types;
mod validation;

pub use credentials::Credentials;
pub use types::{
    ApiConfig, ClientConfig, Config, CrawlerConfig, OutputConfig, MIN_PAGE_TOKEN_DELAY_MS,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
