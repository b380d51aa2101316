//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Counting what a run did, region by region
//! - Printing the end-of-run summary
//! - Computing and printing master set statistics

pub mod stats;
mod summary;

pub use stats::{load_master_statistics, print_master_statistics, MasterStatistics};
pub use summary::{print_summary, CrawlSummary, RegionOutcome};
