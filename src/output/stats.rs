//! Statistics over the master result set
//!
//! This module provides functionality for extracting and displaying
//! totals from the persisted master set.

use crate::storage::ResultStore;
use crate::HarvestError;
use serde_json::Value;

/// Master set statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterStatistics {
    /// Total entries in the master set
    pub total_records: u64,

    /// Entries without a usable `title` (preserved, but never deduplicated)
    pub untitled_records: u64,

    pub with_phone: u64,
    pub with_website: u64,
    pub with_rating: u64,

    /// Mean of all numeric ratings, if any
    pub mean_rating: Option<f64>,
}

/// Loads statistics from the store's master set
///
/// # Arguments
///
/// * `store` - The result store to read
///
/// # Returns
///
/// * `Ok(MasterStatistics)` - Totals over the master set (zeroes when absent)
/// * `Err(HarvestError)` - Failed to read the master file
pub fn load_master_statistics(store: &dyn ResultStore) -> Result<MasterStatistics, HarvestError> {
    let entries = store.load_master()?;
    Ok(compute_statistics(&entries))
}

fn compute_statistics(entries: &[Value]) -> MasterStatistics {
    let mut stats = MasterStatistics {
        total_records: entries.len() as u64,
        ..MasterStatistics::default()
    };
    let mut rating_sum = 0.0;

    for entry in entries {
        let has_text = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty())
        };

        if !has_text("title") {
            stats.untitled_records += 1;
        }
        if has_text("international_phone_number") {
            stats.with_phone += 1;
        }
        if has_text("website") {
            stats.with_website += 1;
        }
        if let Some(rating) = entry.get("rating").and_then(Value::as_f64) {
            stats.with_rating += 1;
            rating_sum += rating;
        }
    }

    if stats.with_rating > 0 {
        stats.mean_rating = Some(rating_sum / stats.with_rating as f64);
    }
    stats
}

/// Prints statistics to stdout in a formatted manner
pub fn print_master_statistics(stats: &MasterStatistics) {
    println!("=== Master Result Set ===\n");

    println!("  Total records: {}", stats.total_records);
    if stats.untitled_records > 0 {
        println!("  Without title: {}", stats.untitled_records);
    }
    println!();

    println!("Coverage:");
    for (label, count) in [
        ("Phone", stats.with_phone),
        ("Website", stats.with_website),
        ("Rating", stats.with_rating),
    ] {
        let percentage = if stats.total_records > 0 {
            (count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    match stats.mean_rating {
        Some(mean) => println!("Mean rating: {:.2}", mean),
        None => println!("Mean rating: n/a"),
    }
}
