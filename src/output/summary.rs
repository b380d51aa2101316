//! Run summary counters and the end-of-run console report

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// How a single region ended
#[derive(Debug, Clone, PartialEq)]
pub enum RegionOutcome {
    /// Region file written with this many records
    Saved { records: usize, path: PathBuf },
    /// Region file already present from an earlier run
    Skipped,
    /// The geocoder had no usable area for the name
    NotFound,
    /// Resolution or paging failed; the message is the error text
    Failed(String),
    /// Quota ran out or the run was cancelled mid-region; nothing was saved
    Interrupted,
}

impl fmt::Display for RegionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { records, path } => {
                write!(f, "saved {} records to {}", records, path.display())
            }
            Self::Skipped => f.write_str("skipped (already crawled)"),
            Self::NotFound => f.write_str("not found"),
            Self::Failed(message) => write!(f, "failed: {}", message),
            Self::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Counters for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    pub regions_attempted: usize,
    pub regions_saved: usize,
    pub regions_skipped: usize,
    pub regions_not_found: usize,
    pub regions_failed: usize,

    /// Nearby-search pages fetched across all regions
    pub pages: u32,

    /// Candidates returned by paging, before dedup
    pub candidates: usize,

    /// Candidates dropped because their place id was already seen in the region
    pub duplicate_candidates: usize,

    /// Records that made it into a region file
    pub records: usize,

    /// Candidates whose detail lookup came back empty
    pub dropped_candidates: usize,

    /// Candidates skipped after a detail request error
    pub detail_errors: usize,

    pub master_added: usize,
    pub master_skipped: usize,

    pub quota_exhausted: bool,
    pub cancelled: bool,

    /// Per-region outcomes, in processing order
    pub regions: Vec<(String, RegionOutcome)>,
}

impl CrawlSummary {
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            regions_attempted: 0,
            regions_saved: 0,
            regions_skipped: 0,
            regions_not_found: 0,
            regions_failed: 0,
            pages: 0,
            candidates: 0,
            duplicate_candidates: 0,
            records: 0,
            dropped_candidates: 0,
            detail_errors: 0,
            master_added: 0,
            master_skipped: 0,
            quota_exhausted: false,
            cancelled: false,
            regions: Vec::new(),
        }
    }

    /// Records a region's outcome and bumps the matching counter
    pub fn record_region(&mut self, region: &str, outcome: RegionOutcome) {
        match &outcome {
            RegionOutcome::Saved { records, .. } => {
                self.regions_saved += 1;
                self.records += records;
            }
            RegionOutcome::Skipped => self.regions_skipped += 1,
            RegionOutcome::NotFound => self.regions_not_found += 1,
            RegionOutcome::Failed(_) => self.regions_failed += 1,
            RegionOutcome::Interrupted => {}
        }
        self.regions.push((region.to_string(), outcome));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// True when at least one region ended with a file on disk
    pub fn produced_output(&self) -> bool {
        self.regions_saved + self.regions_skipped > 0
    }
}

/// Prints the run summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ({}) ===\n", summary.category);

    if let Some(secs) = summary.duration_seconds() {
        println!("Duration: {}s", secs);
    }
    if summary.quota_exhausted {
        println!("Stopped early: API quota exhausted");
    } else if summary.cancelled {
        println!("Stopped early: cancelled");
    }
    println!();

    println!("Regions:");
    println!("  Attempted: {}", summary.regions_attempted);
    println!("  Saved: {}", summary.regions_saved);
    println!("  Skipped: {}", summary.regions_skipped);
    println!("  Not found: {}", summary.regions_not_found);
    println!("  Failed: {}", summary.regions_failed);
    println!();

    println!("Listings:");
    println!("  Pages fetched: {}", summary.pages);
    println!("  Candidates: {}", summary.candidates);
    println!("  Duplicate candidates: {}", summary.duplicate_candidates);
    println!("  Records saved: {}", summary.records);
    println!("  Dropped (no details): {}", summary.dropped_candidates);
    println!("  Detail errors: {}", summary.detail_errors);
    println!();

    println!("Master set:");
    println!("  Added: {}", summary.master_added);
    println!("  Already present: {}", summary.master_skipped);

    if !summary.regions.is_empty() {
        println!();
        for (name, outcome) in &summary.regions {
            println!("  - {}: {}", name, outcome);
        }
    }
}
