//! Crawl coordinator - region-by-region orchestration
//!
//! This module contains the main crawl loop, which for each region name in order:
//! - Skips regions whose file already exists (unless running fresh)
//! - Resolves the name to a search region
//! - Drains the nearby-search pager into candidates
//! - Looks up details for each distinct candidate
//! - Saves the region file and merges new records into the master set
//!
//! Per-region and per-candidate failures are logged and skipped. Quota exhaustion
//! and cancellation stop the run without saving the region in progress.

use crate::config::Config;
use crate::crawler::client::PlacesClient;
use crate::crawler::details::DetailFetcher;
use crate::crawler::pager::PlacesPager;
use crate::crawler::types::Candidate;
use crate::geo::GeoResolver;
use crate::output::{CrawlSummary, RegionOutcome};
use crate::storage::{merge_in_background, BusinessRecord, ResultStore};
use crate::HarvestError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Orchestrates resolver, pager, detail fetcher and store over a batch of regions
pub struct DiscoveryCrawler<S: ResultStore> {
    config: Arc<Config>,
    client: Arc<PlacesClient>,
    resolver: GeoResolver,
    details: DetailFetcher,
    store: S,
    cancel: CancellationToken,
    fresh: bool,
}

impl<S> DiscoveryCrawler<S>
where
    S: ResultStore + Clone + Send + 'static,
{
    /// Creates a crawler with its own places client
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `api_key` - The places API key, resolved once at startup
    /// * `store` - Where region files and the master set live
    pub fn new(config: Config, api_key: &str, store: S) -> Result<Self, HarvestError> {
        let client = Arc::new(PlacesClient::new(&config, api_key)?);
        Ok(Self::with_client(config, client, store))
    }

    /// Creates a crawler around an existing client
    pub fn with_client(config: Config, client: Arc<PlacesClient>, store: S) -> Self {
        Self {
            config: Arc::new(config),
            resolver: GeoResolver::new(Arc::clone(&client)),
            details: DetailFetcher::new(Arc::clone(&client)),
            client,
            store,
            cancel: CancellationToken::new(),
            fresh: false,
        }
    }

    /// Uses `token` for cooperative cancellation instead of a private one
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Re-crawls regions even when their file already exists
    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls every region in order
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - counts for the run; check `quota_exhausted` and
    ///   `cancelled` for an early stop
    /// * `Err(HarvestError::NoRegionsProduced)` - regions were attempted but none
    ///   produced a region file
    pub async fn run(&self, regions: &[String], category: &str) -> Result<CrawlSummary, HarvestError> {
        let mut summary = CrawlSummary::new(category);
        let skip_completed = self.config.crawler.skip_completed_regions && !self.fresh;

        tracing::info!(
            "Crawling {} region(s) for '{}' in {}",
            regions.len(),
            category,
            self.config.crawler.country
        );

        for name in regions {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            summary.regions_attempted += 1;

            if skip_completed && self.store.region_exists(name, category) {
                tracing::info!("Skipping '{}': region file already exists", name);
                summary.record_region(name, RegionOutcome::Skipped);
                continue;
            }

            match self.crawl_region(name, category, &mut summary).await {
                Ok(outcome) => summary.record_region(name, outcome),
                Err(HarvestError::QuotaExhausted { endpoint }) => {
                    tracing::error!(
                        "API quota exhausted at {} while crawling '{}'; stopping run",
                        endpoint,
                        name
                    );
                    summary.quota_exhausted = true;
                    summary.record_region(name, RegionOutcome::Interrupted);
                    break;
                }
                Err(HarvestError::Cancelled) => {
                    tracing::warn!("Cancelled while crawling '{}'; region not saved", name);
                    summary.cancelled = true;
                    summary.record_region(name, RegionOutcome::Interrupted);
                    break;
                }
                Err(e) => {
                    tracing::warn!("Region '{}' failed: {}", name, e);
                    summary.record_region(name, RegionOutcome::Failed(e.to_string()));
                }
            }
        }

        summary.finish();
        tracing::info!(
            "Run finished: {} saved, {} skipped, {} not found, {} failed, {} new master records",
            summary.regions_saved,
            summary.regions_skipped,
            summary.regions_not_found,
            summary.regions_failed,
            summary.master_added
        );

        let interrupted = summary.quota_exhausted || summary.cancelled;
        if summary.regions_attempted > 0 && !interrupted && !summary.produced_output() {
            return Err(HarvestError::NoRegionsProduced {
                attempted: summary.regions_attempted,
            });
        }
        Ok(summary)
    }

    /// Crawls one region
    ///
    /// Returns the region's outcome for anything the batch survives; run-fatal
    /// errors (quota, cancellation) and unrecoverable region errors are `Err`.
    async fn crawl_region(
        &self,
        name: &str,
        category: &str,
        summary: &mut CrawlSummary,
    ) -> Result<RegionOutcome, HarvestError> {
        let region = match self.resolver.resolve(name, &self.config.crawler.country).await {
            Ok(region) => region,
            Err(HarvestError::NotFound { query }) => {
                tracing::warn!("No geocoding result for '{}'; skipping region", query);
                return Ok(RegionOutcome::NotFound);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "Region '{}': center {:.5},{:.5}, radius {:.0}m",
            name,
            region.center().lat,
            region.center().lng,
            region.radius_meters()
        );

        let pager = PlacesPager::new(
            Arc::clone(&self.client),
            &region,
            category,
            Duration::from_millis(self.config.crawler.page_token_delay_ms),
            self.config.crawler.max_pages_per_region,
            self.cancel.clone(),
        );
        let drained = pager.drain().await;
        summary.pages += drained.pages;
        summary.candidates += drained.candidates.len();

        if let Some(e) = drained.error {
            if e.is_run_fatal() || drained.pages == 0 {
                return Err(e);
            }
            tracing::warn!(
                "Paging for '{}' stopped after {} page(s): {}; keeping partial results",
                name,
                drained.pages,
                e
            );
        }

        let (candidates, duplicates) = dedup_candidates(drained.candidates);
        summary.duplicate_candidates += duplicates;

        let records = self.fetch_details(&candidates, summary).await?;

        let path = self.store.save_region(name, category, &records)?;
        tracing::info!(
            "Saved {} records for '{}' to {}",
            records.len(),
            name,
            path.display()
        );

        if self.config.crawler.merge_into_master {
            match merge_in_background(&self.store, records.clone()).await {
                Ok(outcome) => {
                    summary.master_added += outcome.added;
                    summary.master_skipped += outcome.skipped;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to merge '{}' into master set: {} (region file kept; rerun with --merge)",
                        name,
                        e
                    );
                }
            }
        }

        Ok(RegionOutcome::Saved {
            records: records.len(),
            path,
        })
    }

    async fn fetch_details(
        &self,
        candidates: &[Candidate],
        summary: &mut CrawlSummary,
    ) -> Result<Vec<BusinessRecord>, HarvestError> {
        let mut records = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if self.cancel.is_cancelled() {
                return Err(HarvestError::Cancelled);
            }

            match self.details.fetch(candidate).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => summary.dropped_candidates += 1,
                Err(e) if e.is_run_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Detail lookup failed for {}: {}",
                        candidate.place_id.as_deref().unwrap_or("<no place_id>"),
                        e
                    );
                    summary.detail_errors += 1;
                }
            }
        }

        Ok(records)
    }
}

/// Drops candidates whose place id was already seen, keeping API order
///
/// Candidates without a place id are kept; the detail fetcher drops them.
fn dedup_candidates(candidates: Vec<Candidate>) -> (Vec<Candidate>, usize) {
    let mut seen = HashSet::new();
    let before = candidates.len();
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| match &c.place_id {
            Some(id) => seen.insert(id.clone()),
            None => true,
        })
        .collect();
    let duplicates = before - kept.len();
    (kept, duplicates)
}
