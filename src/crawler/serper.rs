//! Single-city mode backed by the search-aggregator places endpoint
//!
//! One POST per city returns a flat list of places with contact fields already
//! attached, so there is no paging and no detail lookup. The results are saved
//! as a region file named after the city, like any other region.

use crate::config::Config;
use crate::crawler::client::build_http_client;
use crate::crawler::retry::{retry_with_backoff, RetryPolicy};
use crate::crawler::types::{SerperPlace, SerperPlacesResponse};
use crate::output::{CrawlSummary, RegionOutcome};
use crate::storage::{merge_in_background, BusinessRecord, ResultStore};
use crate::HarvestError;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use url::Url;

/// Aggregator places endpoint, relative to the aggregator base URL
pub const SERPER_PLACES_ENDPOINT: &str = "places";

/// Collects listings for one city through the aggregator
pub struct CityCollector {
    http: Client,
    api_key: String,
    base_url: Url,
    retry: RetryPolicy,
}

impl CityCollector {
    pub fn new(config: &Config, api_key: &str) -> Result<Self, HarvestError> {
        let http = build_http_client(&config.client)?;
        let retry = RetryPolicy {
            max_retries: config.crawler.max_retries,
            backoff_base_ms: config.crawler.backoff_base_ms,
        };
        Self::with_http_client(http, api_key, &config.api.serper_base_url, retry)
    }

    pub fn with_http_client(
        http: Client,
        api_key: &str,
        base_url: &str,
        retry: RetryPolicy,
    ) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url,
            retry,
        })
    }

    /// Queries `"<category> in <city>"` and maps every titled place to a record
    pub async fn search(&self, city: &str, category: &str) -> Result<Vec<BusinessRecord>, HarvestError> {
        let url = self.base_url.join(SERPER_PLACES_ENDPOINT)?;
        let body = json!({ "q": format!("{} in {}", category, city) });
        let (url, body) = (&url, &body);

        let response: SerperPlacesResponse =
            retry_with_backoff(self.retry, move || self.post_once(url, body)).await?;

        let total = response.places.len();
        let records: Vec<BusinessRecord> = response
            .places
            .into_iter()
            .filter_map(place_to_record)
            .collect();

        if records.len() < total {
            tracing::debug!("Dropped {} untitled places for {}", total - records.len(), city);
        }
        Ok(records)
    }

    /// Searches one city, saves its region file and optionally merges into the master set
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - the region was saved, or the quota ran out before it
    ///   could be (`quota_exhausted` is set and nothing is written)
    /// * `Err(HarvestError)` - any other search or save failure
    ///
    /// A failed master merge is logged; the region file stays for `--merge`.
    pub async fn collect<S>(
        &self,
        store: &S,
        city: &str,
        category: &str,
        merge_into_master: bool,
    ) -> Result<CrawlSummary, HarvestError>
    where
        S: ResultStore + Clone + Send + 'static,
    {
        let mut summary = CrawlSummary::new(category);
        summary.regions_attempted = 1;

        let records = match self.search(city, category).await {
            Ok(records) => records,
            Err(HarvestError::QuotaExhausted { endpoint }) => {
                tracing::error!("API quota exhausted at {} while collecting '{}'", endpoint, city);
                summary.quota_exhausted = true;
                summary.record_region(city, RegionOutcome::Interrupted);
                summary.finish();
                return Ok(summary);
            }
            Err(e) => {
                tracing::error!("Aggregator search for '{}' failed: {}", city, e);
                return Err(e);
            }
        };
        summary.candidates = records.len();

        let path = store.save_region(city, category, &records)?;
        tracing::info!("Saved {} records for '{}' to {}", records.len(), city, path.display());

        if merge_into_master {
            match merge_in_background(store, records.clone()).await {
                Ok(outcome) => {
                    summary.master_added = outcome.added;
                    summary.master_skipped = outcome.skipped;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to merge '{}' into master set: {} (region file kept; rerun with --merge)",
                        city,
                        e
                    );
                }
            }
        }

        summary.record_region(
            city,
            RegionOutcome::Saved {
                records: records.len(),
                path,
            },
        );
        summary.finish();
        Ok(summary)
    }

    async fn post_once(&self, url: &Url, body: &Value) -> Result<SerperPlacesResponse, HarvestError> {
        tracing::trace!("POST {}", SERPER_PLACES_ENDPOINT);

        let response = self
            .http
            .post(url.clone())
            .header("X-API-KEY", self.api_key.as_str())
            .json(body)
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                endpoint: SERPER_PLACES_ENDPOINT.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(HarvestError::QuotaExhausted {
                endpoint: SERPER_PLACES_ENDPOINT.to_string(),
            });
        }
        if !status.is_success() {
            return Err(HarvestError::Upstream {
                endpoint: SERPER_PLACES_ENDPOINT.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| HarvestError::Http {
                endpoint: SERPER_PLACES_ENDPOINT.to_string(),
                source,
            })?;

        serde_json::from_str(&text).map_err(|source| HarvestError::Decode {
            context: SERPER_PLACES_ENDPOINT.to_string(),
            source,
        })
    }
}

fn place_to_record(place: SerperPlace) -> Option<BusinessRecord> {
    let mut record = BusinessRecord::new(place.title.clone()?)?;

    record.name = place.title;
    record.formatted_address = place.address;
    record.phone = place.phone_number;
    record.website = place.website;
    record.rating = place.rating;
    record.rating_count = place.rating_count;
    if let Some(category) = place.category {
        record.extra.insert("category".to_string(), Value::String(category));
    }
    if let Some(cid) = place.cid {
        record.extra.insert("cid".to_string(), Value::String(cid));
    }

    Some(record)
}
