//! Crawler module for places discovery
//!
//! This module contains the core crawling logic, including:
//! - The authenticated places client with bounded retry
//! - Typed response shapes for every upstream endpoint
//! - Paginated nearby search under the continuation-token delay
//! - Per-candidate detail lookup
//! - Region-by-region coordination
//! - The single-city aggregator mode

mod client;
mod coordinator;
mod details;
mod pager;
mod retry;
mod serper;
mod types;

pub use client::{
    build_http_client, PlacesClient, DETAILS_ENDPOINT, GEOCODE_ENDPOINT, NEARBY_SEARCH_ENDPOINT,
};
pub use coordinator::DiscoveryCrawler;
pub use details::DetailFetcher;
pub use pager::{PageDrain, PlacesPager, MAX_SEARCH_RADIUS_METERS};
pub use retry::RetryPolicy;
pub use serper::{CityCollector, SERPER_PLACES_ENDPOINT};
pub use types::{
    ApiEnvelope, ApiStatus, Candidate, DetailsResponse, GeocodeResponse, NearbySearchResponse,
    PlaceDetails, SerperPlace, SerperPlacesResponse,
};
