//! Paginated nearby-search over one region
//!
//! This module handles:
//! - Issuing nearby-search requests with location, radius and category
//! - Following the continuation-token chain until the API stops returning one
//! - Holding every token back for the mandatory reuse delay
//! - Fail-stop on upstream errors and cooperative cancellation

use crate::crawler::client::{PlacesClient, NEARBY_SEARCH_ENDPOINT};
use crate::crawler::types::{Candidate, NearbySearchResponse};
use crate::geo::Region;
use crate::state::{PagerState, TokenGate};
use crate::HarvestError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Largest radius the nearby-search endpoint accepts
pub const MAX_SEARCH_RADIUS_METERS: f64 = 50_000.0;

/// Everything a fully drained pager produced
#[derive(Debug, Default)]
pub struct PageDrain {
    /// Candidates in API order across all pages
    pub candidates: Vec<Candidate>,

    /// Pages successfully fetched
    pub pages: u32,

    /// The error that stopped paging early, if any
    pub error: Option<HarvestError>,
}

/// Pages through nearby-search results for one region
///
/// A pager is single-use: once it reaches [`PagerState::Done`] it yields nothing
/// more, and [`PlacesPager::drain`] consumes it.
pub struct PlacesPager {
    client: Arc<PlacesClient>,
    location: String,
    radius: String,
    category: String,
    state: PagerState,
    token: Option<String>,
    gate: TokenGate,
    pages_fetched: u32,
    max_pages: Option<u32>,
    cancel: CancellationToken,
}

impl PlacesPager {
    /// Creates a pager for `region` and `category`
    ///
    /// # Arguments
    ///
    /// * `token_delay` - minimum age of a continuation token before it is reused
    /// * `max_pages` - optional cap on pages; `None` follows the chain to its end
    /// * `cancel` - checked before every request and during the token delay
    pub fn new(
        client: Arc<PlacesClient>,
        region: &Region,
        category: &str,
        token_delay: Duration,
        max_pages: Option<u32>,
        cancel: CancellationToken,
    ) -> Self {
        let radius = region.radius_meters().ceil().min(MAX_SEARCH_RADIUS_METERS);
        if radius < region.radius_meters() {
            tracing::debug!(
                "Clamping radius for '{}' from {:.0}m to {:.0}m",
                region.name(),
                region.radius_meters(),
                radius
            );
        }

        Self {
            client,
            location: region.center().to_query_param(),
            radius: format!("{:.0}", radius),
            category: category.to_string(),
            state: PagerState::Initial,
            token: None,
            gate: TokenGate::new(token_delay),
            pages_fetched: 0,
            max_pages,
            cancel,
        }
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Fetches the next page
    ///
    /// # Returns
    ///
    /// * `Ok(Some(candidates))` - one page, in API order (may be empty)
    /// * `Ok(None)` - the chain is exhausted
    /// * `Err(_)` - the request failed or was cancelled; the pager is now `Done`
    pub async fn next_page(&mut self) -> Result<Option<Vec<Candidate>>, HarvestError> {
        if self.state.is_terminal() {
            return Ok(None);
        }

        if self.state.needs_token() {
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = self.gate.wait_ready() => {}
            }
        }
        if self.cancel.is_cancelled() {
            self.transition(PagerState::Done)?;
            return Err(HarvestError::Cancelled);
        }

        let response = match self.request().await {
            Ok(response) => response,
            Err(e) => {
                self.transition(PagerState::Done)?;
                return Err(e);
            }
        };
        self.pages_fetched += 1;
        self.gate.disarm();

        let next_token = response.next_page_token.filter(|t| !t.is_empty());
        let capped = self.max_pages.is_some_and(|max| self.pages_fetched >= max);

        match next_token {
            Some(token) if !capped => {
                self.gate.arm(Instant::now());
                self.token = Some(token);
                self.transition(PagerState::HasToken)?;
            }
            Some(_) => {
                tracing::debug!(
                    "Page cap of {} reached; dropping continuation token",
                    self.pages_fetched
                );
                self.token = None;
                self.transition(PagerState::Done)?;
            }
            None => {
                self.token = None;
                self.transition(PagerState::Done)?;
            }
        }

        tracing::debug!(
            page = self.pages_fetched,
            results = response.results.len(),
            state = %self.state,
            "Fetched nearby-search page"
        );

        Ok(Some(response.results))
    }

    /// Consumes the pager, collecting every page until the chain ends or fails
    pub async fn drain(mut self) -> PageDrain {
        let mut drained = PageDrain::default();
        loop {
            match self.next_page().await {
                Ok(Some(mut page)) => drained.candidates.append(&mut page),
                Ok(None) => break,
                Err(e) => {
                    drained.error = Some(e);
                    break;
                }
            }
        }
        drained.pages = self.pages_fetched;
        drained
    }

    async fn request(&self) -> Result<NearbySearchResponse, HarvestError> {
        let mut params = vec![
            ("location", self.location.as_str()),
            ("radius", self.radius.as_str()),
            ("type", self.category.as_str()),
        ];
        if let Some(token) = &self.token {
            params.push(("pagetoken", token.as_str()));
        }

        self.client.get(NEARBY_SEARCH_ENDPOINT, &params).await
    }

    fn transition(&mut self, next: PagerState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
