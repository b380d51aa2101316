//! Candidate → [`BusinessRecord`] via the place-details endpoint

use crate::crawler::client::{PlacesClient, DETAILS_ENDPOINT};
use crate::crawler::types::{Candidate, DetailsResponse, PlaceDetails};
use crate::storage::BusinessRecord;
use crate::HarvestError;
use std::sync::Arc;

/// Resolves minimal candidates to full detail records
pub struct DetailFetcher {
    client: Arc<PlacesClient>,
}

impl DetailFetcher {
    pub fn new(client: Arc<PlacesClient>) -> Self {
        Self { client }
    }

    /// Fetches details for one candidate
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - details found and projected
    /// * `Ok(None)` - no place identifier, the place is unknown upstream, the
    ///   detail result is empty, or no name could be found for the identity key
    /// * `Err(_)` - the request itself failed (upstream, quota, decode)
    pub async fn fetch(&self, candidate: &Candidate) -> Result<Option<BusinessRecord>, HarvestError> {
        let Some(place_id) = candidate.place_id.as_deref().filter(|id| !id.is_empty()) else {
            tracing::debug!("Dropping candidate without place_id: {:?}", candidate.name);
            return Ok(None);
        };

        let response: DetailsResponse = self
            .client
            .get(
                DETAILS_ENDPOINT,
                &[("place_id", place_id), ("fields", PlaceDetails::FIELDS)],
            )
            .await?;

        if response.status.is_empty_result() {
            tracing::debug!("No details for {} ({})", place_id, response.status);
            return Ok(None);
        }

        let Some(details) = response.result.filter(|d| !d.is_empty()) else {
            tracing::debug!("Empty detail result for {}", place_id);
            return Ok(None);
        };

        Ok(build_record(candidate, place_id, details))
    }
}

/// Merges a candidate with its detail result
///
/// Detail fields win; the candidate's `name` and `vicinity` fill gaps in the
/// name and address.
fn build_record(candidate: &Candidate, place_id: &str, details: PlaceDetails) -> Option<BusinessRecord> {
    let name = details.name.or_else(|| candidate.name.clone());
    let mut record = BusinessRecord::new(name.clone()?)?;

    record.name = name;
    record.formatted_address = details
        .formatted_address
        .or_else(|| candidate.vicinity.clone());
    record.phone = details.international_phone_number;
    record.url = details.url;
    record.website = details.website;
    record.rating = details.rating;
    record.rating_count = details.user_ratings_total;
    record.place_id = details.place_id.or_else(|| Some(place_id.to_string()));

    Some(record)
}
