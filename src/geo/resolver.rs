//! Free-text place name → search [`Region`]

use crate::crawler::{GeocodeResponse, PlacesClient, GEOCODE_ENDPOINT};
use crate::geo::Region;
use crate::HarvestError;
use std::sync::Arc;

/// Resolves district or city names to a center point and search radius
pub struct GeoResolver {
    client: Arc<PlacesClient>,
}

impl GeoResolver {
    pub fn new(client: Arc<PlacesClient>) -> Self {
        Self { client }
    }

    /// Geocodes `"<place_name>, <country>"` and derives a region from the first
    /// result's viewport
    ///
    /// # Errors
    ///
    /// * `HarvestError::NotFound` - zero results or an empty-result status; the
    ///   caller should skip the region and continue
    /// * `HarvestError::InvalidGeometry` - the viewport collapses to a point
    /// * any client error (upstream, quota, decode) from the geocode call
    pub async fn resolve(&self, place_name: &str, country: &str) -> Result<Region, HarvestError> {
        let query = format!("{}, {}", place_name, country);
        let response: GeocodeResponse = self
            .client
            .get(GEOCODE_ENDPOINT, &[("address", query.as_str())])
            .await?;

        if response.status.is_empty_result() {
            return Err(HarvestError::NotFound { query });
        }

        let first = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| HarvestError::NotFound {
                query: query.clone(),
            })?;

        let viewport = first.geometry.viewport;
        let region = Region::from_viewport(place_name, &viewport).ok_or_else(|| {
            HarvestError::InvalidGeometry {
                region: place_name.to_string(),
                radius_meters: viewport.radius_meters(),
            }
        })?;

        tracing::debug!(
            region = place_name,
            resolved = first.formatted_address.as_deref().unwrap_or("-"),
            lat = region.center().lat,
            lng = region.center().lng,
            radius_m = region.radius_meters(),
            "Resolved region geometry"
        );

        Ok(region)
    }
}
