//! Geometry for search regions
//!
//! This module handles:
//! - Great-circle (haversine) distance between coordinates
//! - Viewport midpoints
//! - Deriving a search [`Region`] (center + radius) from a geocoded viewport

mod resolver;

pub use resolver::GeoResolver;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Formats the point as the `"lat,lng"` query parameter the places API expects
    pub fn to_query_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// Bounding box of a geocoded place
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub northeast: LatLng,
    pub southwest: LatLng,
}

impl Viewport {
    /// Arithmetic midpoint of the two corners
    ///
    /// A plain average rather than a geodesic midpoint; the error is negligible
    /// at district scale.
    pub fn midpoint(&self) -> LatLng {
        LatLng {
            lat: (self.northeast.lat + self.southwest.lat) / 2.0,
            lng: (self.northeast.lng + self.southwest.lng) / 2.0,
        }
    }

    /// Distance in meters from the midpoint to the northeast corner
    pub fn radius_meters(&self) -> f64 {
        haversine_distance(self.midpoint(), self.northeast)
    }
}

/// A geocoded search area. Immutable once computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    name: String,
    center: LatLng,
    radius_meters: f64,
}

impl Region {
    /// Derives a region from a viewport
    ///
    /// Returns `None` when the viewport is degenerate (non-positive or non-finite
    /// radius), since a nearby search needs a positive radius.
    pub fn from_viewport(name: impl Into<String>, viewport: &Viewport) -> Option<Self> {
        let radius_meters = viewport.radius_meters();
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return None;
        }

        Some(Self {
            name: name.into(),
            center: viewport.midpoint(),
            radius_meters,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }
}

/// Great-circle distance between two points, in meters
///
/// `a = sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlng/2)`,
/// `d = 2·R·atan2(√a, √(1−a))`.
pub fn haversine_distance(from: LatLng, to: LatLng) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points.
    let a = a.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}
