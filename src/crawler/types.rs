//! Typed response shapes for the upstream APIs
//!
//! Every field the crawler reads is modelled explicitly, with `Option` for
//! anything the provider may omit. Decoding failures surface as
//! [`HarvestError::Decode`](crate::HarvestError::Decode) at the client boundary.

use crate::geo::Viewport;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Status field of a places/geocoding response envelope
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ApiStatus {
    Ok,
    ZeroResults,
    NotFound,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
    Other(String),
}

impl ApiStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::NotFound => "NOT_FOUND",
            Self::OverQueryLimit => "OVER_QUERY_LIMIT",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::Other(s) => s,
        }
    }

    /// Statuses that mean "nothing here" rather than failure
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::ZeroResults | Self::NotFound)
    }
}

impl From<String> for ApiStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "OK" => Self::Ok,
            "ZERO_RESULTS" => Self::ZeroResults,
            "NOT_FOUND" => Self::NotFound,
            "OVER_QUERY_LIMIT" => Self::OverQueryLimit,
            "REQUEST_DENIED" => Self::RequestDenied,
            "INVALID_REQUEST" => Self::InvalidRequest,
            "UNKNOWN_ERROR" => Self::UnknownError,
            _ => Self::Other(s),
        }
    }
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access to the status envelope shared by all places responses
pub trait ApiEnvelope {
    fn status(&self) -> &ApiStatus;
    fn error_message(&self) -> Option<&str>;
}

macro_rules! impl_envelope {
    ($($ty:ty),+) => {
        $(impl ApiEnvelope for $ty {
            fn status(&self) -> &ApiStatus {
                &self.status
            }

            fn error_message(&self) -> Option<&str> {
                self.error_message.as_deref()
            }
        })+
    };
}

impl_envelope!(GeocodeResponse, NearbySearchResponse, DetailsResponse);

// ===== Geocoding =====

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: ApiStatus,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub formatted_address: Option<String>,
    pub geometry: GeocodeGeometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeGeometry {
    pub viewport: Viewport,
}

// ===== Nearby search =====

#[derive(Debug, Clone, Deserialize)]
pub struct NearbySearchResponse {
    pub status: ApiStatus,
    #[serde(default)]
    pub results: Vec<Candidate>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A minimal place reference from one nearby-search page, pending detail lookup
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(flatten)]
    pub raw_fields: Map<String, Value>,
}

// ===== Place details =====

#[derive(Debug, Clone, Deserialize)]
pub struct DetailsResponse {
    pub status: ApiStatus,
    #[serde(default)]
    pub result: Option<PlaceDetails>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// The fixed field projection requested from the details endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub international_phone_number: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u64>,
}

impl PlaceDetails {
    /// Comma-separated `fields` parameter matching this struct
    pub const FIELDS: &'static str = "place_id,name,formatted_address,international_phone_number,url,website,rating,user_ratings_total";

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ===== Search aggregator (single-city mode) =====

#[derive(Debug, Clone, Deserialize)]
pub struct SerperPlacesResponse {
    #[serde(default)]
    pub places: Vec<SerperPlace>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerperPlace {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub rating_count: Option<u64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cid: Option<String>,
}
