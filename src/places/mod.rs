//! Address search for the add-address flow.
//!
//! [`PlacesProvider`] is the seam to the geocoding service; [`GooglePlaces`]
//! implements it over HTTP. [`Autocomplete`] sits in front and drops
//! queries too short to be useful before they cost a request.

pub mod address;
pub mod autocomplete;
pub mod google;

pub use address::*;
pub use autocomplete::*;
pub use google::GooglePlaces;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlacesError {
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-OK status such as `REQUEST_DENIED`.
    #[error("Places request failed with {status}: {message}")]
    Status { status: String, message: String },

    #[error("Failed to decode places response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for PlacesError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PlacesError::Decode(e.to_string())
        } else {
            PlacesError::Network(e.to_string())
        }
    }
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePrediction {
    pub place_id: String,
    pub description: String,
    pub main_text: String,
    pub secondary_text: Option<String>,
}

/// A resolved place: parsed address plus the pin position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub formatted_address: String,
    pub address: ParsedAddress,
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn autocomplete(
        &self,
        input: &str,
        session_token: &str,
    ) -> Result<Vec<PlacePrediction>, PlacesError>;

    async fn place_details(
        &self,
        place_id: &str,
        session_token: &str,
    ) -> Result<PlaceDetails, PlacesError>;

    /// Address at a dropped pin, `None` when the point has no address.
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<PlaceDetails>, PlacesError>;
}
