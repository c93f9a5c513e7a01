use crate::places::{
    parse_address_components, AddressComponent, PlaceDetails, PlacePrediction, PlacesError,
    PlacesProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";

/// Google Places Autocomplete, Place Details and Geocoding, restricted to India.
#[derive(Debug, Clone)]
pub struct GooglePlaces {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Deserialize)]
struct AutocompleteBody {
    #[serde(default)]
    predictions: Vec<RawPrediction>,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    place_id: String,
    description: String,
    #[serde(default)]
    structured_formatting: Option<StructuredFormatting>,
}

#[derive(Debug, Deserialize)]
struct StructuredFormatting {
    main_text: String,
    #[serde(default)]
    secondary_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DetailsBody {
    result: Option<RawPlace>,
}

#[derive(Debug, Deserialize)]
struct GeocodeBody {
    #[serde(default)]
    results: Vec<RawPlace>,
}

impl From<RawPlace> for PlaceDetails {
    fn from(place: RawPlace) -> Self {
        PlaceDetails {
            address: parse_address_components(&place.address_components),
            formatted_address: place.formatted_address,
            latitude: place.geometry.location.lat,
            longitude: place.geometry.location.lng,
        }
    }
}

impl GooglePlaces {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(api_key: impl Into<String>) -> Result<Self, PlacesError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, PlacesError> {
        let http = Client::builder().timeout(Self::REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Envelope<T>, PlacesError> {
        let url = format!("{}{}", self.base_url, path);
        let envelope: Envelope<T> = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match envelope.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(envelope),
            status => {
                warn!(path, status, "Places request rejected");
                Err(PlacesError::Status {
                    status: status.to_string(),
                    message: envelope.error_message.unwrap_or_default(),
                })
            }
        }
    }
}

#[async_trait]
impl PlacesProvider for GooglePlaces {
    #[instrument(skip(self, session_token))]
    async fn autocomplete(
        &self,
        input: &str,
        session_token: &str,
    ) -> Result<Vec<PlacePrediction>, PlacesError> {
        let envelope: Envelope<AutocompleteBody> = self
            .get(
                "/maps/api/place/autocomplete/json",
                &[
                    ("input", input),
                    ("sessiontoken", session_token),
                    ("components", "country:in"),
                ],
            )
            .await?;
        debug!(count = envelope.body.predictions.len(), "Predictions received");

        Ok(envelope
            .body
            .predictions
            .into_iter()
            .map(|p| {
                let (main_text, secondary_text) = match p.structured_formatting {
                    Some(f) => (f.main_text, f.secondary_text),
                    None => (p.description.clone(), None),
                };
                PlacePrediction {
                    place_id: p.place_id,
                    description: p.description,
                    main_text,
                    secondary_text,
                }
            })
            .collect())
    }

    #[instrument(skip(self, session_token))]
    async fn place_details(
        &self,
        place_id: &str,
        session_token: &str,
    ) -> Result<PlaceDetails, PlacesError> {
        let envelope: Envelope<DetailsBody> = self
            .get(
                "/maps/api/place/details/json",
                &[
                    ("place_id", place_id),
                    ("sessiontoken", session_token),
                    ("fields", "address_component,formatted_address,geometry"),
                ],
            )
            .await?;
        envelope
            .body
            .result
            .map(PlaceDetails::from)
            .ok_or_else(|| PlacesError::Status {
                status: envelope.status,
                message: format!("no result for place {place_id}"),
            })
    }

    #[instrument(skip(self))]
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<PlaceDetails>, PlacesError> {
        let latlng = format!("{latitude},{longitude}");
        let envelope: Envelope<GeocodeBody> = self
            .get("/maps/api/geocode/json", &[("latlng", latlng.as_str())])
            .await?;
        Ok(envelope.body.results.into_iter().next().map(PlaceDetails::from))
    }
}
