use crate::places::{PlacePrediction, PlacesError, PlacesProvider};
use tracing::{debug, instrument};

/// Queries shorter than this (after trimming) are not sent.
pub const MIN_QUERY_LEN: usize = 3;

/// Guards a [`PlacesProvider`] against pointless requests.
pub struct Autocomplete<P> {
    provider: P,
}

impl<P: PlacesProvider> Autocomplete<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[instrument(skip(self, session_token))]
    pub async fn search(
        &self,
        input: &str,
        session_token: &str,
    ) -> Result<Vec<PlacePrediction>, PlacesError> {
        let query = input.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            debug!("Query too short, skipping request");
            return Ok(Vec::new());
        }
        self.provider.autocomplete(query, session_token).await
    }
}
