//! Place-search collaborators.
//!
//! A [`PlaceSearch`] turns a query (plus optional location and note text)
//! into raw, unranked [`LocationResult`]s. Two providers exist:
//! - `http`: GET against a `/api/locations`-style endpoint
//! - `yelp`: the business search API called directly

pub mod http;
pub mod types;
pub mod yelp;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{PlacesConfig, PlacesProvider};

pub use http::HttpPlaceSearch;
pub use types::{BusinessRecord, LocationResult};
pub use yelp::YelpPlaceSearch;

#[derive(Debug, thiserror::Error)]
pub enum PlaceSearchError {
    #[error("place search returned status {0}")]
    Status(u16),

    #[error("malformed place search payload: {0}")]
    Malformed(String),

    #[error("place search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API key not configured (set {0})")]
    MissingApiKey(String),
}

#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Fetch raw candidates for `query`. Results are unranked and keep the
    /// provider's order.
    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Vec<LocationResult>, PlaceSearchError>;

    /// Get the name of this provider for logging
    fn name(&self) -> &'static str;
}

/// Build the configured provider.
pub fn from_config(config: &PlacesConfig) -> Result<Arc<dyn PlaceSearch>, PlaceSearchError> {
    let provider: Arc<dyn PlaceSearch> = match config.provider {
        PlacesProvider::Http => Arc::new(HttpPlaceSearch::new(&config.endpoint, config.timeout())?),
        PlacesProvider::Yelp => Arc::new(YelpPlaceSearch::from_env(
            &config.api_key_env,
            config.user_location.clone(),
            config.timeout(),
        )?),
    };

    log::info!("places provider={}", provider.name());
    Ok(provider)
}
