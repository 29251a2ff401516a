use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{BusinessRecord, LocationResult, PlaceSearch, PlaceSearchError};
use crate::query::PlaceQuery;

const DEFAULT_BASE_URL: &str = "https://api.yelp.com/v3";
const RESULT_LIMIT: &str = "10";

#[derive(Deserialize)]
struct BusinessesResponse {
    #[serde(default)]
    businesses: Vec<BusinessRecord>,
}

/// Calls the business search API directly.
///
/// The raw query is split into a location, a category and a cleaned search
/// term by [`PlaceQuery::parse`] before the request is made.
pub struct YelpPlaceSearch {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    user_location: Option<String>,
}

impl YelpPlaceSearch {
    pub fn new(
        api_key: &str,
        user_location: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PlaceSearchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_location,
        })
    }

    /// Read the API key from `key_env`. Unset or blank is an error.
    pub fn from_env(
        key_env: &str,
        user_location: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PlaceSearchError> {
        let api_key = std::env::var(key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PlaceSearchError::MissingApiKey(key_env.to_string()))?;

        Self::new(&api_key, user_location, timeout)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PlaceSearch for YelpPlaceSearch {
    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Vec<LocationResult>, PlaceSearchError> {
        let user_location = location.or(self.user_location.as_deref());
        let parsed = PlaceQuery::parse(query, user_location, notes);

        log::info!(
            "places={} location={:?} category={:?} term={:?}",
            self.name(),
            parsed.location,
            parsed.category,
            parsed.term
        );

        let mut params = vec![
            ("term", parsed.term.as_str()),
            ("location", parsed.location.as_str()),
            ("limit", RESULT_LIMIT),
        ];
        if let Some(category) = parsed.category {
            params.push(("categories", category));
        }

        let response = self
            .client
            .get(format!("{}/businesses/search", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log::error!("places={} status={status}", self.name());
            return Err(PlaceSearchError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let body = serde_json::from_str::<BusinessesResponse>(&text).map_err(|err| {
            log::error!("{err}. tried to parse: {text:?}");
            PlaceSearchError::Malformed(err.to_string())
        })?;

        log::info!(
            "places={} outcome=success count={}",
            self.name(),
            body.businesses.len()
        );

        Ok(body.businesses.into_iter().map(LocationResult::from).collect())
    }

    fn name(&self) -> &'static str {
        "yelp"
    }
}
