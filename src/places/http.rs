use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{BusinessRecord, LocationResult, PlaceSearch, PlaceSearchError};

#[derive(Deserialize)]
struct ResultsResponse {
    results: Option<Vec<BusinessRecord>>,
}

/// Client for an endpoint answering `GET ?query&location&notesContent` with
/// `{"results": [...]}`.
pub struct HttpPlaceSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPlaceSearch {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, PlaceSearchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

/// Parse a `{"results": [...]}` body, mapping each record.
pub(crate) fn parse_results(text: &str) -> Result<Vec<LocationResult>, PlaceSearchError> {
    let response = serde_json::from_str::<ResultsResponse>(text).map_err(|err| {
        log::error!("{err}. tried to parse: {text:?}");
        PlaceSearchError::Malformed(err.to_string())
    })?;

    let records = response
        .results
        .ok_or_else(|| PlaceSearchError::Malformed("missing `results` field".to_string()))?;

    Ok(records.into_iter().map(LocationResult::from).collect())
}

#[async_trait]
impl PlaceSearch for HttpPlaceSearch {
    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Vec<LocationResult>, PlaceSearchError> {
        let mut params = vec![("query", query)];
        if let Some(location) = location {
            params.push(("location", location));
        }
        if let Some(notes) = notes {
            params.push(("notesContent", notes));
        }

        let response = self.client.get(&self.endpoint).query(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("places={} status={status} query={query:?}", self.name());
            return Err(PlaceSearchError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let results = parse_results(&text)?;

        log::debug!("places={} outcome=success count={}", self.name(), results.len());
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
