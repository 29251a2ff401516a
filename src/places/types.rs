use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

/// A ranked or rankable place.
///
/// Produced by a place-search provider; only `similarity_score` is written
/// afterwards, by the ranker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationResult {
    pub place_id: String,
    pub name: String,
    pub description: String,
    pub formatted_address: String,
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessCoordinates {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessLocation {
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub display_address: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessCategory {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub alias: String,
}

/// Business-like record as returned by a place-search backend.
///
/// Accepts both the raw business-search shape (`id`, `coordinates`,
/// `location`, `categories`) and the already-mapped [`LocationResult`] shape
/// (`place_id`, `geometry`, `formatted_address`, `types`). Every field is
/// optional; missing pieces become empty strings, zeros or empty lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessRecord {
    #[serde(default, alias = "place_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub coordinates: Option<BusinessCoordinates>,
    #[serde(default)]
    pub location: Option<BusinessLocation>,
    #[serde(default)]
    pub categories: Option<Vec<BusinessCategory>>,

    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
}

impl From<BusinessRecord> for LocationResult {
    fn from(record: BusinessRecord) -> Self {
        let categories = record.categories.unwrap_or_default();

        let description = if categories.is_empty() {
            record.description.unwrap_or_default()
        } else {
            categories
                .iter()
                .map(|c| c.title.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let types = if categories.is_empty() {
            record.types.unwrap_or_default()
        } else {
            categories.into_iter().map(|c| c.alias).collect()
        };

        let formatted_address = record
            .location
            .as_ref()
            .and_then(|l| {
                l.address1
                    .clone()
                    .filter(|a| !a.is_empty())
                    .or_else(|| l.display_address.as_ref().map(|d| d.join(", ")))
            })
            .filter(|a| !a.is_empty())
            .or(record.formatted_address)
            .unwrap_or_default();

        let geometry = match record.coordinates {
            Some(c) => Geometry {
                location: LatLng {
                    lat: c.latitude.unwrap_or(0.0),
                    lng: c.longitude.unwrap_or(0.0),
                },
            },
            None => record.geometry.unwrap_or_default(),
        };

        LocationResult {
            place_id: record.id.unwrap_or_default(),
            name: record.name.unwrap_or_default(),
            description,
            formatted_address,
            geometry,
            rating: record.rating,
            types,
            similarity_score: None,
        }
    }
}
