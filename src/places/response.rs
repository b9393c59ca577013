//! Wire shapes of the two places APIs and their conversion into [`PlaceRecord`].

use serde::Deserialize;

use crate::models::{Coordinate, PlaceRecord, PriceTier};

/// Nearby Search (legacy) response page
#[derive(Debug, Deserialize)]
pub(crate) struct LegacyResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<LegacyPlace>,
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyPlace {
    #[serde(default)]
    place_id: String,
    name: String,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
    vicinity: Option<String>,
    price_level: Option<u8>,
    geometry: Option<LegacyGeometry>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyGeometry {
    location: LegacyLocation,
}

#[derive(Debug, Deserialize)]
struct LegacyLocation {
    lat: f64,
    lng: f64,
}

impl From<LegacyPlace> for PlaceRecord {
    fn from(place: LegacyPlace) -> Self {
        PlaceRecord {
            id: place.place_id,
            name: place.name,
            rating: place.rating,
            rating_count: place.user_ratings_total.unwrap_or(0),
            address: place.vicinity.unwrap_or_default(),
            categories: place.types,
            location: place
                .geometry
                .and_then(|g| Coordinate::new(g.location.lat, g.location.lng).ok()),
            price_tier: place.price_level.and_then(|p| PriceTier::try_from(p).ok()),
        }
    }
}

/// Places (New) `searchNearby` response
#[derive(Debug, Deserialize)]
pub(crate) struct NearbyResponse {
    #[serde(default)]
    pub places: Vec<NearbyPlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NearbyPlace {
    #[serde(default)]
    id: String,
    display_name: Option<LocalizedText>,
    rating: Option<f64>,
    user_rating_count: Option<u32>,
    short_formatted_address: Option<String>,
    price_level: Option<String>,
    location: Option<LatLng>,
    primary_type: Option<String>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl From<NearbyPlace> for PlaceRecord {
    fn from(place: NearbyPlace) -> Self {
        // primary type leads so it becomes the primary category
        let mut categories = Vec::with_capacity(place.types.len() + 1);
        if let Some(primary) = place.primary_type {
            categories.push(primary);
        }
        for t in place.types {
            if !categories.contains(&t) {
                categories.push(t);
            }
        }

        PlaceRecord {
            id: place.id,
            name: place.display_name.map(|d| d.text).unwrap_or_default(),
            rating: place.rating,
            rating_count: place.user_rating_count.unwrap_or(0),
            address: place.short_formatted_address.unwrap_or_default(),
            categories,
            location: place
                .location
                .and_then(|l| Coordinate::new(l.latitude, l.longitude).ok()),
            price_tier: place
                .price_level
                .as_deref()
                .and_then(PriceTier::from_api_name),
        }
    }
}

/// Error body of the Places (New) API
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub message: String,
    #[serde(default)]
    pub status: String,
}
