use serde::{Deserialize, Serialize};

use super::place::{Coordinate, PlaceRecord, PriceTier};

/// Flattened place record with derived and chain-level columns.
///
/// `normalize` fills the per-record fields; the chain fields and the
/// reference flag stay at their zero values until `aggregate` runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: String,
    pub name: String,
    pub rating: Option<f64>,
    pub rating_count: u32,
    pub address: String,
    pub price_tier: Option<PriceTier>,
    pub latitude: f64,
    pub longitude: f64,
    pub categories: Vec<String>,
    pub primary_category: String,

    /// rating * rating_count; absent when the rating is missing
    pub weighted_score: Option<f64>,

    pub location_count: usize,
    pub chain_weighted_score: f64,
    pub chain_rating_total: u64,
    /// chain_weighted_score / chain_rating_total, absent for unrated chains
    pub chain_average_rating: Option<f64>,

    pub near_reference: bool,
}

impl NormalizedRecord {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.latitude,
            lon: self.longitude,
        }
    }
}

impl From<&NormalizedRecord> for PlaceRecord {
    fn from(record: &NormalizedRecord) -> Self {
        PlaceRecord {
            id: record.id.clone(),
            name: record.name.clone(),
            rating: record.rating,
            rating_count: record.rating_count,
            address: record.address.clone(),
            categories: record.categories.clone(),
            location: Some(record.coordinate()),
            price_tier: record.price_tier,
        }
    }
}
