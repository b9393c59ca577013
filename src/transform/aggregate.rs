//! Chain-level statistics broadcast back onto every record.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::grid::haversine_distance_m;
use crate::models::{Coordinate, NormalizedRecord};

/// Fixed point that records are flagged as being near (e.g. an airport)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub name: String,
    pub coordinate: Coordinate,
    pub radius_m: f64,
}

impl ReferencePoint {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        haversine_distance_m(self.coordinate.lat, self.coordinate.lon, lat, lon) <= self.radius_m
    }
}

impl Default for ReferencePoint {
    fn default() -> Self {
        Self {
            name: "SLC International Airport".to_string(),
            coordinate: Coordinate {
                lat: 40.8015768,
                lon: -111.9768056,
            },
            radius_m: 2000.0,
        }
    }
}

#[derive(Debug, Default)]
struct ChainTotals {
    locations: usize,
    weighted_score: f64,
    rating_total: u64,
}

/// Annotate each record with the statistics of its chain (all records
/// sharing its name) and with whether it lies near `reference`.
///
/// Output keeps one row per input record, in input order.
pub fn aggregate(
    records: Vec<NormalizedRecord>,
    reference: &ReferencePoint,
) -> Vec<NormalizedRecord> {
    let mut chains: HashMap<String, ChainTotals> = HashMap::new();

    for record in &records {
        let totals = chains.entry(record.name.clone()).or_default();
        totals.locations += 1;
        totals.weighted_score += record.weighted_score.unwrap_or(0.0);
        totals.rating_total += u64::from(record.rating_count);
    }

    let mut near_reference = 0;
    let records: Vec<NormalizedRecord> = records
        .into_iter()
        .map(|mut record| {
            if let Some(totals) = chains.get(&record.name) {
                record.location_count = totals.locations;
                record.chain_weighted_score = totals.weighted_score;
                record.chain_rating_total = totals.rating_total;
                record.chain_average_rating = (totals.rating_total > 0)
                    .then(|| totals.weighted_score / totals.rating_total as f64);
            }
            record.near_reference = reference.contains(record.latitude, record.longitude);
            if record.near_reference {
                near_reference += 1;
            }
            record
        })
        .collect();

    info!(
        "Aggregated {} records into {} chains ({} near {})",
        records.len(),
        chains.len(),
        near_reference,
        reference.name
    );

    records
}
