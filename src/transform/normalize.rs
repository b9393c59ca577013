//! Flattening, deduplication and category filtering of raw place records.

use hashbrown::HashSet;
use tracing::{debug, info};

use crate::error::{GridScoutError, Result};
use crate::models::{NormalizedRecord, PlaceRecord};

/// Coordinates are snapped to this grid (degrees) when comparing records
/// for duplication; roughly 100 m of latitude.
pub const DEDUP_GRID_DEG: f64 = 0.001;

/// Restaurant-like primary categories reported by the legacy API
pub const DEFAULT_ALLOWED_CATEGORIES: &[&str] =
    &["restaurant", "meal_takeaway", "bakery", "cafe", "meal_delivery"];

fn snap(value: f64) -> i64 {
    (value / DEDUP_GRID_DEG).round() as i64
}

/// Identity of a record for deduplication: name plus snapped coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    name: String,
    lat: i64,
    lon: i64,
}

/// Flatten one record and derive its per-record columns.
fn flatten(record: &PlaceRecord) -> Result<NormalizedRecord> {
    let identity = if record.id.is_empty() {
        &record.name
    } else {
        &record.id
    };

    let location = record
        .location
        .ok_or_else(|| GridScoutError::malformed(identity, "missing coordinate"))?;
    let primary_category = record
        .categories
        .first()
        .cloned()
        .ok_or_else(|| GridScoutError::malformed(identity, "empty category list"))?;

    Ok(NormalizedRecord {
        id: record.id.clone(),
        name: record.name.clone(),
        rating: record.rating,
        rating_count: record.rating_count,
        address: record.address.clone(),
        price_tier: record.price_tier,
        latitude: location.lat,
        longitude: location.lon,
        categories: record.categories.clone(),
        primary_category,
        weighted_score: record.rating.map(|r| r * f64::from(record.rating_count)),
        location_count: 0,
        chain_weighted_score: 0.0,
        chain_rating_total: 0,
        chain_average_rating: None,
        near_reference: false,
    })
}

/// Normalize raw records.
///
/// Records sharing a name and a snapped coordinate (see [`DEDUP_GRID_DEG`])
/// are duplicates: the first one seen is kept, later ones are dropped.
/// Survivors whose primary category is not in `allowed_categories` are
/// then dropped; an empty allow-list keeps every category.
///
/// Fails with `MalformedRecord` on the first record without a coordinate
/// or without categories.
pub fn normalize(
    records: &[PlaceRecord],
    allowed_categories: &[String],
) -> Result<Vec<NormalizedRecord>> {
    let allowed: HashSet<&str> = allowed_categories.iter().map(String::as_str).collect();
    let mut seen: HashSet<DedupKey> = HashSet::with_capacity(records.len());
    let mut out = Vec::with_capacity(records.len());
    let mut duplicates = 0;
    let mut excluded = 0;

    for record in records {
        let normalized = flatten(record)?;

        let key = DedupKey {
            name: normalized.name.clone(),
            lat: snap(normalized.latitude),
            lon: snap(normalized.longitude),
        };
        if !seen.insert(key) {
            duplicates += 1;
            continue;
        }

        if !allowed.is_empty() && !allowed.contains(normalized.primary_category.as_str()) {
            debug!(
                "Dropping {} (primary category {})",
                normalized.name, normalized.primary_category
            );
            excluded += 1;
            continue;
        }

        out.push(normalized);
    }

    info!(
        "Normalized {} records: {} kept, {} duplicates, {} outside allowed categories",
        records.len(),
        out.len(),
        duplicates,
        excluded
    );

    Ok(out)
}
