//! CSV and JSON persistence of collected and compiled data.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::collect::PointFailure;
use crate::error::{GridScoutError, Result};
use crate::models::{Coordinate, NormalizedRecord, PlaceRecord, PriceTier};
use crate::pip::RegionMatch;
use crate::transform::SummaryStats;

/// Directory for one run under `root`, named after its start time
pub fn run_dir(root: &Path, started: DateTime<Local>) -> PathBuf {
    root.join(started.format("%Y-%m-%d-%H-%M").to_string())
}

/// Raw CSV row (nested fields flattened, categories comma-joined)
#[derive(Debug, Serialize, Deserialize)]
struct RawRow {
    #[serde(default)]
    id: String,
    name: String,
    rating: Option<f64>,
    rating_count: Option<u32>,
    address: Option<String>,
    price_tier: Option<PriceTier>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    categories: String,
}

impl From<&PlaceRecord> for RawRow {
    fn from(record: &PlaceRecord) -> Self {
        RawRow {
            id: record.id.clone(),
            name: record.name.clone(),
            rating: record.rating,
            rating_count: Some(record.rating_count),
            address: Some(record.address.clone()),
            price_tier: record.price_tier,
            latitude: record.location.map(|l| l.lat),
            longitude: record.location.map(|l| l.lon),
            categories: record.categories.join(","),
        }
    }
}

impl RawRow {
    fn into_record(self) -> Result<PlaceRecord> {
        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)?),
            _ => None,
        };
        Ok(PlaceRecord {
            id: self.id,
            name: self.name,
            rating: self.rating,
            rating_count: self.rating_count.unwrap_or(0),
            address: self.address.unwrap_or_default(),
            categories: split_categories(&self.categories),
            location,
            price_tier: self.price_tier,
        })
    }
}

fn split_categories(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

/// Clean CSV row: raw columns plus the derived ones
#[derive(Debug, Serialize)]
struct CleanRow<'a> {
    id: &'a str,
    name: &'a str,
    rating: Option<f64>,
    rating_count: u32,
    address: &'a str,
    price_tier: Option<PriceTier>,
    latitude: f64,
    longitude: f64,
    categories: String,
    primary_category: &'a str,
    weighted_score: Option<f64>,
    location_count: usize,
    chain_weighted_score: f64,
    chain_rating_total: u64,
    chain_average_rating: Option<f64>,
    near_reference: bool,
}

impl<'a> From<&'a NormalizedRecord> for CleanRow<'a> {
    fn from(r: &'a NormalizedRecord) -> Self {
        CleanRow {
            id: &r.id,
            name: &r.name,
            rating: r.rating,
            rating_count: r.rating_count,
            address: &r.address,
            price_tier: r.price_tier,
            latitude: r.latitude,
            longitude: r.longitude,
            categories: r.categories.join(","),
            primary_category: &r.primary_category,
            weighted_score: r.weighted_score,
            location_count: r.location_count,
            chain_weighted_score: r.chain_weighted_score,
            chain_rating_total: r.chain_rating_total,
            chain_average_rating: r.chain_average_rating,
            near_reference: r.near_reference,
        }
    }
}

pub fn write_raw_csv(path: &Path, records: &[PlaceRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(RawRow::from(record))?;
    }
    writer.flush()?;
    info!("Wrote {} raw records to {}", records.len(), path.display());
    Ok(())
}

pub fn read_raw_csv(path: &Path) -> Result<Vec<PlaceRecord>> {
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    reader
        .deserialize::<RawRow>()
        .map(|row| row.map_err(GridScoutError::from).and_then(RawRow::into_record))
        .collect()
}

/// Read every `.csv` file below `dir`, in path order.
pub fn read_raw_dir(dir: &Path) -> Result<Vec<PlaceRecord>> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "csv"))
        .collect();
    files.sort();

    let mut records = Vec::new();
    for file in &files {
        let batch = read_raw_csv(file)?;
        info!("Read {} records from {}", batch.len(), file.display());
        records.extend(batch);
    }

    info!("Read {} records from {} files", records.len(), files.len());
    Ok(records)
}

pub fn write_clean_csv(path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(CleanRow::from(record))?;
    }
    writer.flush()?;
    info!("Wrote {} clean records to {}", records.len(), path.display());
    Ok(())
}

/// Write the region-filtered search grid, one row per match.
pub fn write_grid_csv(path: &Path, matches: &[RegionMatch]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["latitude", "longitude", "polygon"])?;
    for m in matches {
        writer.write_record([
            m.point.lat().to_string(),
            m.point.lon().to_string(),
            m.polygon.clone(),
        ])?;
    }
    writer.flush()?;
    info!("Wrote {} grid matches to {}", matches.len(), path.display());
    Ok(())
}

/// Write the points whose search failed, so they can be retried.
pub fn write_failures_csv(path: &Path, failures: &[PointFailure]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["index", "latitude", "longitude", "error"])?;
    for f in failures {
        writer.write_record([
            f.index.to_string(),
            f.point.lat.to_string(),
            f.point.lon.to_string(),
            f.error.clone(),
        ])?;
    }
    writer.flush()?;
    warn!("Wrote {} failed points to {}", failures.len(), path.display());
    Ok(())
}

pub fn write_summary(path: &Path, stats: &SummaryStats) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(stats)?)?;
    info!("Wrote summary statistics to {}", path.display());
    Ok(())
}
