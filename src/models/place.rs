//! Coordinates and raw place records as returned by the places service.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GridScoutError, Result};

/// Geographic point (lat/lon, WGS84 degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside the WGS84 ranges.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GridScoutError::invalid(format!(
                "latitude {} outside [-90, 90]",
                lat
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(GridScoutError::invalid(format!(
                "longitude {} outside [-180, 180]",
                lon
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Parse the `"lat, lon"` form used on the command line and in config.
    pub fn parse(s: &str) -> Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| GridScoutError::invalid(format!("expected \"lat, lon\", got {:?}", s)))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| GridScoutError::invalid(format!("bad latitude in {:?}", s)))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| GridScoutError::invalid(format!("bad longitude in {:?}", s)))?;
        Self::new(lat, lon)
    }

    /// geo uses x = lon, y = lat
    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// Ordinal price tier reported by the places service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PriceTier {
    Free,
    Inexpensive,
    Moderate,
    Expensive,
    VeryExpensive,
}

impl PriceTier {
    /// Map the `PRICE_LEVEL_*` enum names of the Places (New) API.
    pub fn from_api_name(name: &str) -> Option<Self> {
        match name {
            "PRICE_LEVEL_FREE" => Some(PriceTier::Free),
            "PRICE_LEVEL_INEXPENSIVE" => Some(PriceTier::Inexpensive),
            "PRICE_LEVEL_MODERATE" => Some(PriceTier::Moderate),
            "PRICE_LEVEL_EXPENSIVE" => Some(PriceTier::Expensive),
            "PRICE_LEVEL_VERY_EXPENSIVE" => Some(PriceTier::VeryExpensive),
            _ => None,
        }
    }
}

impl TryFrom<u8> for PriceTier {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(PriceTier::Free),
            1 => Ok(PriceTier::Inexpensive),
            2 => Ok(PriceTier::Moderate),
            3 => Ok(PriceTier::Expensive),
            4 => Ok(PriceTier::VeryExpensive),
            other => Err(format!("price tier {} outside 0-4", other)),
        }
    }
}

impl From<PriceTier> for u8 {
    fn from(tier: PriceTier) -> Self {
        tier as u8
    }
}

/// A place exactly as collected, before any normalization.
///
/// The location stays nested and optional here: the service does not
/// guarantee it, and normalization is where a missing one is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Service identifier (may be empty for records read back from older files)
    pub id: String,

    /// Display name; the identity used for chains and dedup
    pub name: String,

    pub rating: Option<f64>,

    pub rating_count: u32,

    /// Short formatted address ("vicinity")
    pub address: String,

    /// Service categories, most specific first
    pub categories: Vec<String>,

    pub location: Option<Coordinate>,

    pub price_tier: Option<PriceTier>,
}
