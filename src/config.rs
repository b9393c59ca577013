use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Coordinate;
use crate::places::{PlacesApi, PlacesClientOptions, RESTAURANT_TYPES};
use crate::transform::{ReferencePoint, SummaryOptions, DEFAULT_ALLOWED_CATEGORIES};

const SLC_COUNTY_BOUNDARIES: &str = "https://slco.org/slcogis/rest/services/Administration/MapServer/3/query?outFields=*&where=1%3D1&f=geojson";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub region: RegionConfig,
    pub transform: TransformConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub start: Coordinate,
    /// Distance between neighbouring grid points
    pub spacing_m: f64,
    pub iterations: i32,
    /// Search circle radius per point
    pub radius_m: f64,
    pub api: PlacesApi,
    pub concurrency: usize,
    pub page_delay_ms: u64,
    pub included_types: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            start: Coordinate {
                lat: 40.7606586,
                lon: -111.8927191,
            },
            spacing_m: 500.0,
            iterations: 10,
            radius_m: 500.0,
            api: PlacesApi::Legacy,
            concurrency: 4,
            page_delay_ms: 3000,
            included_types: RESTAURANT_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl SearchConfig {
    pub fn client_options(&self) -> PlacesClientOptions {
        PlacesClientOptions {
            api: self.api,
            radius_m: self.radius_m,
            page_delay: Duration::from_millis(self.page_delay_ms),
            included_types: self.included_types.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RegionConfig {
    /// GeoJSON URL or local path
    pub source: String,
    /// Feature property holding the polygon name
    pub name_property: String,
    /// Only keep polygons with these names (all when empty)
    pub select: Vec<String>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            source: SLC_COUNTY_BOUNDARIES.to_string(),
            name_property: "NAME".to_string(),
            select: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TransformConfig {
    pub allowed_categories: Vec<String>,
    pub reference: ReferencePoint,
    pub summary: SummaryOptions,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            allowed_categories: default_allowed_categories(),
            reference: ReferencePoint::default(),
            summary: SummaryOptions::default(),
        }
    }
}

/// Legacy restaurant categories plus every type the nearby search requests
fn default_allowed_categories() -> Vec<String> {
    let mut categories: Vec<String> = DEFAULT_ALLOWED_CATEGORIES
        .iter()
        .map(|c| c.to_string())
        .collect();
    for t in RESTAURANT_TYPES {
        if !categories.iter().any(|c| c == t) {
            categories.push(t.to_string());
        }
    }
    categories
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub raw_dir: PathBuf,
    pub clean_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("./output/data"),
            clean_dir: PathBuf::from("./output/clean"),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content).context("Failed to parse config file")?;
        Coordinate::new(config.search.start.lat, config.search.start.lon)
            .context("Invalid search start")?;
        config.accept_requested_types();
        Ok(config)
    }

    /// Nearby searches only return the requested primary types, so those
    /// types always pass the category allow-list.
    pub fn accept_requested_types(&mut self) {
        let allowed = &mut self.transform.allowed_categories;
        if self.search.api != PlacesApi::Nearby || allowed.is_empty() {
            return;
        }
        for t in &self.search.included_types {
            if !allowed.contains(t) {
                allowed.push(t.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.search.spacing_m, 500.0);
        assert_eq!(config.search.api, PlacesApi::Legacy);
        assert_eq!(config.region.name_property, "NAME");
        let allowed = &config.transform.allowed_categories;
        assert_eq!(allowed.len(), RESTAURANT_TYPES.len());
        for c in DEFAULT_ALLOWED_CATEGORIES.iter().chain(RESTAURANT_TYPES) {
            assert!(allowed.iter().any(|a| a == c), "{} missing", c);
        }
        assert!(!allowed.iter().any(|a| a == "bar"));
        assert_eq!(config.transform.summary.min_ratings, 100);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [search]
            start = { lat = 40.0, lon = -111.0 }
            iterations = 2
            api = "nearby"

            [region]
            source = "regions.geojson"
            select = ["SALT LAKE"]

            [transform.reference]
            name = "Stadium"
            coordinate = { lat = 40.76, lon = -111.9 }
            radius_m = 300.0
            "#,
        )
        .unwrap();
        assert_eq!(config.search.iterations, 2);
        assert_eq!(config.search.spacing_m, 500.0);
        assert_eq!(config.search.api, PlacesApi::Nearby);
        assert_eq!(config.region.select, vec!["SALT LAKE"]);
        assert_eq!(config.transform.reference.name, "Stadium");
        assert_eq!(config.output.raw_dir, PathBuf::from("./output/data"));
        assert_eq!(
            config.search.client_options().page_delay,
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_nearby_accepts_requested_types() {
        let config = Config::from_toml(
            r#"
            [search]
            api = "nearby"
            included_types = ["food_court", "restaurant"]

            [transform]
            allowed_categories = ["restaurant"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.transform.allowed_categories,
            vec!["restaurant", "food_court"]
        );

        let legacy = Config::from_toml(
            r#"
            [search]
            included_types = ["food_court"]

            [transform]
            allowed_categories = ["restaurant"]
            "#,
        )
        .unwrap();
        assert_eq!(legacy.transform.allowed_categories, vec!["restaurant"]);

        // an empty allow-list already keeps everything
        let open = Config::from_toml(
            "[search]\napi = \"nearby\"\n[transform]\nallowed_categories = []",
        )
        .unwrap();
        assert!(open.transform.allowed_categories.is_empty());
    }

    #[test]
    fn test_invalid_start_rejected() {
        assert!(Config::from_toml("[search]\nstart = { lat = 95.0, lon = 0.0 }").is_err());
    }
}
