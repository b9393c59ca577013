//! Region boundaries loaded from GeoJSON.

use geo::{BoundingRect, CoordsIter, MultiPolygon};
use geojson::{Feature, GeoJson};
use tracing::{debug, info, warn};

use crate::error::{GridScoutError, Result};

/// A single named region polygon
#[derive(Debug, Clone)]
pub struct RegionPolygon {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl RegionPolygon {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    /// Get the bounding box of this polygon as (min_lon, min_lat, max_lon, max_lat)
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

/// Ordered collection of named polygons used for containment tests.
///
/// Order matters: region filter output follows it.
#[derive(Debug, Clone, Default)]
pub struct Region {
    polygons: Vec<RegionPolygon>,
}

impl Region {
    pub fn new(polygons: Vec<RegionPolygon>) -> Self {
        Self { polygons }
    }

    /// Parse a GeoJSON document into a region, naming each polygon after
    /// the `name_property` of its feature.
    ///
    /// Coordinates must already be WGS84 longitude/latitude; features
    /// without areal geometry are skipped.
    pub fn from_geojson(text: &str, name_property: &str) -> Result<Self> {
        let features = match text.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
        };

        let mut polygons = Vec::with_capacity(features.len());

        for (position, feature) in features.into_iter().enumerate() {
            let name = feature_name(&feature, name_property)
                .unwrap_or_else(|| format!("feature-{}", position));

            let Some(geometry) = feature.geometry else {
                warn!("Region feature {} has no geometry, skipping", name);
                continue;
            };

            let geometry = match geo::Geometry::<f64>::try_from(geometry)? {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                _ => {
                    warn!("Region feature {} is not a polygon, skipping", name);
                    continue;
                }
            };

            if let Some(c) = geometry
                .coords_iter()
                .find(|c| !(-180.0..=180.0).contains(&c.x) || !(-90.0..=90.0).contains(&c.y))
            {
                return Err(GridScoutError::invalid(format!(
                    "region feature {} has coordinate ({}, {}) outside WGS84 bounds",
                    name, c.x, c.y
                )));
            }

            debug!("Loaded region polygon {}", name);
            polygons.push(RegionPolygon::new(name, geometry));
        }

        info!("Loaded {} region polygons", polygons.len());
        Ok(Self { polygons })
    }

    /// Keep only the polygons whose name is in `names`, in region order.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        let polygons: Vec<RegionPolygon> = self
            .polygons
            .iter()
            .filter(|p| names.iter().any(|n| n == &p.name))
            .cloned()
            .collect();

        if polygons.is_empty() {
            return Err(GridScoutError::invalid(format!(
                "no region polygon named {:?}",
                names
            )));
        }

        Ok(Self { polygons })
    }

    pub fn polygons(&self) -> &[RegionPolygon] {
        &self.polygons
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.polygons.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

fn feature_name(feature: &Feature, name_property: &str) -> Option<String> {
    match feature.property(name_property)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTY: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"NAME": "SALT LAKE"},
                "geometry": {"type": "Polygon", "coordinates": [[[-112.0, 40.7], [-111.8, 40.7], [-111.8, 40.8], [-112.0, 40.8], [-112.0, 40.7]]]}
            },
            {
                "type": "Feature",
                "properties": {"NAME": "MURRAY"},
                "geometry": {"type": "MultiPolygon", "coordinates": [[[[-111.9, 40.6], [-111.8, 40.6], [-111.8, 40.7], [-111.9, 40.7], [-111.9, 40.6]]]]}
            },
            {
                "type": "Feature",
                "properties": {"NAME": "TRAILHEAD"},
                "geometry": {"type": "Point", "coordinates": [-111.7, 40.6]}
            }
        ]
    }"#;

    #[test]
    fn test_from_geojson_keeps_polygons_in_order() {
        let region = Region::from_geojson(COUNTY, "NAME").unwrap();
        assert_eq!(region.len(), 2);
        assert_eq!(region.names().collect::<Vec<_>>(), vec!["SALT LAKE", "MURRAY"]);
        assert_eq!(
            region.polygons()[0].bbox(),
            Some((-112.0, 40.7, -111.8, 40.8))
        );
    }

    #[test]
    fn test_select_by_name() {
        let region = Region::from_geojson(COUNTY, "NAME").unwrap();
        let city = region.select(&["SALT LAKE".to_string()]).unwrap();
        assert_eq!(city.len(), 1);
        assert!(matches!(
            region.select(&["PROVO".to_string()]),
            Err(GridScoutError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_missing_name_property_falls_back_to_position() {
        let region = Region::from_geojson(COUNTY, "CITY").unwrap();
        assert_eq!(region.names().collect::<Vec<_>>(), vec!["feature-0", "feature-1"]);
    }

    #[test]
    fn test_projected_coordinates_rejected() {
        let projected = r#"{"type": "Polygon", "coordinates": [[[420000.0, 4500000.0], [421000.0, 4500000.0], [421000.0, 4501000.0], [420000.0, 4500000.0]]]}"#;
        assert!(matches!(
            Region::from_geojson(projected, "NAME"),
            Err(GridScoutError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_malformed_geojson() {
        assert!(matches!(
            Region::from_geojson("{\"type\": \"Nope\"}", "NAME"),
            Err(GridScoutError::GeoJson(_))
        ));
    }
}
