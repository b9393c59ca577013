//! Spatial index for fast region polygon lookups.

use geo::Contains;
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use super::{Region, RegionPolygon};
use crate::models::Coordinate;

/// Wrapper for R-tree indexing of region polygons
struct IndexedPolygon {
    /// Position of the polygon in its region
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over the polygons of a [`Region`]
pub struct RegionIndex<'a> {
    polygons: &'a [RegionPolygon],
    tree: RTree<IndexedPolygon>,
}

impl<'a> RegionIndex<'a> {
    /// Build spatial index from a region's polygons
    pub fn build(region: &'a Region) -> Self {
        let indexed: Vec<IndexedPolygon> = region
            .polygons()
            .iter()
            .enumerate()
            .filter_map(|(position, polygon)| {
                let (min_x, min_y, max_x, max_y) = polygon.bbox()?;
                Some(IndexedPolygon {
                    position,
                    envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
                })
            })
            .collect();

        let tree = RTree::bulk_load(indexed);
        debug!("Region index built with {} entries", tree.size());

        Self {
            polygons: region.polygons(),
            tree,
        }
    }

    /// Positions of every polygon containing the point, ascending.
    ///
    /// Containment is the strict interior test of `geo::Contains`: a point
    /// on a polygon's boundary is not contained by it.
    pub fn containing(&self, coordinate: Coordinate) -> Vec<usize> {
        let point = coordinate.to_point();
        let query_envelope = AABB::from_point([coordinate.lon, coordinate.lat]);

        // Use R-tree to get candidates via envelope intersection, then filter with exact containment
        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ip| self.polygons[ip.position].geometry.contains(&point))
            .map(|ip| ip.position)
            .collect();
        positions.sort_unstable();
        positions
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
