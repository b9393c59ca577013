//! Restricting a search grid to a region.

use hashbrown::HashSet;
use rayon::prelude::*;
use tracing::info;

use super::{Region, RegionIndex};
use crate::grid::GridPoint;
use crate::models::Coordinate;

/// A grid point paired with a region polygon containing it
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMatch {
    pub point: GridPoint,
    pub polygon: String,
}

/// Keep the grid points that fall inside any polygon of `region`.
///
/// One match is produced per (polygon, point) containment, so a point
/// inside two overlapping polygons appears twice. Output is grouped by
/// polygon in region order, and within a polygon follows `points` order:
/// the same result as filtering against each polygon in turn and
/// concatenating.
pub fn filter_to_region(points: &[GridPoint], region: &Region) -> Vec<RegionMatch> {
    if region.is_empty() || points.is_empty() {
        return Vec::new();
    }

    let index = RegionIndex::build(region);

    let mut hits: Vec<(usize, usize)> = points
        .par_iter()
        .enumerate()
        .flat_map_iter(|(point_idx, point)| {
            index
                .containing(point.coordinate())
                .into_iter()
                .map(move |polygon_idx| (polygon_idx, point_idx))
        })
        .collect();
    hits.sort_unstable();

    let polygons = region.polygons();
    let matches: Vec<RegionMatch> = hits
        .into_iter()
        .map(|(polygon_idx, point_idx)| RegionMatch {
            point: points[point_idx],
            polygon: polygons[polygon_idx].name.clone(),
        })
        .collect();

    info!(
        "{} of {} grid points fall within {} region polygons ({} matches)",
        unique_points(&matches).len(),
        points.len(),
        region.len(),
        matches.len()
    );

    matches
}

/// Distinct matched coordinates, in order of first appearance.
pub fn unique_points(matches: &[RegionMatch]) -> Vec<Coordinate> {
    let mut seen = HashSet::with_capacity(matches.len());
    matches
        .iter()
        .filter(|m| seen.insert(m.point))
        .map(|m| m.point.coordinate())
        .collect()
}
