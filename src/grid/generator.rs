//! Square search grids centered on a start coordinate.

use hashbrown::HashSet;
use std::hash::{Hash, Hasher};
use tracing::debug;

use super::coords::{destination_latitude, destination_longitude};
use crate::error::{GridScoutError, Result};
use crate::models::Coordinate;

/// Grid points are compared on coordinates snapped to this many degrees.
///
/// 1e-9 degrees is about 0.1 mm: far below the grid spacing, far above
/// the noise two platforms can leave in the same offset computation.
pub const GRID_QUANTUM_DEG: f64 = 1e-9;

fn quantize(value: f64) -> i64 {
    (value / GRID_QUANTUM_DEG).round() as i64
}

/// A search center produced by [`generate_grid`].
///
/// Equality and hashing use the quantized coordinate, so two points that
/// differ only by float representation noise are the same grid point.
#[derive(Debug, Clone, Copy)]
pub struct GridPoint {
    coordinate: Coordinate,
    key: (i64, i64),
}

impl GridPoint {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            key: (quantize(coordinate.lat), quantize(coordinate.lon)),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn lat(&self) -> f64 {
        self.coordinate.lat
    }

    pub fn lon(&self) -> f64 {
        self.coordinate.lon
    }
}

impl PartialEq for GridPoint {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for GridPoint {}

impl Hash for GridPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Deduplicated set of grid points.
///
/// Points are kept in generation order (start first, then row by row from
/// the southwest corner) but callers should treat it as a set.
#[derive(Debug, Clone)]
pub struct Grid {
    points: Vec<GridPoint>,
    members: HashSet<GridPoint>,
    candidates: usize,
}

impl Grid {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            candidates: 0,
        }
    }

    fn insert(&mut self, point: GridPoint) {
        self.candidates += 1;
        if self.members.insert(point) {
            self.points.push(point);
        }
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        self.members.contains(&GridPoint::new(coordinate))
    }

    /// Number of points offered before deduplication (the start point included).
    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridPoint> {
        self.points.iter()
    }
}

/// Tile the square of side `2 * iterations + 1` around `start`, with
/// `spacing_m` meters between neighbouring points.
pub fn generate_grid(start: Coordinate, spacing_m: f64, iterations: i32) -> Result<Grid> {
    if !spacing_m.is_finite() || spacing_m <= 0.0 {
        return Err(GridScoutError::invalid(format!(
            "grid spacing must be positive, got {} m",
            spacing_m
        )));
    }
    if iterations < 0 {
        return Err(GridScoutError::invalid(format!(
            "grid iterations must be non-negative, got {}",
            iterations
        )));
    }
    let start = Coordinate::new(start.lat, start.lon)?;

    let offsets: Vec<f64> = (-iterations..=iterations)
        .map(|k| f64::from(k) * spacing_m)
        .collect();

    // Rows and columns are independent: latitude only depends on i,
    // longitude only on j (always scaled at the start latitude).
    let lats = offsets
        .iter()
        .map(|&m| destination_latitude(start.lat, m))
        .collect::<Result<Vec<_>>>()?;
    let lons = offsets
        .iter()
        .map(|&m| destination_longitude(start.lon, start.lat, m))
        .collect::<Result<Vec<_>>>()?;

    let side = offsets.len();
    let mut grid = Grid::with_capacity(side * side + 1);
    grid.insert(GridPoint::new(start));

    for &lat in &lats {
        for &lon in &lons {
            grid.insert(GridPoint::new(Coordinate::new(lat, lon)?));
        }
    }

    debug!(
        "Generated {} grid points from {} candidates around ({})",
        grid.len(),
        grid.candidates(),
        start
    );

    Ok(grid)
}
