//! Point-in-Polygon (PIP) region filtering.
//!
//! Loads named region boundaries and keeps the grid points they contain,
//! using an R-tree spatial index to narrow the containment tests.

mod boundary;
mod filter;
mod index;

pub use boundary::{Region, RegionPolygon};
pub use filter::{filter_to_region, unique_points, RegionMatch};
pub use index::RegionIndex;
