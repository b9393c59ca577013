//! Search grid generation.
//!
//! Converts meter spacings into degree offsets and tiles a square area
//! around a start coordinate with deduplicated search centers.

mod coords;
mod generator;

pub use coords::{
    destination_latitude, destination_longitude, haversine_distance_m, EARTH_RADIUS_KM,
};
pub use generator::{generate_grid, Grid, GridPoint, GRID_QUANTUM_DEG};
