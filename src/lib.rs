//! GridScout - restaurant listings collected over a search grid
//!
//! This library provides the grid, region filter, collection and transform
//! stages shared by the download and compile binaries.

pub mod collect;
pub mod config;
pub mod error;
pub mod grid;
pub mod models;
pub mod output;
pub mod pip;
pub mod pipeline;
pub mod places;
pub mod transform;

pub use error::{GridScoutError, Result};
pub use models::{Coordinate, NormalizedRecord, PlaceRecord, PriceTier};
