//! Core data models for the collection pipeline.

pub mod normalized;
pub mod place;

pub use normalized::NormalizedRecord;
pub use place::{Coordinate, PlaceRecord, PriceTier};
