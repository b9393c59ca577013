//! Turning collected records into the clean, aggregated data set.

mod aggregate;
mod normalize;
mod summary;

pub use aggregate::{aggregate, ReferencePoint};
pub use normalize::{normalize, DEDUP_GRID_DEG, DEFAULT_ALLOWED_CATEGORIES};
pub use summary::{summarize, ChainLine, PlaceLine, RatingDistribution, SummaryOptions, SummaryStats};
