//! Places lookup service.
//!
//! [`PlaceSearch`] is the seam the collection driver depends on;
//! [`PlacesClient`] implements it against the Google places APIs.

mod client;
mod response;

pub use client::{PlaceSearch, PlacesApi, PlacesClient, PlacesClientOptions, RESTAURANT_TYPES};
