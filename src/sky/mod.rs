//! Celestial data and the star field projector.

pub mod catalog;
pub mod ephemeris;
pub mod projection;

pub use catalog::{CatalogStar, Constellation, StarCatalog};
pub use ephemeris::{Ephemeris, GeostationaryEphemeris, SkySnapshot, SkyStar};
pub use projection::{ObservedStar, ProjectedEdge, Projection, ProjectionParams, project};
