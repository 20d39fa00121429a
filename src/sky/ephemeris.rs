//! Celestial positions as seen from a geostationary satellite.
//!
//! All vectors are unit vectors in the equatorial frame (x towards the vernal
//! equinox, z towards the north celestial pole). Stars are far enough away that
//! their direction from the satellite equals their catalog direction.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use std::f64::consts::TAU;

use super::catalog::StarCatalog;

const SECONDS_PER_DAY: f64 = 86_400.0;
const UNIX_EPOCH_JULIAN_DATE: f64 = 2_440_587.5;
const J2000_JULIAN_DATE: f64 = 2_451_545.0;
const DAYS_PER_CENTURY: f64 = 36_525.0;

/// A catalog star resolved to a direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyStar {
    pub id: u32,
    pub direction: Vector3<f64>,
    pub magnitude: f64,
}

/// Everything the projector needs for one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SkySnapshot {
    /// From the satellite towards the Earth's centre.
    pub satellite_direction: Vector3<f64>,
    pub stars: Vec<SkyStar>,
    pub constellation_edges: Vec<(u32, u32)>,
    /// Faintest magnitude in `stars`; sizes are scaled against it.
    pub limiting_magnitude: f64,
}

/// Source of sky snapshots.
pub trait Ephemeris: Send + Sync {
    fn sky_at(&self, instant: DateTime<Utc>) -> SkySnapshot;
}

/// A satellite parked over a fixed longitude on the equator.
#[derive(Debug, Clone)]
pub struct GeostationaryEphemeris {
    longitude: f64,
    stars: Vec<SkyStar>,
    edges: Vec<(u32, u32)>,
    limiting_magnitude: f64,
}

impl GeostationaryEphemeris {
    /// Stars fainter than `limiting_magnitude` are dropped here, once.
    pub fn new(catalog: &StarCatalog, longitude_degrees: f64, limiting_magnitude: f64) -> Self {
        let stars = catalog
            .stars
            .iter()
            .filter(|star| star.magnitude <= limiting_magnitude)
            .map(|star| SkyStar {
                id: star.id,
                direction: equatorial_to_vector(star.ra, star.dec),
                magnitude: star.magnitude,
            })
            .collect();

        Self {
            longitude: longitude_degrees.to_radians(),
            stars,
            edges: catalog.edges(),
            limiting_magnitude,
        }
    }

    pub fn star_count(&self) -> usize {
        self.stars.len()
    }
}

impl Ephemeris for GeostationaryEphemeris {
    fn sky_at(&self, instant: DateTime<Utc>) -> SkySnapshot {
        // The satellite sits at right ascension GMST + longitude; the Earth's
        // centre is in the opposite direction.
        let earth_ra = gmst_radians(instant) + self.longitude + std::f64::consts::PI;
        SkySnapshot {
            satellite_direction: Vector3::new(earth_ra.cos(), earth_ra.sin(), 0.0),
            stars: self.stars.clone(),
            constellation_edges: self.edges.clone(),
            limiting_magnitude: self.limiting_magnitude,
        }
    }
}

/// Greenwich mean sidereal time in radians, IAU 1982 expression.
pub fn gmst_radians(instant: DateTime<Utc>) -> f64 {
    let unix_seconds =
        instant.timestamp() as f64 + instant.timestamp_subsec_nanos() as f64 * 1e-9;
    let julian_date = unix_seconds / SECONDS_PER_DAY + UNIX_EPOCH_JULIAN_DATE;
    let t = (julian_date - J2000_JULIAN_DATE) / DAYS_PER_CENTURY;

    let seconds = 67_310.548_41 + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
        + 0.093_104 * t * t
        - 6.2e-6 * t * t * t;

    seconds.rem_euclid(SECONDS_PER_DAY) / SECONDS_PER_DAY * TAU
}

/// Unit vector for right ascension and declination in degrees.
pub fn equatorial_to_vector(ra_degrees: f64, dec_degrees: f64) -> Vector3<f64> {
    let (ra, dec) = (ra_degrees.to_radians(), dec_degrees.to_radians());
    Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
}
