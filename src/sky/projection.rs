//! Stereographic star projection centred on the satellite's line of sight.
//!
//! The plane is oriented so that x grows westward and y northward as seen by
//! the satellite looking at the Earth. A field of view of `fov` degrees maps
//! to a square window of half-width
//!
//! ```text
//! θ     = π − (fov / 360) · π
//! limit = sin θ / (1 − cos θ)
//! ```
//!
//! in projection units. Culling is inclusive: a star exactly on the limit is
//! kept.

use nalgebra::Vector3;
use std::collections::HashMap;
use std::f64::consts::PI;

use super::ephemeris::SkySnapshot;
use crate::common::constants::ANTIPODAL_EPSILON;

/// A star that survived culling, in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedStar {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// A constellation edge whose endpoints both survived culling.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedEdge {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub stars: Vec<ObservedStar>,
    pub edges: Vec<ProjectedEdge>,
    /// Half-width of the window in projection units.
    pub limit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub width: u32,
    pub height: u32,
    pub fov_degrees: f64,
    pub star_intensity: f64,
    pub radius_scale: f64,
}

/// Window half-width for a field of view in degrees.
pub fn projection_limit(fov_degrees: f64) -> f64 {
    let theta = PI - (fov_degrees / 360.0) * PI;
    theta.sin() / (1.0 - theta.cos())
}

/// Project `direction` about `center`. `None` for the antipode.
pub fn stereographic(center: &Vector3<f64>, direction: &Vector3<f64>) -> Option<(f64, f64)> {
    let denominator = 1.0 + direction.dot(center);
    if denominator <= ANTIPODAL_EPSILON {
        return None;
    }

    let (east, north) = tangent_basis(center);
    let x = -direction.dot(&east) / denominator;
    let y = direction.dot(&north) / denominator;
    Some((x, y))
}

/// Unit vectors spanning the plane perpendicular to `center`, aligned with
/// increasing right ascension and declination.
fn tangent_basis(center: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let horizontal = center.x.hypot(center.y);
    if horizontal < ANTIPODAL_EPSILON {
        // Looking along the pole; any orthonormal pair will do
        let east = Vector3::new(0.0, 1.0, 0.0);
        let north = center.cross(&east);
        return (east, north);
    }
    let east = Vector3::new(-center.y / horizontal, center.x / horizontal, 0.0);
    let north = Vector3::new(
        -center.z * center.x / horizontal,
        -center.z * center.y / horizontal,
        horizontal,
    );
    (east, north)
}

/// Relative display size from magnitude: 1 for the brightest star of the
/// snapshot, falling quadratically to a small value at the limiting magnitude.
fn size_factor(magnitude: f64, brightest: f64, limiting: f64) -> f64 {
    let span = 0.5 + limiting - brightest;
    let own = (0.5 + limiting - magnitude).max(0.0);
    (own * own) / (span * span)
}

/// Project, cull and scale a snapshot into pixel space.
pub fn project(sky: &SkySnapshot, params: &ProjectionParams) -> Projection {
    let limit = projection_limit(params.fov_degrees);
    let width = params.width as f64;
    let height = params.height as f64;
    let max_dim = width.max(height);
    let limit_y = limit * height / width;

    let x_offset = (max_dim - width) / 2.0;
    let y_offset = (max_dim - height) / 2.0;
    let to_pixels = |x: f64, y: f64| {
        (
            max_dim * (x + limit) / (2.0 * limit) - x_offset,
            max_dim * (limit - y) / (2.0 * limit) - y_offset,
        )
    };

    let brightest = sky
        .stars
        .iter()
        .map(|star| star.magnitude)
        .fold(f64::INFINITY, f64::min);

    let mut stars = Vec::new();
    let mut positions = HashMap::new();
    for star in &sky.stars {
        if star.magnitude > sky.limiting_magnitude {
            continue;
        }
        let Some((x, y)) = stereographic(&sky.satellite_direction, &star.direction) else {
            continue;
        };
        if x.abs() > limit || y.abs() > limit_y {
            continue;
        }

        let (px, py) = to_pixels(x, y);
        let radius = size_factor(star.magnitude, brightest, sky.limiting_magnitude)
            * params.star_intensity
            * max_dim
            * params.radius_scale;
        positions.insert(star.id, (px, py));
        stars.push(ObservedStar {
            id: star.id,
            x: px,
            y: py,
            radius,
        });
    }

    let edges = sky
        .constellation_edges
        .iter()
        .filter_map(|(a, b)| {
            Some(ProjectedEdge {
                from: *positions.get(a)?,
                to: *positions.get(b)?,
            })
        })
        .collect();

    Projection {
        stars,
        edges,
        limit,
    }
}
