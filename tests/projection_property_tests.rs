use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use earthpaper::sky::{
    Ephemeris, GeostationaryEphemeris, ProjectionParams, StarCatalog, project,
};

const WIDTH: u32 = 1920;
const HEIGHT: u32 = 1080;

fn params(fov_degrees: f64) -> ProjectionParams {
    ProjectionParams {
        width: WIDTH,
        height: HEIGHT,
        fov_degrees,
        star_intensity: 0.5,
        radius_scale: 0.0005,
    }
}

fn instant(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}

fn ephemeris(longitude: f64) -> GeostationaryEphemeris {
    GeostationaryEphemeris::new(StarCatalog::builtin().unwrap(), longitude, 6.5)
}

proptest! {
    #[test]
    fn wider_field_never_loses_stars(
        seconds in 1_700_000_000i64..1_900_000_000i64,
        longitude in -180.0f64..180.0,
        narrow in 30.0f64..180.0,
        widen in 0.0f64..60.0,
    ) {
        let sky = ephemeris(longitude).sky_at(instant(seconds));
        let wide = (narrow + widen).min(180.0);

        let narrow_stars = project(&sky, &params(narrow)).stars;
        let wide_stars = project(&sky, &params(wide)).stars;

        prop_assert!(wide_stars.len() >= narrow_stars.len());
        for star in &narrow_stars {
            prop_assert!(wide_stars.iter().any(|s| s.id == star.id));
        }
    }

    #[test]
    fn edges_join_surviving_stars(
        seconds in 1_700_000_000i64..1_900_000_000i64,
        fov in 30.0f64..180.0,
    ) {
        let sky = ephemeris(140.7).sky_at(instant(seconds));
        let projection = project(&sky, &params(fov));

        let survives = |(x, y): (f64, f64)| {
            projection.stars.iter().any(|s| s.x == x && s.y == y)
        };
        for edge in &projection.edges {
            prop_assert!(survives(edge.from));
            prop_assert!(survives(edge.to));
        }
        for star in &projection.stars {
            prop_assert!(star.radius >= 0.0);
        }
    }

    #[test]
    fn survivors_land_on_the_canvas(
        seconds in 1_700_000_000i64..1_900_000_000i64,
        fov in 30.0f64..180.0,
    ) {
        let sky = ephemeris(140.7).sky_at(instant(seconds));
        let projection = project(&sky, &params(fov));

        // A landscape window spans the full width and is cropped to the
        // aspect ratio vertically, so survivors always land on the canvas.
        for star in &projection.stars {
            prop_assert!(star.x >= -1e-6 && star.x <= WIDTH as f64 + 1e-6);
            prop_assert!(star.y >= -1e-6 && star.y <= HEIGHT as f64 + 1e-6);
        }
    }
}
