//! Geometry utilities.
//!
//! Great-circle distance and forward azimuth on a spherical earth.
//! All coordinates use WGS84 (lat/lon in degrees).

use serde::{Deserialize, Serialize};

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Earth radius in meters (WGS84 mean).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine distance between two points in meters.
pub fn haversine(a: &Point, b: &Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine(&w[0], &w[1]))
        .sum()
}

/// Forward azimuth from (lat1, lon1) to (lat2, lon2) in degrees [0, 360).
///
/// Identical points yield 0.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let y = dlon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos();

    let normalized = y.atan2(x).to_degrees().rem_euclid(360.0);
    // Tiny negative angles round up to exactly 360
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Bearing between two points, see [`bearing`].
pub fn bearing_between(a: &Point, b: &Point) -> f64 {
    bearing(a.lat, a.lon, b.lat, b.lon)
}

/// Point displaced `meters` from `origin` along `bearing_deg`.
///
/// Spherical destination formula; used to synthesize positions at a
/// known distance from a maneuver point.
pub fn offset(origin: &Point, bearing_deg: f64, meters: f64) -> Point {
    let delta = meters / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.lat.to_radians();
    let lambda1 = origin.lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    Point {
        lat: phi2.to_degrees(),
        lon: lambda2.to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> Point {
        Point { lat, lon }
    }

    #[test]
    fn haversine_same_point() {
        let p = pt(33.5902, 130.4017);
        assert!((haversine(&p, &p)).abs() < 0.01);
    }

    #[test]
    fn haversine_known_distance() {
        // Fukuoka to Kitakyushu (Kokura) ~55 km
        let fukuoka = pt(33.5902, 130.4017);
        let kokura = pt(33.8869, 130.8826);
        let dist = haversine(&fukuoka, &kokura);
        assert!(dist > 50_000.0 && dist < 60_000.0,
            "Expected ~55 km, got {:.0} m", dist);
    }

    #[test]
    fn polyline_length_simple() {
        let line = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(0.0, 2.0)];
        let len = polyline_length(&line);
        assert!(len > 200_000.0 && len < 230_000.0,
            "Expected ~222 km, got {:.0} m", len);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let b = bearing(0.0, 0.0, 1.0, 0.0);
        assert!(b.abs() < 0.1, "Expected ~0, got {b}");
        let b = bearing(0.0, 0.0, 0.0, 1.0);
        assert!((b - 90.0).abs() < 0.1, "Expected ~90, got {b}");
        let b = bearing(1.0, 0.0, 0.0, 0.0);
        assert!((b - 180.0).abs() < 0.1, "Expected ~180, got {b}");
        let b = bearing(0.0, 1.0, 0.0, 0.0);
        assert!((b - 270.0).abs() < 0.1, "Expected ~270, got {b}");
    }

    #[test]
    fn bearing_stays_in_range() {
        let b = bearing(33.59, 130.40, 33.60, 130.39);
        assert!((0.0..360.0).contains(&b), "out of range: {b}");
        assert!(b > 270.0, "Expected north-west, got {b}");
    }

    #[test]
    fn bearing_to_self_is_zero() {
        assert_eq!(bearing(33.59, 130.40, 33.59, 130.40), 0.0);
    }

    #[test]
    fn offset_lands_at_requested_distance() {
        let origin = pt(33.5902, 130.4017);
        let moved = offset(&origin, 45.0, 150.0);
        let dist = haversine(&origin, &moved);
        assert!((dist - 150.0).abs() < 0.5, "Expected ~150 m, got {dist:.2}");
        let b = bearing_between(&origin, &moved);
        assert!((b - 45.0).abs() < 0.5, "Expected ~45, got {b}");
    }
}
