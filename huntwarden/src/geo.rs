// huntwarden/src/geo.rs
//
// Geodesy + small statistics helpers shared by the location, fraud and
// behavior paths.
//
// Distances are great-circle (haversine) over a spherical Earth of radius
// 6 371 000 m. Antipodal points come out at ≈ 20 015 km.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Coordinates with fewer decimal digits than this are treated as rounded
/// (hand-entered or spoofed fixes rarely carry full precision).
pub const MIN_COORD_DECIMALS: usize = 4;

// ── Points ────────────────────────────────────────────────────────────────────

/// A timestamped position. Accepts both `lat/lon` and `latitude/longitude`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lon: f64,
    /// Unix seconds. Missing timestamps disable speed checks for the segment.
    #[serde(default)]
    pub timestamp: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64, timestamp: f64) -> Self {
        Self { lat, lon, timestamp }
    }
}

/// Great-circle distance in metres.
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lon.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lon.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Clamp guards asin against 1.0000000000000002 at the antipode
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `a` to `b`, degrees in [0, 360).
pub fn initial_bearing_deg(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lon.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lon.to_radians());
    let dlon = lon2 - lon1;

    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    x.atan2(y).to_degrees().rem_euclid(360.0)
}

/// Speed between consecutive fixes in m/s. `None` when Δt ≤ 0.
pub fn speed_mps(a: &GeoPoint, b: &GeoPoint) -> Option<f64> {
    let dt = b.timestamp - a.timestamp;
    if dt <= 0.0 { return None; }
    Some(haversine_m(a, b) / dt)
}

pub fn speed_kmh(a: &GeoPoint, b: &GeoPoint) -> Option<f64> {
    speed_mps(a, b).map(|v| v * 3.6)
}

/// Segments whose implied speed exceeds `limit_kmh`, as (index, km/h).
pub fn impossible_segments(points: &[GeoPoint], limit_kmh: f64) -> Vec<(usize, f64)> {
    points.windows(2).enumerate()
        .filter_map(|(i, w)| speed_kmh(&w[0], &w[1]).map(|v| (i + 1, v)))
        .filter(|(_, v)| *v > limit_kmh)
        .collect()
}

// ── Coordinate precision ──────────────────────────────────────────────────────

/// Decimal digits in the shortest round-trip representation of `x`.
/// Integral values have zero.
pub fn decimal_places(x: f64) -> usize {
    if !x.is_finite() { return 0; }
    let repr = format!("{}", x);
    match repr.split_once('.') {
        Some((_, frac)) => frac.len(),
        None            => 0,
    }
}

pub fn is_rounded(x: f64) -> bool {
    decimal_places(x) < MIN_COORD_DECIMALS
}

/// A fix is rounded if either axis is.
pub fn point_is_rounded(p: &GeoPoint) -> bool {
    is_rounded(p.lat) || is_rounded(p.lon)
}

/// Share of fixes with a rounded axis, 0 for an empty slice.
pub fn rounded_ratio(points: &[GeoPoint]) -> f64 {
    if points.is_empty() { return 0.0; }
    points.iter().filter(|p| point_is_rounded(p)).count() as f64 / points.len() as f64
}

// ── Statistics ────────────────────────────────────────────────────────────────

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() { return 0.0; }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population variance.
pub fn variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 { return 0.0; }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64
}

pub fn std_dev(xs: &[f64]) -> f64 {
    variance(xs).sqrt()
}

/// σ/μ, 0 when μ is 0.
pub fn coefficient_of_variation(xs: &[f64]) -> f64 {
    let m = mean(xs);
    if m == 0.0 { return 0.0; }
    std_dev(xs) / m
}

/// Least-squares slope of `ys` against their index.
pub fn linear_slope(ys: &[f64]) -> f64 {
    let n = ys.len();
    if n < 2 { return 0.0; }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let mx = mean(&xs);
    let my = mean(ys);
    let num: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let den: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    if den == 0.0 { 0.0 } else { num / den }
}

pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Four-decimal rounding used on every externally reported score.
pub fn round4(x: f64) -> f64 {
    (x * 10000.0).round() / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero_apart() {
        let p = GeoPoint::new(51.5007, -0.1246, 0.0);
        assert_eq!(haversine_m(&p, &p), 0.0);
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let a = GeoPoint::new(0.0, 0.0, 0.0);
        let b = GeoPoint::new(0.0, 180.0, 0.0);
        let half = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!((haversine_m(&a, &b) - half).abs() < 1.0);
        assert!((haversine_m(&a, &b) / 1000.0 - 20015.0).abs() < 1.0);

        let n = GeoPoint::new(90.0, 0.0, 0.0);
        let s = GeoPoint::new(-90.0, 0.0, 0.0);
        assert!((haversine_m(&n, &s) - half).abs() < 1.0);
    }

    #[test]
    fn rounded_coordinates() {
        assert!(is_rounded(40.0));
        assert!(is_rounded(40.7));
        assert!(is_rounded(40.712));
        assert!(!is_rounded(40.7128));
        assert!(!is_rounded(-74.006012));
        assert_eq!(decimal_places(12.5), 1);
    }

    #[test]
    fn speed_requires_forward_time() {
        let a = GeoPoint::new(0.0, 0.0, 100.0);
        let b = GeoPoint::new(0.0, 0.01, 100.0);
        assert!(speed_mps(&a, &b).is_none());

        let c = GeoPoint::new(0.0, 0.01, 110.0);
        let v = speed_mps(&a, &c).unwrap_or_default();
        // 0.01° of longitude at the equator ≈ 1112 m
        assert!((v - 111.2).abs() < 0.5);
    }

    #[test]
    fn bearing_due_east_and_north() {
        let o = GeoPoint::new(0.0, 0.0, 0.0);
        assert!((initial_bearing_deg(&o, &GeoPoint::new(0.0, 1.0, 0.0)) - 90.0).abs() < 1e-9);
        assert!(initial_bearing_deg(&o, &GeoPoint::new(1.0, 0.0, 0.0)).abs() < 1e-9);
    }

    #[test]
    fn stats_helpers() {
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
        assert!((linear_slope(&[10.0, 8.0, 6.0, 4.0]) + 2.0).abs() < 1e-12);
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(clamp01(7.5), 1.0);
    }
}
