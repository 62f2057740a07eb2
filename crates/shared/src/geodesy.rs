//! Distance computation between WGS-84 coordinates.
//!
//! Distances are geodesic (ellipsoidal) and ignore altitude, matching the
//! single-scalar "distance between" semantics mobile location APIs expose.

use geo::{GeodesicDistance, Point};

/// Threshold at which distances switch from meters to kilometers.
const KILOMETER_THRESHOLD_METERS: f64 = 1000.0;

/// Returns the geodesic distance in meters between two `(latitude, longitude)` pairs.
pub fn distance_meters(from: (f64, f64), to: (f64, f64)) -> f64 {
    let a = Point::new(from.1, from.0);
    let b = Point::new(to.1, to.0);
    a.geodesic_distance(&b)
}

/// Formats a distance for status display.
///
/// Below one kilometer the value is rounded to whole meters (`"850 m"`),
/// otherwise it is shown in kilometers with one decimal (`"1.2 km"`).
pub fn format_distance(meters: f64) -> String {
    let rounded = meters.round();
    if rounded < KILOMETER_THRESHOLD_METERS {
        format!("{} m", rounded as i64)
    } else {
        format!("{:.1} km", meters / KILOMETER_THRESHOLD_METERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::Fake;

    #[test]
    fn test_distance_same_point_is_zero() {
        assert_eq!(distance_meters((41.0082, 28.9784), (41.0082, 28.9784)), 0.0);
    }

    #[test]
    fn test_distance_one_degree_latitude_at_equator() {
        let d = distance_meters((0.0, 0.0), (1.0, 0.0));
        // WGS-84 meridian degree at the equator is ~110.574 km
        assert!((d - 110_574.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        for _ in 0..20 {
            let a = ((-80.0..80.0).fake::<f64>(), (-179.0..179.0).fake::<f64>());
            let b = ((-80.0..80.0).fake::<f64>(), (-179.0..179.0).fake::<f64>());
            let ab = distance_meters(a, b);
            let ba = distance_meters(b, a);
            assert!((ab - ba).abs() < 1e-3, "{ab} != {ba}");
        }
    }

    #[test]
    fn test_distance_increases_moving_away() {
        let center = (37.7749, -122.4194);
        let mut previous = 0.0;
        for step in 1..=50 {
            let lat = center.0 + step as f64 * 0.00001;
            let d = distance_meters(center, (lat, center.1));
            assert!(d > previous, "step {step}: {d} <= {previous}");
            previous = d;
        }
    }

    #[test]
    fn test_format_distance_meters() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(12.4), "12 m");
        assert_eq!(format_distance(999.0), "999 m");
    }

    #[test]
    fn test_format_distance_kilometers() {
        assert_eq!(format_distance(1000.0), "1.0 km");
        assert_eq!(format_distance(1234.0), "1.2 km");
        assert_eq!(format_distance(15_678.0), "15.7 km");
    }

    #[test]
    fn test_format_distance_rounds_before_switching_units() {
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(999.6), "1.0 km");
    }
}
