//! Distance/elevation lookups over a full-resolution route.

use crate::RoutePoint;

pub const DEFAULT_WINDOW_M: f64 = 50.0;

/// Clamp-then-bracket linear interpolation over items sorted by `key`.
///
/// Returns `None` only for an empty slice. Equal keys resolve to the first
/// matching bracket, and a zero-width bracket takes the left value.
pub(crate) fn interpolate_by<T>(
    items: &[T],
    target: f64,
    key: impl Fn(&T) -> f64,
    value: impl Fn(&T) -> f64,
) -> Option<f64> {
    let first = items.first()?;
    let last = items.last()?;
    if target.is_nan() || target <= key(first) {
        return Some(value(first));
    }
    if target >= key(last) {
        return Some(value(last));
    }
    let idx = items
        .partition_point(|item| key(item) < target)
        .clamp(1, items.len() - 1);
    let (prev, curr) = (&items[idx - 1], &items[idx]);
    let (k0, k1) = (key(prev), key(curr));
    let (v0, v1) = (value(prev), value(curr));
    let frac = if k1 > k0 {
        ((target - k0) / (k1 - k0)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Some(v0 + (v1 - v0) * frac)
}

/// Elevation at `distance`, clamped to the first/last sample.
///
/// Only meaningful for a non-empty series; an empty one yields 0.0.
pub fn elevation_at(points: &[RoutePoint], distance: f64) -> f64 {
    interpolate_by(points, distance, |p| p.distance, |p| p.elevation).unwrap_or(0.0)
}

/// Smoothed gradient (percent) around `distance`, measured over
/// `[distance - window_m, distance + window_m]` clipped to the route.
///
/// Returns 0 when the clipped window has no length, or when it is taken at a
/// route endpoint and swallows the whole route.
pub fn gradient_at(
    points: &[RoutePoint],
    distance: f64,
    total_distance: f64,
    window_m: f64,
) -> f64 {
    let at_endpoint = distance <= 0.0 || distance >= total_distance;
    if at_endpoint && window_m >= total_distance {
        return 0.0;
    }
    let d1 = (distance - window_m).max(0.0);
    let d2 = (distance + window_m).min(total_distance);
    let span = d2 - d1;
    if !(span > 0.0) {
        return 0.0;
    }
    (elevation_at(points, d2) - elevation_at(points, d1)) / span * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(samples: &[(f64, f64)]) -> Vec<RoutePoint> {
        samples
            .iter()
            .map(|&(distance, elevation)| RoutePoint { distance, elevation })
            .collect()
    }

    #[test]
    fn matches_samples_and_clamps() {
        let points = series(&[(10.0, 5.0), (20.0, 15.0), (40.0, 5.0)]);
        assert_eq!(elevation_at(&points, 10.0), 5.0);
        assert_eq!(elevation_at(&points, 20.0), 15.0);
        assert_eq!(elevation_at(&points, 40.0), 5.0);
        assert_eq!(elevation_at(&points, -100.0), 5.0);
        assert_eq!(elevation_at(&points, 1e9), 5.0);
        assert!((elevation_at(&points, 15.0) - 10.0).abs() < 1e-12);
        assert!((elevation_at(&points, 30.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn duplicate_distances_do_not_divide_by_zero() {
        let points = series(&[(0.0, 0.0), (10.0, 3.0), (10.0, 7.0), (20.0, 7.0)]);
        assert_eq!(elevation_at(&points, 10.0), 3.0);
        assert!((elevation_at(&points, 5.0) - 1.5).abs() < 1e-12);
        assert!((elevation_at(&points, 15.0) - 7.0).abs() < 1e-12);
        assert!(elevation_at(&points, 10.0 + 1e-9).is_finite());
    }

    #[test]
    fn empty_series_returns_sentinel() {
        assert_eq!(elevation_at(&[], 12.0), 0.0);
        assert_eq!(elevation_at(&series(&[(3.0, 8.0)]), f64::NAN), 8.0);
    }

    #[test]
    fn climb_sign_follows_direction() {
        let climb = series(&[(0.0, 0.0), (100.0, 10.0)]);
        assert!((gradient_at(&climb, 50.0, 100.0, 50.0) - 10.0).abs() < 1e-12);

        let mirrored = series(&[(0.0, 10.0), (100.0, 0.0)]);
        assert!((gradient_at(&mirrored, 50.0, 100.0, 50.0) + 10.0).abs() < 1e-12);
    }

    #[test]
    fn window_is_clipped_to_route() {
        let points = series(&[(0.0, 0.0), (1000.0, 50.0)]);
        // [0, 60] after clipping
        assert!((gradient_at(&points, 10.0, 1000.0, 50.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_window_is_flat() {
        let climb = series(&[(0.0, 0.0), (100.0, 10.0)]);
        assert_eq!(gradient_at(&climb, 0.0, 100.0, 100.0), 0.0);
        assert_eq!(gradient_at(&climb, 100.0, 100.0, 250.0), 0.0);
        assert_eq!(gradient_at(&climb, 300.0, 100.0, 50.0), 0.0);

        let point = series(&[(0.0, 42.0)]);
        assert_eq!(gradient_at(&point, 0.0, 0.0, 50.0), 0.0);
    }
}
