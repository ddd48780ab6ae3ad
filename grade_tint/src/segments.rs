//! Per-segment gradients for a rendered curve.
//!
//! With a full-resolution route each segment center is looked up on the
//! route itself. With only the elevation extremes, the slope is read off the
//! curve, over a span wide enough that one quantization step of the chart
//! cannot move the result by more than `max_quantization_error_pct`.

use tracing::debug;

use crate::direction::decide;
use crate::profile::gradient_at;
use crate::screen::{filter_baseline, vertical_span};
use crate::{Direction, ElevationSeries, GradientSample, Params, ScreenPoint};

/// One sample per adjacent pair of (baseline-filtered) curve points, in
/// ascending `x`. Pairs without horizontal extent are skipped, so the output
/// may be shorter than the curve. Without a route nothing is produced.
///
/// For a full-resolution route a missing `direction` is resolved with
/// [`decide`]; it is ignored on the coarse path.
pub fn build_segments(
    screen: &[ScreenPoint],
    series: Option<&ElevationSeries>,
    direction: Option<Direction>,
    params: &Params,
) -> Vec<GradientSample> {
    let Some(series) = series else {
        return Vec::new();
    };
    let curve = filter_baseline(screen, params.baseline_y);
    if curve.len() < 2 {
        return Vec::new();
    }
    if series.is_full_resolution() {
        let direction = direction.unwrap_or_else(|| decide(&curve, series, params));
        route_segments(&curve, series, direction, params)
    } else {
        coarse_segments(&curve, series, params)
    }
}

fn route_segments(
    curve: &[ScreenPoint],
    series: &ElevationSeries,
    direction: Direction,
    params: &Params,
) -> Vec<GradientSample> {
    let total = series.total_distance;
    curve
        .windows(2)
        .filter_map(|pair| {
            let (p1, p2) = (pair[0], pair[1]);
            if !(p2.x > p1.x) {
                return None;
            }
            let center = (p1.x + p2.x) / 2.0;
            let distance = direction.route_distance(center, total);
            let gradient = gradient_at(&series.points, distance, total, params.window_m);
            Some(GradientSample {
                center_position: center,
                gradient_percent: direction.orient(gradient),
            })
        })
        .collect()
}

fn coarse_segments(
    curve: &[ScreenPoint],
    series: &ElevationSeries,
    params: &Params,
) -> Vec<GradientSample> {
    let total = series.total_distance;
    if !(total > 0.0) {
        debug!(total, "route has no length; skipping coarse gradients");
        return Vec::new();
    }
    let Some(span) = vertical_span(curve) else {
        return Vec::new();
    };
    let height = span.height();
    // elevation covered by one unit of normalized y
    let meters_per_y = if height > 0.0 {
        series.elevation_range() / height
    } else {
        0.0
    };
    let min_dx = min_sample_span(params, meters_per_y, total);
    debug!(min_dx, meters_per_y, "coarse gradient sampling span");

    let mut out = Vec::with_capacity(curve.len() - 1);
    for i in 0..curve.len() - 1 {
        let (p1, p2) = (curve[i], curve[i + 1]);
        if !(p2.x > p1.x) {
            continue;
        }
        let (lo, hi) = widen(curve, i, i + 1, min_dx);
        let dx = curve[hi].x - curve[lo].x;
        if !(dx > 0.0) {
            continue;
        }
        let rise_m = -(curve[hi].y - curve[lo].y) * meters_per_y;
        out.push(GradientSample {
            center_position: (p1.x + p2.x) / 2.0,
            gradient_percent: rise_m / (dx * total) * 100.0,
        });
    }
    out
}

/// Narrowest normalized span over which a single quantization step stays
/// within the allowed gradient error.
fn min_sample_span(params: &Params, meters_per_y: f64, total_distance: f64) -> f64 {
    let step_m = params.quantization_step * meters_per_y;
    step_m * 100.0 / (params.max_quantization_error_pct * total_distance)
}

/// Grows `[lo, hi]` outward one point per side at a time until it spans
/// `min_dx` or covers the curve.
fn widen(curve: &[ScreenPoint], mut lo: usize, mut hi: usize, min_dx: f64) -> (usize, usize) {
    while curve[hi].x - curve[lo].x < min_dx {
        let can_left = lo > 0;
        let can_right = hi + 1 < curve.len();
        if !can_left && !can_right {
            break;
        }
        if can_left {
            lo -= 1;
        }
        if can_right && curve[hi].x - curve[lo].x < min_dx {
            hi += 1;
        }
    }
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoutePoint;

    fn curve(samples: &[(f64, f64)]) -> Vec<ScreenPoint> {
        samples.iter().map(|&(x, y)| ScreenPoint { x, y }).collect()
    }

    fn climb() -> ElevationSeries {
        ElevationSeries::full(
            10_000.0,
            vec![
                RoutePoint { distance: 0.0, elevation: 0.0 },
                RoutePoint { distance: 10_000.0, elevation: 500.0 },
            ],
        )
    }

    fn ramp(n: usize) -> Vec<ScreenPoint> {
        (0..=n)
            .map(|i| {
                let x = i as f64 / n as f64;
                ScreenPoint { x, y: 0.9 - 0.8 * x }
            })
            .collect()
    }

    #[test]
    fn covers_each_pair_once() {
        let points = curve(&[
            (0.0, 1.0),
            (0.0, 0.8),
            (0.1, 0.7),
            (0.1, 0.6),
            (0.4, 0.5),
            (1.0, 0.2),
            (1.0, 1.0),
        ]);
        let filtered = filter_baseline(&points, 1.0);
        let samples = build_segments(&points, Some(&climb()), None, &Params::default());
        assert!(samples.len() <= filtered.len() - 1);
        assert_eq!(samples.len(), 3);
        let pairs = filtered.windows(2).filter(|w| w[1].x > w[0].x);
        for (sample, pair) in samples.iter().zip(pairs) {
            assert!(sample.center_position > pair[0].x);
            assert!(sample.center_position < pair[1].x);
        }
        assert!(samples
            .windows(2)
            .all(|w| w[1].center_position > w[0].center_position));
    }

    #[test]
    fn reverse_flips_sign() {
        let params = Params::default();
        let forward = build_segments(&ramp(10), Some(&climb()), Some(Direction::Forward), &params);
        let reverse = build_segments(&ramp(10), Some(&climb()), Some(Direction::Reverse), &params);
        assert_eq!(forward.len(), 10);
        for (f, r) in forward.iter().zip(&reverse) {
            assert!((f.gradient_percent - 5.0).abs() < 1e-9);
            assert!((r.gradient_percent + 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn resolves_direction_when_absent() {
        let falling: Vec<ScreenPoint> = ramp(10)
            .into_iter()
            .map(|p| ScreenPoint { x: p.x, y: 1.0 - p.y })
            .collect();
        let samples = build_segments(&falling, Some(&climb()), None, &Params::default());
        assert!(samples.iter().all(|s| (s.gradient_percent + 5.0).abs() < 1e-9));
    }

    #[test]
    fn missing_route_or_curve_is_empty() {
        let params = Params::default();
        assert!(build_segments(&ramp(4), None, None, &params).is_empty());
        assert!(build_segments(&[], Some(&climb()), None, &params).is_empty());
        assert!(build_segments(&curve(&[(0.3, 0.5)]), Some(&climb()), None, &params).is_empty());
    }

    #[test]
    fn coarse_ramp_recovers_gradient() {
        let series = ElevationSeries::coarse(1000.0, 100.0, 200.0);
        let samples = build_segments(&ramp(100), Some(&series), None, &Params::default());
        assert_eq!(samples.len(), 100);
        for sample in &samples {
            assert!((sample.gradient_percent - 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn coarse_normalizes_by_drawn_span() {
        // same climb drawn over a quarter of the chart height
        let squeezed: Vec<ScreenPoint> = ramp(20)
            .into_iter()
            .map(|p| ScreenPoint { x: p.x, y: 0.5 + (p.y - 0.5) / 4.0 })
            .collect();
        let series = ElevationSeries::coarse(1000.0, 100.0, 200.0);
        let samples = build_segments(&squeezed, Some(&series), None, &Params::default());
        for sample in &samples {
            assert!((sample.gradient_percent - 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn coarse_widens_past_quantization_steps() {
        // 100 m of climb over 1 km drawn as a staircase of 0.001 steps
        let n = 400;
        let points: Vec<ScreenPoint> = (0..=n)
            .map(|i| {
                let x = i as f64 / n as f64;
                let y = 0.9 - ((0.8 * x) / 0.001).floor() * 0.001;
                ScreenPoint { x, y }
            })
            .collect();
        let series = ElevationSeries::coarse(1000.0, 100.0, 200.0);
        let params = Params::default();
        let samples = build_segments(&points, Some(&series), None, &params);
        assert_eq!(samples.len(), n);
        for sample in &samples {
            assert!(
                (sample.gradient_percent - 10.0).abs() <= 2.0 * params.max_quantization_error_pct,
                "gradient {} at {}",
                sample.gradient_percent,
                sample.center_position
            );
        }
    }

    #[test]
    fn flat_curve_is_level() {
        let points = curve(&[(0.0, 0.5), (0.5, 0.5), (1.0, 0.5)]);
        let series = ElevationSeries::coarse(1000.0, 100.0, 120.0);
        let samples = build_segments(&points, Some(&series), None, &Params::default());
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.gradient_percent == 0.0));

        let zero_length = ElevationSeries::coarse(0.0, 100.0, 120.0);
        assert!(build_segments(&ramp(4), Some(&zero_length), None, &Params::default()).is_empty());
    }

    #[test]
    fn widen_stops_at_curve_ends() {
        let points = ramp(10);
        assert_eq!(widen(&points, 4, 5, 0.05), (4, 5));
        assert_eq!(widen(&points, 4, 5, 0.25), (3, 6));
        assert_eq!(widen(&points, 0, 1, 0.25), (0, 3));
        assert_eq!(widen(&points, 4, 5, 5.0), (0, 10));
    }
}
