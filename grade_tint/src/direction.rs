//! Picks which way along the route the rendered curve runs.
//!
//! Both candidate mappings are probed at the positions where the route looks
//! most different from its mirror image. The curve and the candidates are
//! each min-max normalized there, so only shape is compared, never scale.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::profile::elevation_at;
use crate::screen::{filter_baseline, y_at};
use crate::{Direction, ElevationSeries, Params, ScreenPoint};

/// Outcome of comparing the curve against both candidate directions.
#[derive(Clone, Debug, PartialEq)]
pub struct Assessment {
    pub direction: Direction,
    /// Largest forward/reverse elevation gap found (meters).
    pub max_asymmetry_m: f64,
    /// Whether the route was treated as reading the same both ways.
    pub symmetric: bool,
    pub forward_error: f64,
    pub reverse_error: f64,
    /// Normalized positions used to compare the candidates.
    pub probes: Vec<f64>,
}

#[derive(Clone, Copy, Debug)]
struct Probe {
    x: f64,
    asymmetry: f64,
}

/// Direction the curve encodes. Ties, and routes that look the same in
/// both directions, resolve to [`Direction::Forward`].
pub fn decide(screen: &[ScreenPoint], series: &ElevationSeries, params: &Params) -> Direction {
    assess(screen, series, params).direction
}

pub fn assess(screen: &[ScreenPoint], series: &ElevationSeries, params: &Params) -> Assessment {
    let curve = filter_baseline(screen, params.baseline_y);
    let points = &series.points;
    let total = series.total_distance;
    let forward_at = |x: f64| elevation_at(points, Direction::Forward.route_distance(x, total));
    let reverse_at = |x: f64| elevation_at(points, Direction::Reverse.route_distance(x, total));

    let n = params.direction_samples.max(2);
    let mut probes: Vec<Probe> = (1..n)
        .map(|i| {
            let x = i as f64 / n as f64;
            Probe {
                x,
                asymmetry: (forward_at(x) - reverse_at(x)).abs(),
            }
        })
        .collect();
    probes.sort_by_key(|p| Reverse(OrderedFloat(p.asymmetry)));

    let max_asymmetry_m = probes.first().map(|p| p.asymmetry).unwrap_or(0.0);
    if max_asymmetry_m < params.symmetry_threshold_m {
        debug!(max_asymmetry_m, "route reads the same both ways; keeping forward");
        return Assessment {
            direction: Direction::Forward,
            max_asymmetry_m,
            symmetric: true,
            forward_error: 0.0,
            reverse_error: 0.0,
            probes: Vec::new(),
        };
    }

    probes.truncate(params.discriminating_samples.max(1));
    let xs: Vec<f64> = probes.iter().map(|p| p.x).collect();
    let observed = normalize(&xs.iter().map(|&x| -y_at(&curve, x)).collect::<Vec<_>>());
    let forward = normalize(&xs.iter().map(|&x| forward_at(x)).collect::<Vec<_>>());
    let reverse = normalize(&xs.iter().map(|&x| reverse_at(x)).collect::<Vec<_>>());

    let forward_error = squared_error(&observed, &forward);
    let reverse_error = squared_error(&observed, &reverse);
    let direction = if forward_error <= reverse_error {
        Direction::Forward
    } else {
        Direction::Reverse
    };
    debug!(
        %direction,
        forward_error,
        reverse_error,
        max_asymmetry_m,
        "direction resolved"
    );

    Assessment {
        direction,
        max_asymmetry_m,
        symmetric: false,
        forward_error,
        reverse_error,
        probes: xs,
    }
}

/// Min-max scale to [0, 1]; a constant sequence maps to all zeros.
fn normalize(values: &[f64]) -> Vec<f64> {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = hi - lo;
    if !(range > 0.0) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|&v| (v - lo) / range).collect()
}

fn squared_error(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
