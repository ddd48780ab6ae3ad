//! Sampling the rendered curve in normalized chart space.

use crate::profile::interpolate_by;
use crate::ScreenPoint;

const BASELINE_EPS: f64 = 1e-9;

/// Drops baseline sentinels (points at or below the chart floor) and
/// non-finite points, keeping ascending `x` order.
pub fn filter_baseline(points: &[ScreenPoint], baseline_y: f64) -> Vec<ScreenPoint> {
    let mut out: Vec<ScreenPoint> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite() && p.y < baseline_y - BASELINE_EPS)
        .collect();
    if out.windows(2).any(|w| w[1].x < w[0].x) {
        out.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    out
}

/// Curve height at `x`; same clamp and interpolation rules as
/// [`crate::elevation_at`]. An empty curve yields 0.0.
pub fn y_at(points: &[ScreenPoint], x: f64) -> f64 {
    interpolate_by(points, x, |p| p.x, |p| p.y).unwrap_or(0.0)
}

/// Vertical extent actually covered by the curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerticalSpan {
    pub min: f64,
    pub max: f64,
}

impl VerticalSpan {
    pub fn height(&self) -> f64 {
        self.max - self.min
    }
}

pub fn vertical_span(points: &[ScreenPoint]) -> Option<VerticalSpan> {
    let first = points.first()?;
    let span = points.iter().fold(
        VerticalSpan {
            min: first.y,
            max: first.y,
        },
        |span, p| VerticalSpan {
            min: span.min.min(p.y),
            max: span.max.max(p.y),
        },
    );
    Some(span)
}
