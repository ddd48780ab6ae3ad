//! Gradient reconstruction and direction disambiguation for elevation
//! profiles drawn by a host chart.
//!
//! The core (`profile`, `screen`, `direction`, `segments`) is a set of pure
//! functions over immutable inputs. `cache`, `payload`, `schedule` and
//! `color` are the orchestrator-side pieces that feed it and consume it.

pub mod cache;
pub mod color;
pub mod direction;
pub mod payload;
pub mod profile;
pub mod schedule;
pub mod screen;
pub mod segments;

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

pub use cache::RouteCache;
pub use color::{ColorScale, Palette, Rgb};
pub use direction::{assess, decide, Assessment};
pub use payload::{decode_payload, decode_value};
pub use profile::{elevation_at, gradient_at};
pub use schedule::{Debouncer, TriggerState};
pub use screen::{filter_baseline, vertical_span, y_at, VerticalSpan};
pub use segments::build_segments;

#[derive(Error, Debug)]
pub enum GradeError {
    #[error("failed to decode route payload: {0}")]
    Decode(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("route {0} is not loaded")]
    MissingRoute(String),
}

/// One sample of the authoritative route profile.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutePoint {
    pub distance: f64,
    pub elevation: f64,
}

/// Route profile sorted ascending by distance.
///
/// A series built with [`ElevationSeries::coarse`] carries no points, only
/// the elevation extremes; see [`ElevationSeries::is_full_resolution`].
#[derive(Clone, Debug, PartialEq)]
pub struct ElevationSeries {
    pub total_distance: f64,
    pub points: Vec<RoutePoint>,
    pub min_elevation: f64,
    pub max_elevation: f64,
}

impl ElevationSeries {
    pub fn full(total_distance: f64, points: Vec<RoutePoint>) -> Self {
        let (min_elevation, max_elevation) = if points.is_empty() {
            (0.0, 0.0)
        } else {
            points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.elevation), hi.max(p.elevation))
            })
        };
        Self {
            total_distance,
            points,
            min_elevation,
            max_elevation,
        }
    }

    pub fn coarse(total_distance: f64, min_elevation: f64, max_elevation: f64) -> Self {
        Self {
            total_distance,
            points: Vec::new(),
            min_elevation: min_elevation.min(max_elevation),
            max_elevation: max_elevation.max(min_elevation),
        }
    }

    /// Same route reduced to its extremes.
    pub fn to_coarse(&self) -> Self {
        Self::coarse(self.total_distance, self.min_elevation, self.max_elevation)
    }

    /// At least two samples at distinct distances, enough to interpolate.
    pub fn is_full_resolution(&self) -> bool {
        self.points.len() >= 2
            && self
                .points
                .windows(2)
                .any(|w| w[1].distance > w[0].distance)
    }

    pub fn elevation_range(&self) -> f64 {
        (self.max_elevation - self.min_elevation).max(0.0)
    }
}

/// Point of the rendered curve in normalized chart space (smaller `y` is higher).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Route distance shown at normalized horizontal position `x`.
    pub fn route_distance(self, x: f64, total_distance: f64) -> f64 {
        match self {
            Direction::Forward => x * total_distance,
            Direction::Reverse => (1.0 - x) * total_distance,
        }
    }

    /// Re-signs a gradient measured along the route for travel across the screen.
    pub fn orient(self, gradient_percent: f64) -> f64 {
        match self {
            Direction::Forward => gradient_percent,
            Direction::Reverse => -gradient_percent,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Reverse => f.write_str("reverse"),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GradientSample {
    pub center_position: f64,
    pub gradient_percent: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Params {
    /// Half-width of the distance window used for route gradients (meters).
    pub window_m: f64,
    pub direction_samples: usize,
    pub discriminating_samples: usize,
    /// Largest forward/reverse elevation gap (meters) still treated as symmetric.
    pub symmetry_threshold_m: f64,
    pub baseline_y: f64,
    /// Smallest `y` increment the host chart can represent.
    pub quantization_step: f64,
    /// Gradient error (percentage points) one quantization step may cause.
    pub max_quantization_error_pct: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            window_m: profile::DEFAULT_WINDOW_M,
            direction_samples: 100,
            discriminating_samples: 5,
            symmetry_threshold_m: 1.0,
            baseline_y: 1.0,
            quantization_step: 0.001,
            max_quantization_error_pct: 1.0,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), GradeError> {
        let positive = [
            ("window_m", self.window_m),
            ("quantization_step", self.quantization_step),
            ("max_quantization_error_pct", self.max_quantization_error_pct),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(GradeError::InvalidParameter(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !self.symmetry_threshold_m.is_finite() || self.symmetry_threshold_m < 0.0 {
            return Err(GradeError::InvalidParameter(format!(
                "symmetry_threshold_m must be non-negative, got {}",
                self.symmetry_threshold_m
            )));
        }
        if !self.baseline_y.is_finite() {
            return Err(GradeError::InvalidParameter("baseline_y must be finite".into()));
        }
        if self.direction_samples < 2 {
            return Err(GradeError::InvalidParameter(
                "direction_samples must be at least 2".into(),
            ));
        }
        if self.discriminating_samples == 0 {
            return Err(GradeError::InvalidParameter(
                "discriminating_samples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Result of running the pipeline over one rendered curve.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurveGradients {
    /// `None` when the coarse fallback ran and no direction applies.
    pub direction: Option<Direction>,
    pub samples: Vec<GradientSample>,
}

/// Runs the whole pipeline for one curve.
///
/// Missing input yields an empty result rather than an error, so callers can
/// retry once the host has drawn the curve or the route data has arrived.
/// `direction` overrides the disambiguator when set.
pub fn process_curve(
    screen: &[ScreenPoint],
    series: Option<&ElevationSeries>,
    direction: Option<Direction>,
    params: &Params,
) -> CurveGradients {
    let Some(series) = series else {
        debug!("no route data yet; nothing to draw");
        return CurveGradients::default();
    };
    let curve = screen::filter_baseline(screen, params.baseline_y);
    if curve.len() < 2 {
        debug!(points = curve.len(), "curve too short after baseline filtering");
        return CurveGradients::default();
    }

    if series.is_full_resolution() {
        let direction = direction.unwrap_or_else(|| decide(&curve, series, params));
        let samples = segments::build_segments(&curve, Some(series), Some(direction), params);
        CurveGradients {
            direction: Some(direction),
            samples,
        }
    } else {
        CurveGradients {
            direction: None,
            samples: segments::build_segments(&curve, Some(series), None, params),
        }
    }
}

/// SHA-256 over the exact bit patterns of `samples`, hex encoded.
pub fn fingerprint(samples: &[GradientSample]) -> String {
    let mut hasher = Sha256::new();
    for sample in samples {
        hasher.update(sample.center_position.to_bits().to_le_bytes());
        hasher.update(sample.gradient_percent.to_bits().to_le_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
