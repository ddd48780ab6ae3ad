//! Decoding route payloads into an [`ElevationSeries`].
//!
//! Two shapes are accepted:
//!
//! - nested arrays: `[total, [[distance, elevation], ...]]` for a full
//!   profile or `[total, min_elevation, max_elevation]` for a coarse one;
//! - objects: `{"total_distance", "points": [[d, e], ...]}` or
//!   `{"total_distance", "min_elevation", "max_elevation"}`.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::{ElevationSeries, GradeError, RoutePoint};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ObjectPayload {
    Full {
        total_distance: f64,
        points: Vec<(f64, f64)>,
    },
    Coarse {
        total_distance: f64,
        min_elevation: f64,
        max_elevation: f64,
    },
}

pub fn decode_payload(text: &str) -> Result<ElevationSeries, GradeError> {
    let value: JsonValue =
        serde_json::from_str(text).map_err(|e| GradeError::Decode(e.to_string()))?;
    decode_value(&value)
}

pub fn decode_value(value: &JsonValue) -> Result<ElevationSeries, GradeError> {
    match value {
        JsonValue::Array(items) => decode_nested(items),
        JsonValue::Object(_) => {
            let payload = ObjectPayload::deserialize(value)
                .map_err(|e| GradeError::Decode(format!("unrecognized route object: {e}")))?;
            match payload {
                ObjectPayload::Full {
                    total_distance,
                    points,
                } => full_series(total_distance, points),
                ObjectPayload::Coarse {
                    total_distance,
                    min_elevation,
                    max_elevation,
                } => coarse_series(total_distance, min_elevation, max_elevation),
            }
        }
        other => Err(GradeError::Decode(format!(
            "expected an array or object, found {}",
            kind(other)
        ))),
    }
}

fn decode_nested(items: &[JsonValue]) -> Result<ElevationSeries, GradeError> {
    match items {
        [total, JsonValue::Array(rows)] => {
            let total = number(total, "total distance")?;
            let mut points = Vec::with_capacity(rows.len());
            for (i, row) in rows.iter().enumerate() {
                match row.as_array().map(Vec::as_slice) {
                    Some([d, e, ..]) => points.push((
                        number(d, &format!("distance of point {i}"))?,
                        number(e, &format!("elevation of point {i}"))?,
                    )),
                    _ => {
                        return Err(GradeError::Decode(format!(
                            "point {i} is not a [distance, elevation] pair"
                        )))
                    }
                }
            }
            full_series(total, points)
        }
        [total, min, max] => coarse_series(
            number(total, "total distance")?,
            number(min, "minimum elevation")?,
            number(max, "maximum elevation")?,
        ),
        _ => Err(GradeError::Decode(format!(
            "expected [total, points] or [total, min, max], found {} items",
            items.len()
        ))),
    }
}

fn full_series(total_distance: f64, raw: Vec<(f64, f64)>) -> Result<ElevationSeries, GradeError> {
    check_total(total_distance)?;
    let mut points = Vec::with_capacity(raw.len());
    for (i, (distance, elevation)) in raw.into_iter().enumerate() {
        if !distance.is_finite() || distance < 0.0 || !elevation.is_finite() {
            return Err(GradeError::Decode(format!(
                "point {i} is out of range: ({distance}, {elevation})"
            )));
        }
        points.push(RoutePoint {
            distance,
            elevation,
        });
    }
    if points.windows(2).any(|w| w[1].distance < w[0].distance) {
        warn!("route points out of distance order; sorting");
        points.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }
    let mut total = total_distance;
    if let Some(last) = points.last() {
        if last.distance > total {
            warn!(
                total_distance,
                last_distance = last.distance,
                "total distance shorter than route; extending"
            );
            total = last.distance;
        }
    }
    Ok(ElevationSeries::full(total, points))
}

fn coarse_series(total: f64, min: f64, max: f64) -> Result<ElevationSeries, GradeError> {
    check_total(total)?;
    if !min.is_finite() || !max.is_finite() {
        return Err(GradeError::Decode("elevation extremes must be finite".into()));
    }
    Ok(ElevationSeries::coarse(total, min, max))
}

fn check_total(total: f64) -> Result<(), GradeError> {
    if !total.is_finite() || total < 0.0 {
        return Err(GradeError::Decode(format!("invalid total distance {total}")));
    }
    Ok(())
}

fn number(value: &JsonValue, what: &str) -> Result<f64, GradeError> {
    value
        .as_f64()
        .ok_or_else(|| GradeError::Decode(format!("{what} must be a number, found {}", kind(value))))
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
