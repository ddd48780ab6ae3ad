//! Gradient-to-color mapping used by renderers downstream of the engine.
//!
//! Seven stops sit at `-3, -2, -1, 0, 1, 2, 3` band widths; values between
//! stops are blended per channel and values outside clamp to the end stops.

use serde::{Deserialize, Serialize};

use crate::GradeError;

pub const STOP_COUNT: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn parse_hex(hex: &str) -> Result<Self, GradeError> {
        let value = hex.trim().trim_start_matches('#');
        if value.len() != 6 || !value.is_ascii() {
            return Err(GradeError::Decode(format!("invalid color {hex:?}")));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&value[range], 16)
                .map_err(|_| GradeError::Decode(format!("invalid color {hex:?}")))
        };
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        Rgb(
            lerp_u8(self.0, other.0, t),
            lerp_u8(self.1, other.1, t),
            lerp_u8(self.2, other.2, t),
        )
    }
}

/// User-facing color preferences, as stored in configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorScale {
    /// `#RRGGBB` stops from steepest descent to steepest climb.
    pub stops: [String; STOP_COUNT],
    /// Gradient (percentage points) between neighbouring stops.
    pub band_width_pct: f64,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            stops: [
                "#2C7BB6", "#00A6CA", "#00CCBC", "#90EB9D", "#FFFF8C", "#F9D057", "#D7191C",
            ]
            .map(String::from),
            band_width_pct: 4.0,
        }
    }
}

impl ColorScale {
    pub fn palette(&self) -> Result<Palette, GradeError> {
        if !self.band_width_pct.is_finite() || self.band_width_pct <= 0.0 {
            return Err(GradeError::InvalidParameter(format!(
                "band_width_pct must be positive, got {}",
                self.band_width_pct
            )));
        }
        let mut stops = [Rgb(0, 0, 0); STOP_COUNT];
        for (slot, hex) in stops.iter_mut().zip(&self.stops) {
            *slot = Rgb::parse_hex(hex)?;
        }
        Ok(Palette {
            stops,
            band_width_pct: self.band_width_pct,
        })
    }
}

/// Parsed [`ColorScale`], ready for lookups.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    stops: [Rgb; STOP_COUNT],
    band_width_pct: f64,
}

impl Palette {
    pub fn color_for(&self, gradient_percent: f64) -> Rgb {
        let mid = (STOP_COUNT / 2) as f64;
        if gradient_percent.is_nan() {
            return self.stops[STOP_COUNT / 2];
        }
        let pos = (gradient_percent / self.band_width_pct + mid).clamp(0.0, (STOP_COUNT - 1) as f64);
        let idx = (pos.floor() as usize).min(STOP_COUNT - 2);
        self.stops[idx].lerp(self.stops[idx + 1], pos - idx as f64)
    }
}

fn lerp_u8(start: u8, end: u8, t: f64) -> u8 {
    let value = start as f64 + (end as f64 - start as f64) * t;
    value.round().clamp(0.0, 255.0) as u8
}
