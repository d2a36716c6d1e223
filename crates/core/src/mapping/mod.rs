use serde::{Deserialize, Serialize};

use crate::{MappingConfig, NoteSpec};

const PITCH_HUE_SPAN: f64 = 128.0;
const SATURATION: f32 = 0.6;
const VALUE: f32 = 0.9;

/// Visual attributes derived from a note's schedule. Rendering adapters
/// receive these on spawn and whenever a recycled slot is redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub color: [f32; 3],
    /// Resting position of the note before the time-front is subtracted.
    pub anchor: [f64; 3],
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            anchor: [0.0; 3],
        }
    }
}

/// Routes note attributes (time, pitch, lane) to spatial and colour
/// parameters.
#[derive(Debug, Clone)]
pub struct AppearanceMapper {
    config: MappingConfig,
    time_dir: [f64; 3],
}

impl AppearanceMapper {
    pub fn new(config: MappingConfig) -> Self {
        let time_dir = normalize_or(config.time_axis, [1.0, 0.0, 0.0]);
        Self { config, time_dir }
    }

    pub fn appearance(&self, spec: &NoteSpec) -> Appearance {
        Appearance {
            color: self.color(spec),
            anchor: self.anchor(spec),
        }
    }

    pub fn anchor(&self, spec: &NoteSpec) -> [f64; 3] {
        let c = &self.config;
        let time = scale(self.time_dir, spec.time + c.time_offset);
        let pitch = scale(
            normalize_or(c.pitch_axis, [0.0; 3]),
            spec.pitch as f64 + c.pitch_offset,
        );
        let lane = scale(
            normalize_or(c.lane_axis, [0.0; 3]),
            spec.lane as f64 * c.lane_spacing,
        );
        add(add(time, pitch), lane)
    }

    pub fn color(&self, spec: &NoteSpec) -> [f32; 3] {
        let mut color = if self.config.color_by_pitch {
            let hue = (spec.pitch as f64 / PITCH_HUE_SPAN).rem_euclid(1.0) as f32;
            hsv_to_rgb(hue, SATURATION, VALUE)
        } else {
            [1.0, 1.0, 1.0]
        };
        if let Some(tint) = self.config.lane_tints.get(spec.lane) {
            for (channel, t) in color.iter_mut().zip(tint) {
                *channel *= t;
            }
        }
        color
    }

    /// World position of an anchored note once the front has scrolled by
    /// `front` along the time axis.
    pub fn world_position(&self, anchor: [f64; 3], front: f64) -> [f64; 3] {
        add(anchor, scale(self.time_dir, -front))
    }
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h6 = (h.rem_euclid(1.0)) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as u32 % 6 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

fn normalize_or(v: [f64; 3], fallback: [f64; 3]) -> [f64; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f64::EPSILON || !len.is_finite() {
        fallback
    } else {
        scale(v, 1.0 / len)
    }
}

fn scale(v: [f64; 3], k: f64) -> [f64; 3] {
    [v[0] * k, v[1] * k, v[2] * k]
}

fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}
