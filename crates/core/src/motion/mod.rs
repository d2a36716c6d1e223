use serde::{Deserialize, Serialize};

use crate::{MotionConfig, Note, Visibility};

/// Local axis carrying a note's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Where a note is relative to the time-front during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// `scheduled time - front`; positive while the note is still ahead.
    pub travel_offset: f64,
    /// Cross-axis fade in `[0, 1]`.
    pub fade: f64,
    pub visibility: Visibility,
}

/// Maps a note's schedule and the current front to an offset, a fade factor
/// and a scale. Every method is a pure function of its arguments.
#[derive(Debug, Clone)]
pub struct LaneMotion {
    config: MotionConfig,
}

impl LaneMotion {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn position_of(&self, note: &Note, front: f64) -> Placement {
        let travel_offset = note.offset_at(front);
        Placement {
            travel_offset,
            fade: self.fade(travel_offset),
            visibility: self.visibility(travel_offset, note.duration()),
        }
    }

    pub fn visibility(&self, travel_offset: f64, duration: f64) -> Visibility {
        if travel_offset > self.config.visible_after {
            Visibility::Ahead
        } else if self.has_passed(travel_offset, duration) {
            Visibility::Behind
        } else {
            Visibility::Visible
        }
    }

    /// True once a note has fully left the trailing edge.
    pub fn has_passed(&self, travel_offset: f64, duration: f64) -> bool {
        travel_offset < -self.config.visible_before - duration
    }

    /// Linear ramps at both edges of the window; the smaller one wins.
    pub fn fade(&self, travel_offset: f64) -> f64 {
        let c = &self.config;
        let mut fade = 1.0_f64;
        if c.fade_in_range > 0.0 {
            fade = fade.min(inverse_lerp(
                c.visible_after,
                c.visible_after - c.fade_in_range,
                travel_offset,
            ));
        }
        if c.fade_out_range > 0.0 {
            fade = fade.min(inverse_lerp(
                -c.visible_before,
                -c.visible_before + c.fade_out_range,
                travel_offset,
            ));
        }
        fade.clamp(0.0, 1.0)
    }

    /// Length of the note along the travel axis, never below `min_length`.
    pub fn length_of(&self, note: &Note) -> f64 {
        let lane_scale = self
            .config
            .lane_duration_scale
            .get(note.lane())
            .copied()
            .unwrap_or(1.0);
        (note.duration() * lane_scale).max(self.config.min_length)
    }

    /// Full scale vector: length on the travel axis, cross-section on the
    /// other two (scaled by `fade` when fading by scale).
    pub fn scale_of(&self, note: &Note, fade: f64) -> [f64; 3] {
        let c = &self.config;
        let travel = c.travel_axis.index();
        let fade = if c.fade_by_scale { fade.clamp(0.0, 1.0) } else { 1.0 };
        let mut scale = [0.0; 3];
        for (axis, value) in scale.iter_mut().enumerate() {
            *value = if axis == travel {
                self.length_of(note)
            } else {
                c.base_cross_section[axis] * fade
            };
        }
        scale
    }
}

fn inverse_lerp(a: f64, b: f64, v: f64) -> f64 {
    if (b - a).abs() <= f64::EPSILON {
        return if v >= b { 1.0 } else { 0.0 };
    }
    ((v - a) / (b - a)).clamp(0.0, 1.0)
}
