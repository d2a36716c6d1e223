use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Axis, JudgmentMode, RecycleMode, Result};

const MIN_NOTES_PER_SECOND: f64 = 0.01;
const MIN_LOOP_LENGTH: f64 = 0.01;
const MIN_LENGTH_FLOOR: f64 = 1e-4;

/// Top-level configuration for a scheduler instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub lanes: usize,
    pub pool_capacity: usize,
    pub time: TimeConfig,
    pub generator: GeneratorConfig,
    pub motion: MotionConfig,
    pub judgment: JudgmentConfig,
    pub recycle: RecycleConfig,
    pub mapping: MappingConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lanes: 4,
            pool_capacity: 512,
            time: TimeConfig::default(),
            generator: GeneratorConfig::default(),
            motion: MotionConfig::default(),
            judgment: JudgmentConfig::default(),
            recycle: RecycleConfig::default(),
            mapping: MappingConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Loads a configuration from a JSON document. Missing fields fall back to
    /// their defaults and the result is normalised.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::info!(path = %path.display(), "loading scheduler configuration");
        Self::from_json_str(&text)
    }

    /// Clamps every field into its safe range. Invalid values are corrected
    /// rather than rejected; each correction is logged.
    pub fn normalized(mut self) -> Self {
        if self.lanes == 0 {
            tracing::warn!("lane count of zero replaced with 1");
            self.lanes = 1;
        }
        if self.pool_capacity == 0 {
            tracing::warn!("pool capacity of zero replaced with 1");
            self.pool_capacity = 1;
        }
        if !(self.time.scroll_speed.is_finite() && self.time.scroll_speed >= 0.0) {
            tracing::warn!(value = self.time.scroll_speed, "invalid scroll speed replaced with 1");
            self.time.scroll_speed = 1.0;
        }
        if !(self.time.max_scroll_speed.is_finite() && self.time.max_scroll_speed > 0.0) {
            tracing::warn!(value = self.time.max_scroll_speed, "invalid maximum scroll speed replaced with 10");
            self.time.max_scroll_speed = 10.0;
        }
        if self.time.scroll_speed > self.time.max_scroll_speed {
            tracing::warn!(
                value = self.time.scroll_speed,
                max = self.time.max_scroll_speed,
                "scroll speed above maximum clamped"
            );
            self.time.scroll_speed = self.time.max_scroll_speed;
        }
        if !(self.time.speed_up_step.is_finite() && self.time.speed_up_step >= 0.0) {
            tracing::warn!(value = self.time.speed_up_step, "invalid speed-up step replaced with 0");
            self.time.speed_up_step = 0.0;
        }
        if !(self.time.audio_time_scale.is_finite() && self.time.audio_time_scale > 0.0) {
            tracing::warn!(value = self.time.audio_time_scale, "invalid audio time scale replaced with 1");
            self.time.audio_time_scale = 1.0;
        }
        self.generator = self.generator.normalized();
        self.motion = self.motion.normalized();
        if !(self.judgment.collision_threshold >= 0.0) {
            tracing::warn!("negative collision threshold replaced with 0");
            self.judgment.collision_threshold = 0.0;
        }
        if let Some(window) = self.judgment.hit_window {
            if !(window >= 0.0) {
                tracing::warn!(window, "negative hit window disabled");
                self.judgment.hit_window = None;
            }
        }
        if !(self.recycle.ensure_ahead_fill >= 0.0) {
            self.recycle.ensure_ahead_fill = 0.0;
        }
        self
    }
}

/// How the time-front advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Multiplier applied to tick deltas.
    pub scroll_speed: f64,
    /// Multiplier applied to samples taken from an external clock.
    pub audio_time_scale: f64,
    /// Upper bound for runtime speed changes.
    pub max_scroll_speed: f64,
    /// Raise the scroll speed after every this many hits; 0 disables it.
    pub speed_up_every_hits: u64,
    pub speed_up_step: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            scroll_speed: 1.0,
            audio_time_scale: 1.0,
            max_scroll_speed: 10.0,
            speed_up_every_hits: 0,
            speed_up_step: 0.5,
        }
    }
}

/// Parameters of the seeded procedural generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub loop_length: f64,
    pub notes_per_second_per_lane: f64,
    pub time_jitter: f64,
    pub duration_range: (f64, f64),
    pub pitch_range: (i32, i32),
    pub sine_enabled: bool,
    pub sine_amplitude: f64,
    pub sine_frequency: f64,
    pub sine_phase_offset_per_lane: f64,
    /// Tempo of the metronome source, in beats per minute.
    pub bpm: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 1234,
            loop_length: 16.0,
            notes_per_second_per_lane: 4.0,
            time_jitter: 0.05,
            duration_range: (0.2, 0.6),
            pitch_range: (48, 84),
            sine_enabled: true,
            sine_amplitude: 6.0,
            sine_frequency: 0.5,
            sine_phase_offset_per_lane: 0.7,
            bpm: 120.0,
        }
    }
}

impl GeneratorConfig {
    pub fn normalized(mut self) -> Self {
        if !(self.notes_per_second_per_lane >= MIN_NOTES_PER_SECOND) {
            tracing::warn!(
                value = self.notes_per_second_per_lane,
                "generation rate clamped to {MIN_NOTES_PER_SECOND}"
            );
            self.notes_per_second_per_lane = MIN_NOTES_PER_SECOND;
        }
        if !(self.loop_length >= MIN_LOOP_LENGTH) {
            tracing::warn!(value = self.loop_length, "loop length clamped to {MIN_LOOP_LENGTH}");
            self.loop_length = MIN_LOOP_LENGTH;
        }
        if !(self.time_jitter >= 0.0) {
            self.time_jitter = 0.0;
        }
        let (lo, hi) = self.duration_range;
        let lo = if lo.is_finite() { lo.max(0.0) } else { 0.0 };
        let hi = if hi.is_finite() { hi.max(0.0) } else { lo };
        self.duration_range = (lo.min(hi), lo.max(hi));
        let (lo, hi) = self.pitch_range;
        self.pitch_range = (lo.min(hi), lo.max(hi));
        if !self.sine_amplitude.is_finite() {
            self.sine_amplitude = 0.0;
        }
        if !self.sine_frequency.is_finite() {
            self.sine_frequency = 0.0;
        }
        if !(self.bpm > 0.0) {
            tracing::warn!(value = self.bpm, "non-positive bpm replaced with 60");
            self.bpm = 60.0;
        }
        self
    }

    /// Base interval between two consecutive notes of one lane.
    pub fn step(&self) -> f64 {
        1.0 / self.notes_per_second_per_lane.max(MIN_NOTES_PER_SECOND)
    }
}

/// Visibility window, fades and geometry of travelling notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub visible_before: f64,
    pub visible_after: f64,
    pub fade_in_range: f64,
    pub fade_out_range: f64,
    pub travel_axis: Axis,
    /// Scale the two cross-section dimensions by the fade factor.
    pub fade_by_scale: bool,
    pub min_length: f64,
    pub base_cross_section: [f64; 3],
    /// Per-lane multiplier on the rendered length; missing lanes use 1.
    pub lane_duration_scale: Vec<f64>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            visible_before: 4.0,
            visible_after: 8.0,
            fade_in_range: 0.75,
            fade_out_range: 0.75,
            travel_axis: Axis::X,
            fade_by_scale: true,
            min_length: 0.01,
            base_cross_section: [0.2, 0.2, 0.2],
            lane_duration_scale: vec![1.0; 4],
        }
    }
}

impl MotionConfig {
    pub fn normalized(mut self) -> Self {
        if !(self.visible_before >= 0.0) {
            self.visible_before = 0.0;
        }
        if !(self.visible_after >= 0.0) {
            self.visible_after = 0.0;
        }
        if !(self.fade_in_range >= 0.0) {
            self.fade_in_range = 0.0;
        }
        if !(self.fade_out_range >= 0.0) {
            self.fade_out_range = 0.0;
        }
        if !(self.min_length >= MIN_LENGTH_FLOOR) {
            tracing::warn!(value = self.min_length, "minimum length raised to {MIN_LENGTH_FLOOR}");
            self.min_length = MIN_LENGTH_FLOOR;
        }
        self
    }
}

/// Scoring behaviour of the judgment engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgmentConfig {
    pub mode: JudgmentMode,
    /// Maximum time distance for the adjacency merge.
    pub collision_threshold: f64,
    /// When set, a lane input only hits a note whose offset lies within this
    /// distance of the judgment line.
    pub hit_window: Option<f64>,
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            mode: JudgmentMode::Competitive,
            collision_threshold: 0.1,
            hit_window: None,
        }
    }
}

/// What happens to notes that leave the trailing edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecycleConfig {
    pub mode: RecycleMode,
    pub regenerate_on_recycle: bool,
    pub ensure_ahead_fill: f64,
}

impl Default for RecycleConfig {
    fn default() -> Self {
        Self {
            mode: RecycleMode::Destroy,
            regenerate_on_recycle: true,
            ensure_ahead_fill: 10.0,
        }
    }
}

/// Spatial layout and colouring of notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub time_axis: [f64; 3],
    pub pitch_axis: [f64; 3],
    pub lane_axis: [f64; 3],
    pub time_offset: f64,
    pub pitch_offset: f64,
    pub lane_spacing: f64,
    pub color_by_pitch: bool,
    pub lane_tints: Vec<[f32; 3]>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            time_axis: [1.0, 0.0, 0.0],
            pitch_axis: [0.0, 1.0, 0.0],
            lane_axis: [0.0, 0.0, 1.0],
            time_offset: 0.0,
            pitch_offset: 0.0,
            lane_spacing: 1.0,
            color_by_pitch: true,
            lane_tints: vec![
                [1.0, 1.0, 1.0],
                [0.9, 0.9, 1.0],
                [1.0, 0.9, 0.9],
                [0.9, 1.0, 0.9],
            ],
        }
    }
}
