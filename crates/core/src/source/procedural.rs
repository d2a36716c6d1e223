use std::f64::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{sort_tail, BeatSource, SourceKind};
use crate::{GeneratorConfig, NoteSpec};

/// Keeps jittered times strictly inside their loop window.
const WINDOW_EPSILON: f64 = 1e-4;
const LANE_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seeded looping generator: one independent random stream per lane, fixed
/// base interval, bounded jitter and a sine wave superimposed on pitch.
///
/// Randomness lives only in the per-lane streams, so for a given seed and
/// configuration the produced sequence is identical no matter how the
/// requested ranges are split.
#[derive(Debug, Clone)]
pub struct ProceduralSource {
    config: GeneratorConfig,
    lanes: Vec<StdRng>,
    next_step: u64,
}

impl ProceduralSource {
    pub fn new(config: GeneratorConfig, lanes: usize) -> Self {
        let config = config.normalized();
        let lanes = seed_lanes(config.seed, lanes.max(1));
        Self {
            config,
            lanes,
            next_step: 0,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Convenience for producing the first loop window in one call.
    pub fn generate_loop(&mut self) -> Vec<NoteSpec> {
        let mut out = Vec::new();
        self.produce_due(0.0, self.config.loop_length, &mut out);
        out
    }

    fn step_time(&self, step: u64) -> f64 {
        step as f64 * self.config.step()
    }
}

impl BeatSource for ProceduralSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Procedural
    }

    fn produce_due(&mut self, since: f64, until: f64, out: &mut Vec<NoteSpec>) {
        let start = out.len();
        while self.step_time(self.next_step) < until {
            let base = self.step_time(self.next_step);
            for lane in 0..self.lanes.len() {
                let spec = draw_note(&self.config, &mut self.lanes[lane], lane, base);
                if base >= since {
                    out.push(spec);
                }
            }
            self.next_step += 1;
        }
        sort_tail(out, start);
    }

    fn covered_until(&self) -> f64 {
        self.step_time(self.next_step)
    }

    fn loop_length(&self) -> Option<f64> {
        Some(self.config.loop_length)
    }

    fn redraw(&mut self, lane: usize, time: f64) -> Option<(i32, f64)> {
        let rng = self.lanes.get_mut(lane)?;
        let pitch = draw_pitch(&self.config, rng, lane, time);
        let duration = draw_duration(&self.config, rng);
        Some((pitch, duration))
    }

    fn reset(&mut self) {
        self.lanes = seed_lanes(self.config.seed, self.lanes.len());
        self.next_step = 0;
    }
}

fn seed_lanes(seed: u64, lanes: usize) -> Vec<StdRng> {
    (0..lanes as u64)
        .map(|lane| StdRng::seed_from_u64(seed ^ (lane + 1).wrapping_mul(LANE_SEED_MIX)))
        .collect()
}

fn draw_note(config: &GeneratorConfig, rng: &mut StdRng, lane: usize, base: f64) -> NoteSpec {
    let jitter = if config.time_jitter > 0.0 {
        rng.gen_range(-config.time_jitter..=config.time_jitter)
    } else {
        0.0
    };
    let window_start = (base / config.loop_length).floor() * config.loop_length;
    let window_end = window_start + config.loop_length - WINDOW_EPSILON;
    let time = (base + jitter).clamp(window_start, window_end.max(window_start));

    let pitch = draw_pitch(config, rng, lane, time);
    let duration = draw_duration(config, rng);
    NoteSpec::new(time, lane, duration, pitch)
}

/// Random base pitch plus the lane-phased sine, clamped after modulation.
fn draw_pitch(config: &GeneratorConfig, rng: &mut StdRng, lane: usize, time: f64) -> i32 {
    let (lo, hi) = config.pitch_range;
    let mut pitch = rng.gen_range(lo..=hi);
    if config.sine_enabled {
        let phase = time * config.sine_frequency * TAU + lane as f64 * config.sine_phase_offset_per_lane;
        pitch = pitch.saturating_add((phase.sin() * config.sine_amplitude).round() as i32);
    }
    pitch.clamp(lo, hi)
}

fn draw_duration(config: &GeneratorConfig, rng: &mut StdRng) -> f64 {
    let (lo, hi) = config.duration_range;
    rng.gen_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> GeneratorConfig {
        GeneratorConfig {
            seed: 1234,
            loop_length: 16.0,
            notes_per_second_per_lane: 4.0,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn first_loop_holds_rate_times_length_times_lanes() {
        let notes = ProceduralSource::new(scenario(), 4).generate_loop();

        assert_eq!(notes.len(), 4 * 16 * 4);
        assert!(notes.iter().all(|n| (0.0..16.0).contains(&n.time)));
        for lane in 0..4 {
            assert_eq!(notes.iter().filter(|n| n.lane == lane).count(), 64);
        }
    }

    #[test]
    fn same_seed_reproduces_the_sequence() {
        let a = ProceduralSource::new(scenario(), 4).generate_loop();
        let b = ProceduralSource::new(scenario(), 4).generate_loop();
        assert_eq!(a, b);

        let other = ProceduralSource::new(GeneratorConfig { seed: 99, ..scenario() }, 4).generate_loop();
        assert_ne!(a, other);
    }

    #[test]
    fn chunked_production_matches_single_pass() {
        let whole = ProceduralSource::new(scenario(), 3).generate_loop();

        let mut source = ProceduralSource::new(scenario(), 3);
        let mut chunked = Vec::new();
        for edge in [0.0, 2.5, 7.0, 11.25, 16.0].windows(2) {
            source.produce_due(edge[0], edge[1], &mut chunked);
        }
        chunked.sort_by(NoteSpec::schedule_cmp);
        assert_eq!(whole, chunked);
    }

    #[test]
    fn output_is_time_ordered_and_within_ranges() {
        let config = scenario();
        let notes = ProceduralSource::new(config.clone(), 4).generate_loop();

        assert!(notes.windows(2).all(|w| w[0].time <= w[1].time));
        for n in &notes {
            assert!((config.pitch_range.0..=config.pitch_range.1).contains(&n.pitch));
            assert!(n.duration >= config.duration_range.0 && n.duration <= config.duration_range.1);
        }
    }

    #[test]
    fn extends_coverage_past_the_loop() {
        let mut source = ProceduralSource::new(scenario(), 2);
        source.generate_loop();
        assert_eq!(source.covered_until(), 16.0);

        let mut more = Vec::new();
        source.produce_due(16.0, 16.3, &mut more);
        assert_eq!(more.len(), 4);
        assert!(more.iter().all(|n| n.time >= 16.0 && n.time < 32.0));
        assert_eq!(source.covered_until(), 16.5);
    }

    #[test]
    fn ranges_select_grid_steps_not_jittered_times() {
        let config = scenario();
        let mut source = ProceduralSource::new(config.clone(), 4);
        assert_eq!(source.lane_count(), 4);
        assert_eq!(source.config().step(), 0.25);

        let mut first = Vec::new();
        source.produce_due(0.0, 2.5, &mut first);
        assert_eq!(first.len(), 10 * 4);
        assert!(first.iter().all(|n| n.time < 2.5 + config.time_jitter));

        let mut second = Vec::new();
        source.produce_due(2.5, 5.0, &mut second);
        assert_eq!(second.len(), 10 * 4);
        assert!(second.iter().all(|n| n.time >= 2.5 - config.time_jitter));
    }

    #[test]
    fn reset_replays_from_the_start() {
        let mut source = ProceduralSource::new(scenario(), 4);
        let first = source.generate_loop();
        source.reset();
        assert_eq!(source.generate_loop(), first);
    }

    #[test]
    fn redraw_stays_in_range() {
        let config = scenario();
        let mut source = ProceduralSource::new(config.clone(), 4);
        let (pitch, duration) = source.redraw(2, 17.5).unwrap();
        assert!((config.pitch_range.0..=config.pitch_range.1).contains(&pitch));
        assert!(duration >= config.duration_range.0 && duration <= config.duration_range.1);
        assert!(source.redraw(9, 1.0).is_none());
    }
}
