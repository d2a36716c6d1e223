use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{BeatSource, SourceKind};
use crate::{GeneratorConfig, NoteSpec};

/// One note per beat at `60 / bpm` seconds on a randomly chosen lane.
#[derive(Debug, Clone)]
pub struct MetronomeSource {
    config: GeneratorConfig,
    lanes: usize,
    rng: StdRng,
    next_beat: u64,
}

impl MetronomeSource {
    pub fn new(config: GeneratorConfig, lanes: usize) -> Self {
        let config = config.normalized();
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            lanes: lanes.max(1),
            rng,
            next_beat: 0,
        }
    }

    pub fn beat_interval(&self) -> f64 {
        60.0 / self.config.bpm
    }

    fn beat_time(&self, beat: u64) -> f64 {
        beat as f64 * self.beat_interval()
    }
}

impl BeatSource for MetronomeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Stream
    }

    fn produce_due(&mut self, since: f64, until: f64, out: &mut Vec<NoteSpec>) {
        while self.beat_time(self.next_beat) < until {
            let time = self.beat_time(self.next_beat);
            let lane = self.rng.gen_range(0..self.lanes);
            let (lo, hi) = self.config.pitch_range;
            let pitch = self.rng.gen_range(lo..=hi);
            let (lo, hi) = self.config.duration_range;
            let duration = self.rng.gen_range(lo..=hi);
            if time >= since {
                out.push(NoteSpec::new(time, lane, duration, pitch));
            }
            self.next_beat += 1;
        }
    }

    fn covered_until(&self) -> f64 {
        self.beat_time(self.next_beat)
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.next_beat = 0;
    }
}
