use serde::{Deserialize, Serialize};

use crate::{JudgmentConfig, LaneMotion, Note, NoteHandle, NotePool, NoteState};

/// Whether notes that pass the line unhandled count as misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentMode {
    /// Unhandled notes become `Missed` and notify.
    Competitive,
    /// Unhandled notes silently become `Expired`.
    Visualization,
}

/// Receives the single terminal notification of each note.
pub trait JudgmentListener {
    fn on_hit(&mut self, handle: NoteHandle, note: &Note);
    fn on_missed(&mut self, handle: NoteHandle, note: &Note);
}

/// Listener that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl JudgmentListener for NullListener {
    fn on_hit(&mut self, _handle: NoteHandle, _note: &Note) {}
    fn on_missed(&mut self, _handle: NoteHandle, _note: &Note) {}
}

/// Counts produced by one pass over the pool.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    pub missed: usize,
    pub expired: usize,
}

/// Classifies pending notes as hit, missed or expired.
///
/// Every transition goes through [`Note::resolve`], which only succeeds from
/// `Pending`; notifications are sent only after a successful transition, so
/// each note notifies at most once.
#[derive(Debug, Clone)]
pub struct JudgmentEngine {
    config: JudgmentConfig,
}

impl JudgmentEngine {
    pub fn new(config: JudgmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JudgmentConfig {
        &self.config
    }

    /// Earliest pending note of `lane`, restricted to the hit window when one
    /// is configured.
    pub fn first_pending_in_lane(
        &self,
        pool: &NotePool,
        lane: usize,
        front: f64,
    ) -> Option<NoteHandle> {
        pool.iter()
            .filter(|(_, note)| note.is_pending() && note.lane() == lane)
            .filter(|(_, note)| {
                self.config
                    .hit_window
                    .map_or(true, |window| note.offset_at(front).abs() <= window)
            })
            .min_by(|a, b| {
                a.1.time()
                    .total_cmp(&b.1.time())
                    .then(a.0.index().cmp(&b.0.index()))
            })
            .map(|(handle, _)| handle)
    }

    /// Applies a per-lane key press. Returns how many notes were hit.
    pub fn lane_input(
        &self,
        pool: &mut NotePool,
        lane: usize,
        front: f64,
        listener: &mut dyn JudgmentListener,
    ) -> usize {
        match self.first_pending_in_lane(pool, lane, front) {
            Some(handle) => self.hit(pool, handle, listener),
            None => 0,
        }
    }

    /// Marks `handle` as hit, then merges every other pending note of the
    /// same lane within the collision threshold of it. Returns the number of
    /// notes that transitioned; zero when `handle` was not pending.
    pub fn hit(
        &self,
        pool: &mut NotePool,
        handle: NoteHandle,
        listener: &mut dyn JudgmentListener,
    ) -> usize {
        let Some(note) = pool.get_mut(handle) else {
            return 0;
        };
        if !note.resolve(NoteState::Hit) {
            return 0;
        }
        let (lane, time) = (note.lane(), note.time());
        tracing::debug!(lane, time, "note hit");
        listener.on_hit(handle, note);

        let mut hits = 1;
        for (other, note) in pool.iter_mut() {
            if other == handle || note.lane() != lane {
                continue;
            }
            if (note.time() - time).abs() <= self.config.collision_threshold
                && note.resolve(NoteState::Hit)
            {
                tracing::debug!(lane, time = note.time(), "adjacent note merged into hit");
                listener.on_hit(other, note);
                hits += 1;
            }
        }
        hits
    }

    /// Resolves every pending note that has fully passed the trailing edge.
    pub fn sweep_passed(
        &self,
        pool: &mut NotePool,
        motion: &LaneMotion,
        front: f64,
        listener: &mut dyn JudgmentListener,
    ) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        for (handle, note) in pool.iter_mut() {
            if !note.is_pending() || !motion.has_passed(note.offset_at(front), note.duration()) {
                continue;
            }
            match self.config.mode {
                JudgmentMode::Competitive => {
                    if note.resolve(NoteState::Missed) {
                        tracing::debug!(lane = note.lane(), time = note.time(), "note missed");
                        listener.on_missed(handle, note);
                        outcome.missed += 1;
                    }
                }
                JudgmentMode::Visualization => {
                    if note.resolve(NoteState::Expired) {
                        outcome.expired += 1;
                    }
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Appearance, MotionConfig, NoteSpec};

    #[derive(Default)]
    struct Recorder {
        hits: Vec<NoteHandle>,
        misses: Vec<NoteHandle>,
    }

    impl JudgmentListener for Recorder {
        fn on_hit(&mut self, handle: NoteHandle, _note: &Note) {
            self.hits.push(handle);
        }

        fn on_missed(&mut self, handle: NoteHandle, _note: &Note) {
            self.misses.push(handle);
        }
    }

    fn spawn(pool: &mut NotePool, time: f64, lane: usize) -> NoteHandle {
        pool.acquire(Note::new(NoteSpec::new(time, lane, 0.2, 60), Appearance::default()))
            .unwrap()
    }

    fn engine() -> JudgmentEngine {
        JudgmentEngine::new(JudgmentConfig::default())
    }

    #[test]
    fn hit_merges_adjacent_same_lane_notes_once() {
        let mut pool = NotePool::new(8);
        let first = spawn(&mut pool, 2.0, 2);
        let glued = spawn(&mut pool, 2.05, 2);
        let far = spawn(&mut pool, 2.5, 2);
        let other_lane = spawn(&mut pool, 2.0, 1);
        let mut recorder = Recorder::default();

        assert_eq!(engine().lane_input(&mut pool, 2, 2.0, &mut recorder), 2);
        assert_eq!(recorder.hits, vec![first, glued]);
        assert!(pool.get(far).unwrap().is_pending());
        assert!(pool.get(other_lane).unwrap().is_pending());

        assert_eq!(engine().hit(&mut pool, glued, &mut recorder), 0);
        assert_eq!(recorder.hits.len(), 2);
    }

    #[test]
    fn lane_input_targets_earliest_pending_note() {
        let mut pool = NotePool::new(4);
        let late = spawn(&mut pool, 3.0, 0);
        let early = spawn(&mut pool, 1.0, 0);
        let engine = engine();

        assert_eq!(engine.first_pending_in_lane(&pool, 0, 0.0), Some(early));
        engine.lane_input(&mut pool, 0, 0.0, &mut NullListener);
        assert_eq!(engine.first_pending_in_lane(&pool, 0, 0.0), Some(late));
        assert_eq!(engine.first_pending_in_lane(&pool, 3, 0.0), None);
    }

    #[test]
    fn hit_window_limits_lane_input() {
        let mut pool = NotePool::new(2);
        spawn(&mut pool, 5.0, 0);
        let engine = JudgmentEngine::new(JudgmentConfig {
            hit_window: Some(0.15),
            ..JudgmentConfig::default()
        });

        assert_eq!(engine.lane_input(&mut pool, 0, 4.0, &mut NullListener), 0);
        assert_eq!(engine.lane_input(&mut pool, 0, 4.9, &mut NullListener), 1);
    }

    #[test]
    fn passed_notes_miss_exactly_once() {
        let mut pool = NotePool::new(4);
        let motion = LaneMotion::new(MotionConfig::default());
        let passed = spawn(&mut pool, 0.0, 0);
        let hit = spawn(&mut pool, 0.0, 1);
        spawn(&mut pool, 10.0, 0);
        let mut recorder = Recorder::default();
        let engine = engine();

        engine.hit(&mut pool, hit, &mut recorder);
        let outcome = engine.sweep_passed(&mut pool, &motion, 5.0, &mut recorder);
        assert_eq!(outcome, SweepOutcome { missed: 1, expired: 0 });
        assert_eq!(recorder.misses, vec![passed]);

        engine.sweep_passed(&mut pool, &motion, 6.0, &mut recorder);
        assert_eq!(recorder.misses.len(), 1);
        assert_eq!(pool.get(hit).unwrap().state(), NoteState::Hit);
    }

    #[test]
    fn visualization_mode_expires_silently() {
        let mut pool = NotePool::new(1);
        let motion = LaneMotion::new(MotionConfig::default());
        let handle = spawn(&mut pool, 0.0, 0);
        let engine = JudgmentEngine::new(JudgmentConfig {
            mode: JudgmentMode::Visualization,
            ..JudgmentConfig::default()
        });
        let mut recorder = Recorder::default();

        let outcome = engine.sweep_passed(&mut pool, &motion, 5.0, &mut recorder);
        assert_eq!(outcome.expired, 1);
        assert!(recorder.misses.is_empty());
        assert_eq!(pool.get(handle).unwrap().state(), NoteState::Expired);
    }
}
